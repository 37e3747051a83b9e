pub mod app_config;
pub mod logging;
pub mod sources;
pub mod validation;

pub use app_config::*;
pub use logging::{filter_directive, init_tracing};
pub use sources::*;
pub use validation::*;
