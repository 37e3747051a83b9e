mod core;

pub use self::core::{ApiError, ApiErrorResponse, CoreError};
