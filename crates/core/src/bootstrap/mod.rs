//! Application bootstrap
//!
//! Collects service and controller registrations, checks the graphs and
//! instantiates singletons before any request is served.

pub mod application;

pub use application::{Application, ApplicationBuilder};
