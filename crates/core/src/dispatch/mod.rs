pub mod exception;
pub mod execution;

pub use exception::HttpException;
pub use execution::{ExecutionContainer, ExecutionResult};
