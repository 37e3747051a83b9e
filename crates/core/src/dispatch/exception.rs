use serde_json::{json, Value};
use thiserror::Error;

use crate::errors::CoreError;

/// An error raised during request handling that carries its own status
///
/// Serialized as `{"error": ..., "status": ...}` in the response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} {error}")]
pub struct HttpException {
    pub status: u16,
    pub error: String,
}

impl HttpException {
    pub fn new(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(message: Option<&str>) -> Self {
        Self::new(400, message.unwrap_or("Bad Request"))
    }

    pub fn unauthorized(message: Option<&str>) -> Self {
        Self::new(401, message.unwrap_or("Unauthorized"))
    }

    pub fn forbidden(message: Option<&str>) -> Self {
        Self::new(403, message.unwrap_or("Forbidden"))
    }

    pub fn not_found(message: Option<&str>) -> Self {
        Self::new(404, message.unwrap_or("Not Found"))
    }

    pub fn internal_server_error(message: Option<&str>) -> Self {
        Self::new(500, message.unwrap_or("Internal Server Error"))
    }

    /// Response body for this exception
    pub fn body(&self) -> Value {
        json!({
            "error": self.error,
            "status": self.status,
        })
    }
}

impl From<CoreError> for HttpException {
    fn from(error: CoreError) -> Self {
        HttpException::internal_server_error(Some(&error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_messages() {
        assert_eq!(HttpException::bad_request(None).error, "Bad Request");
        assert_eq!(HttpException::unauthorized(None).status, 401);
        assert_eq!(HttpException::forbidden(None).status, 403);
        assert_eq!(HttpException::not_found(Some("No such user")).error, "No such user");
    }

    #[test]
    fn test_body_shape() {
        let body = HttpException::not_found(None).body();
        assert_eq!(body, json!({"error": "Not Found", "status": 404}));
    }

    #[test]
    fn test_from_core_error() {
        let exception: HttpException = CoreError::MissingRequestContext {
            service: "Session".to_string(),
        }
        .into();
        assert_eq!(exception.status, 500);
        assert!(exception.error.contains("Session"));
    }
}
