use serde::{Deserialize, Serialize};

use crate::engine::{QueryError, QueryRequest};

/// Request from client to server, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Query(QueryRequest),
    Metrics,
    InvalidateCache,
    Health,
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Service,
    Internal,
    BadRequest,
}

/// Response sent back to the client as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok {
        data: serde_json::Value,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::Ok { data },
            Err(e) => Self::error(ErrorKind::Internal, format!("Failed to encode response: {}", e)),
        }
    }

    pub fn ack() -> Self {
        Self::Ok {
            data: serde_json::Value::Null,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<&QueryError> for Response {
    fn from(err: &QueryError) -> Self {
        let kind = match err {
            QueryError::Validation(_) => ErrorKind::Validation,
            QueryError::Service { .. } => ErrorKind::Service,
            QueryError::Internal(_) => ErrorKind::Internal,
        };
        Self::error(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ValidationError;

    #[test]
    fn test_query_request_wire_format() {
        let request: Request = serde_json::from_str(
            r#"{"type":"query","question":"Tell me about pets","include_metadata":true,"max_results":3}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::Query(
                QueryRequest::new("Tell me about pets")
                    .with_metadata(true)
                    .with_max_results(3)
            )
        );
    }

    #[test]
    fn test_unit_requests_wire_format() {
        let request: Request = serde_json::from_str(r#"{"type":"invalidate_cache"}"#).unwrap();
        assert_eq!(request, Request::InvalidateCache);
        assert_eq!(serde_json::to_string(&Request::Health).unwrap(), r#"{"type":"health"}"#);
    }

    #[test]
    fn test_error_response_wire_format() {
        let err = QueryError::Validation(ValidationError::MaxResultsOutOfRange { value: 0, max: 20 });
        let json = serde_json::to_value(Response::from(&err)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "validation");
        assert!(json["message"].as_str().unwrap().contains("max_results"));
    }

    #[test]
    fn test_ok_response_wire_format() {
        let json = serde_json::to_value(Response::ok(&vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok", "data": [1, 2]}));
    }
}
