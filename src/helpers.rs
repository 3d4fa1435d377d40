//! Response-construction helpers shared by every query handler, shaped for
//! this server's synchronous, single-threaded dispatch — no `try_lock`,
//! since there is no `Mutex` to lock.

use lsp_server::{ErrorCode, Request, Response, ResponseError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ServerError;

#[inline]
pub fn null_response(req: &Request) -> Response {
    Response {
        id: req.id.clone(),
        result: Some(Value::Null),
        error: None,
    }
}

#[inline]
pub fn success_response<T: serde::Serialize>(req: &Request, result: T) -> Response {
    Response {
        id: req.id.clone(),
        result: Some(serde_json::to_value(result).unwrap_or(Value::Null)),
        error: None,
    }
}

#[inline]
pub fn error_response(req: &Request, code: ErrorCode, message: impl Into<String>) -> Response {
    Response {
        id: req.id.clone(),
        result: None,
        error: Some(ResponseError {
            code: code as i32,
            message: message.into(),
            data: None,
        }),
    }
}

/// Parses request params, replying `InvalidParams` on failure: malformed
/// JSON, missing required fields, or the wrong shape entirely. A benign
/// null result is reserved for "not found" outcomes further down a
/// handler (unopened document, unresolved node), not for unparsable input.
pub fn try_parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, Response> {
    serde_json::from_value(req.params.clone()).map_err(|err| {
        let err = ServerError::InvalidParams(err.to_string());
        error_response(req, ErrorCode::InvalidParams, err.to_string())
    })
}
