//! Uniform JSON envelope: `{success, message?, data?, errors?}`

use chrono::Utc;
use serde::Serialize;
use warp::http::{Method, StatusCode};
use warp::reply::{Reply, Response};

use crate::error::{NihongoError, Result};

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Internal failure text, development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn json_with_status<T: Serialize>(envelope: &Envelope<T>, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(envelope), status).into_response()
}

/// 200 with data
pub fn ok<T: Serialize>(data: T) -> Response {
    json_with_status(
        &Envelope {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
            detail: None,
        },
        StatusCode::OK,
    )
}

/// 200 with a message and data
pub fn ok_with_message<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    json_with_status(
        &Envelope {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
            detail: None,
        },
        StatusCode::OK,
    )
}

/// 200 with only a message
pub fn message(message: impl Into<String>) -> Response {
    json_with_status(
        &Envelope::<()> {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
            detail: None,
        },
        StatusCode::OK,
    )
}

/// 201 with a message and the created document
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    json_with_status(
        &Envelope {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
            detail: None,
        },
        StatusCode::CREATED,
    )
}

/// Failure envelope with an explicit status, for rejections that are not crate errors
pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    json_with_status(
        &Envelope::<()> {
            success: false,
            message: Some(message.into()),
            data: None,
            errors: None,
            detail: None,
        },
        status,
    )
}

/// Render a crate error. Internal detail is attached only in development.
pub fn error_response(error: &NihongoError, development: bool) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let errors = error.field_errors();
    let detail = (development && status == StatusCode::INTERNAL_SERVER_ERROR)
        .then(|| error.to_string());

    json_with_status(
        &Envelope::<()> {
            success: false,
            message: Some(error.public_message()),
            data: None,
            errors: (!errors.is_empty()).then(|| errors.to_vec()),
            detail,
        },
        status,
    )
}

/// Who asked for what; used to report failures
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub caller: Option<String>,
    pub development: bool,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, development: bool) -> Self {
        Self {
            method,
            path: path.into(),
            caller: None,
            development,
        }
    }

    pub fn with_caller(mut self, user_id: &str) -> Self {
        self.caller = Some(user_id.to_string());
        self
    }

    /// Log unexpected failures with the request they belong to
    pub fn log_failure(&self, error: &NihongoError) {
        if error.status_code() >= 500 {
            log::error!(
                "{} {} failed (caller: {}, at: {}): {}",
                self.method,
                self.path,
                self.caller.as_deref().unwrap_or("anonymous"),
                Utc::now().to_rfc3339(),
                error
            );
        }
    }

    /// Turn a handler outcome into the response sent to the client
    pub fn finish(&self, result: Result<Response>) -> Response {
        match result {
            Ok(response) => response,
            Err(error) => {
                self.log_failure(&error);
                error_response(&error, self.development)
            }
        }
    }
}
