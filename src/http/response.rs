//! Response envelope.
//!
//! # Responsibilities
//! - Carry status, headers, payload and metadata from a handler to the HTTP layer
//! - Keep the JSON shape stable for clients
//!
//! # Design Decisions
//! - `status` is always serialized; `headers`, `data` and `metaData` are
//!   omitted when absent or empty; a payload that serializes to `null` counts
//!   as absent
//! - Converting into an axum response applies `status` and `headers` to the
//!   HTTP response and sends the whole envelope as the JSON body

use std::collections::BTreeMap;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<D = Value, M = Value> {
    pub status: u16,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_absent")]
    pub data: Option<D>,

    #[serde(default, skip_serializing_if = "is_absent")]
    pub meta_data: Option<M>,
}

fn is_absent<T: Serialize>(value: &Option<T>) -> bool {
    match value {
        None => true,
        Some(v) => matches!(serde_json::to_value(v), Ok(Value::Null)),
    }
}

impl<D, M> Response<D, M> {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data: None,
            meta_data: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta_data(mut self, meta_data: M) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    /// `status` as an HTTP status code, if it is a valid one.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }
}

impl<D, M> IntoResponse for Response<D, M>
where
    D: Serialize,
    M: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code().unwrap_or_else(|| {
            tracing::warn!(status = self.status, "Invalid status in response envelope");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response envelope");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid envelope header"),
            }
        }
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
