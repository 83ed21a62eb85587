//! Transport abstraction.
//!
//! Every outbound call of the workspace is expressed as an [`HttpRequest`]
//! and sent through a [`Transport`]. The concrete network implementation
//! lives in the interaction layer; the [`InterceptingTransport`] wraps any
//! transport with an ordered chain of rewrite rules.

mod intercept;

pub use intercept::{InterceptRule, InterceptingTransport};

use crate::conversation::Route;
use crate::error::{BranchlineError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// A single-file multipart form
    Multipart {
        field_name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// An outbound call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self> {
        Self::new(Method::POST, url).with_json(body)
    }

    pub fn put_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self> {
        Self::new(Method::PUT, url).with_json(body)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_multipart(
        mut self,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        };
        self
    }

    /// The remote endpoint this request addresses, if recognized.
    pub fn route(&self) -> Option<Route> {
        Route::parse(&self.url)
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn json_body_mut(&mut self) -> Option<&mut Value> {
        match &mut self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A completed call. The body has already been read in full.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json_value<T: Serialize>(status: StatusCode, body: &T) -> Result<Self> {
        Ok(Self::new(status, serde_json::to_vec(body)?))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Parse` when the body does not have the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BranchlineError::parse(format!("{e} (status {})", self.status)))
    }

    /// Turns a non-success status into a `Network` error carrying the body.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let body = self.text();
        let message = if body.trim().is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body
        };
        Err(BranchlineError::network(Some(self.status.as_u16()), message))
    }
}

/// The single primitive every outbound call goes through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
