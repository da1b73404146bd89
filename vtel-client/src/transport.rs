//! Transport client
//!
//! [`Transport`] is the seam between the dispatcher and the HTTP library.
//! A transport executes one fully built [`HttpRequest`] and returns the
//! response envelope (status, headers, decoded payload). Non-2xx responses
//! are errors carrying the status code and the server body.
//!
//! [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use vtel_common::api::{ApiError, HttpMethod};

const USER_AGENT: &str = concat!("vtel-client/", env!("CARGO_PKG_VERSION"));

/// How the response body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse as JSON (empty body decodes to `null`)
    #[default]
    Json,
    /// Return the raw body as a JSON string
    Text,
}

/// Fully built request handed to a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    /// Only ever set for POST, PUT and PATCH
    pub body: Option<Value>,
    /// Per-request timeout, overriding the transport default
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
}

/// Response envelope returned by a transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Decoded payload
    pub data: Value,
}

impl TransportResponse {
    /// 200 OK envelope around a payload
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            data,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Execute a request once (no retry)
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, ApiError>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Wrap an already configured client
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Decode an error body: JSON when possible, otherwise the raw text
fn decode_error_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Builder failures never left the process; everything else is network
fn send_error(e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        ApiError::Request(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

fn decode_body(bytes: &[u8], response_type: ResponseType) -> Result<Value, ApiError> {
    match response_type {
        ResponseType::Text => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        ResponseType::Json if bytes.is_empty() => Ok(Value::Null),
        ResponseType::Json => {
            serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
            response_type,
        } = request;

        let mut builder = self
            .http_client
            .request(to_reqwest_method(method), &url)
            .headers(headers);

        if let Some(body) = body {
            let bytes = serde_json::to_vec(&body).map_err(|e| ApiError::Request(e.to_string()))?;
            builder = builder.body(bytes);
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        debug!(method = %method, url = %url, "Sending HTTP request");

        let response = builder.send().await.map_err(send_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: decode_error_body(&bytes),
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            data: decode_body(&bytes, response_type)?,
        })
    }
}
