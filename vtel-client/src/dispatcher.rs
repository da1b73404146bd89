//! Request dispatcher
//!
//! Turns `(endpoint, method, data, options)` into exactly one transport call
//! and returns the decoded payload, stripped of the response envelope.
//!
//! # Request construction
//!
//! - Relative endpoints are joined to the base URL; absolute `http(s)://`
//!   endpoints are used as is.
//! - Default headers are `Content-Type: application/json` and
//!   `Authorization: Bearer <token>` (when a token is available). Headers in
//!   [`RequestOptions`] replace defaults of the same name.
//! - `data` is sent as the body for POST, PUT and PATCH only.
//!
//! # Routing
//!
//! GET requests go through the dispatcher's [`Debouncer`] keyed by
//! `GET_<endpoint>`. Every other method is sent immediately, once.
//!
//! # Errors
//!
//! Transport errors are returned unchanged. The dispatcher never retries.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use vtel_common::api::{ApiError, HttpMethod};
use vtel_common::config::{ClientConfig, TokenSource};

use crate::debounce::{DebounceError, Debouncer, DEFAULT_DEBOUNCE_DELAY};
use crate::transport::{HttpRequest, ReqwestTransport, ResponseType, Transport};

type ApiResult = Result<Value, ApiError>;

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers, replacing defaults with the same name
    pub headers: HeaderMap,
    /// Per-request timeout passed through to the transport
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings, validating name and value
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::Request(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::Request(format!("Invalid header value for '{}': {}", name, e)))?;
        Ok(self.header(name, value))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// Debounce key for a call site
pub fn debounce_key(method: HttpMethod, endpoint: &str) -> String {
    format!("{}_{}", method.as_str(), endpoint)
}

/// Join an endpoint to a base URL
///
/// Absolute endpoints are returned unchanged. Otherwise exactly one `/`
/// separates base and endpoint.
pub fn join_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// API request dispatcher
///
/// Owns its debounce registry. Clones share the transport, the token source
/// and the registry.
pub struct ApiDispatcher<T: Transport = ReqwestTransport> {
    transport: Arc<T>,
    base_url: Arc<str>,
    token: TokenSource,
    debouncer: Arc<Debouncer<ApiResult>>,
}

impl<T: Transport> Clone for ApiDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: Arc::clone(&self.base_url),
            token: self.token.clone(),
            debouncer: Arc::clone(&self.debouncer),
        }
    }
}

impl ApiDispatcher<ReqwestTransport> {
    /// Build a reqwest-backed dispatcher from resolved configuration
    ///
    /// The base URL must be absolute. A same-origin path such as the proxy
    /// target's `/api` has no host to send to outside a browser.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            ApiError::Request(format!("Base URL '{}' is not absolute: {}", config.base_url, e))
        })?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(transport, config.base_url.clone(), config.token.clone())
            .with_debounce_delay(config.debounce_delay))
    }
}

impl<T: Transport> ApiDispatcher<T> {
    /// Dispatcher with the default 300ms debounce window
    pub fn new(transport: T, base_url: impl Into<String>, token: TokenSource) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport: Arc::new(transport),
            base_url: Arc::from(base_url),
            token,
            debouncer: Arc::new(Debouncer::new(DEFAULT_DEBOUNCE_DELAY)),
        }
    }

    /// Dispatcher sharing this one's transport with its own debounce window
    ///
    /// The returned dispatcher has a fresh, empty debounce registry.
    pub fn with_debounce_delay(&self, delay: Duration) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: Arc::clone(&self.base_url),
            token: self.token.clone(),
            debouncer: Arc::new(Debouncer::new(delay)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debouncer.delay()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of GET call sites currently waiting out their window
    pub fn pending_reads(&self) -> usize {
        self.debouncer.pending()
    }

    fn default_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.token.current() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::Request(format!("Invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Build the request a call would send, without sending it
    pub fn build_request(
        &self,
        endpoint: &str,
        method: HttpMethod,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let RequestOptions {
            headers: overrides,
            timeout,
            response_type,
        } = options;

        let mut headers = self.default_headers()?;
        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides.iter() {
            headers.append(name.clone(), value.clone());
        }

        let body = if method.has_body() { data } else { None };

        Ok(HttpRequest {
            method,
            url: join_url(&self.base_url, endpoint),
            headers,
            body,
            timeout,
            response_type,
        })
    }

    /// Dispatch one API call and return the response payload
    pub async fn call(
        &self,
        endpoint: &str,
        method: HttpMethod,
        data: Option<Value>,
        options: RequestOptions,
    ) -> ApiResult {
        let request = self.build_request(endpoint, method, data, options)?;

        let result = match method {
            HttpMethod::Get => {
                let transport = Arc::clone(&self.transport);
                self.debouncer
                    .call(debounce_key(method, endpoint), move || {
                        send_payload(transport, request)
                    })
                    .await
                    // `&self` keeps the debouncer alive, so only a panicking send lands here
                    .unwrap_or_else(|DebounceError::Dropped| Err(ApiError::Cancelled))
            }
            _ => send_payload(Arc::clone(&self.transport), request).await,
        };

        log_outcome(method, endpoint, &result);
        result
    }

    /// Dispatch and deserialize the payload into `R`
    pub async fn call_as<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let payload = self.call(endpoint, method, data, options).await?;
        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get(&self, endpoint: &str) -> ApiResult {
        self.call(endpoint, HttpMethod::Get, None, RequestOptions::default())
            .await
    }

    pub async fn post(&self, endpoint: &str, data: Value) -> ApiResult {
        self.call(endpoint, HttpMethod::Post, Some(data), RequestOptions::default())
            .await
    }

    pub async fn put(&self, endpoint: &str, data: Value) -> ApiResult {
        self.call(endpoint, HttpMethod::Put, Some(data), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, endpoint: &str, data: Value) -> ApiResult {
        self.call(endpoint, HttpMethod::Patch, Some(data), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> ApiResult {
        self.call(endpoint, HttpMethod::Delete, None, RequestOptions::default())
            .await
    }
}

async fn send_payload<T: Transport>(transport: Arc<T>, request: HttpRequest) -> ApiResult {
    transport.send(request).await.map(|response| response.data)
}

/// Development-build diagnostics, no effect on the result
fn log_outcome(method: HttpMethod, endpoint: &str, result: &ApiResult) {
    if !cfg!(debug_assertions) {
        return;
    }
    match result {
        Ok(_) => debug!(method = %method, endpoint = %endpoint, "API call succeeded"),
        Err(e) => warn!(method = %method, endpoint = %endpoint, error = %e, "API call failed"),
    }
}
