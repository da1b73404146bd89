//! Test helpers: recording mock transport

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use vtel_client::{HttpRequest, Transport, TransportResponse};
use vtel_common::api::ApiError;

type Responder = Box<dyn Fn(&HttpRequest) -> Result<TransportResponse, ApiError> + Send + Sync>;

/// Request observed by the mock, with the (tokio) time it arrived
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: HttpRequest,
    pub at: Instant,
}

/// Transport that records every request and answers from a closure
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
    latency: Duration,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<TransportResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            latency: Duration::ZERO,
        }
    }

    /// Always answers 200 with `data`
    pub fn returning(data: Value) -> Self {
        Self::new(move |_| Ok(TransportResponse::ok(data.clone())))
    }

    /// Answers 200 echoing the request body (or `null`)
    pub fn echo() -> Self {
        Self::new(|request| Ok(TransportResponse::ok(request.body.clone().unwrap_or(Value::Null))))
    }

    /// Always fails with `error`
    pub fn failing(error: ApiError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Simulated network round-trip time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.calls
            .lock()
            .unwrap()
            .last()
            .expect("no request recorded")
            .request
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        (self.responder)(&request)
    }
}
