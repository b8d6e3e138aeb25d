//! Scripted transport for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{HttpRequest, HttpResponse, Transport, TransportError};

type Handler = dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Answers every call through a closure and records what it was asked.
///
/// The closure receives the request and the zero-based index of the call.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    delays: Vec<(String, Duration)>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest, usize) -> Result<HttpResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delays: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers `status` with `body`.
    pub(crate) fn always(status: u16, body: &'static str) -> Self {
        Self::new(move |_, _| Ok(HttpResponse::new(status, body)))
    }

    /// Answers in order; the last reply repeats once the script runs out.
    pub(crate) fn script(replies: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self::new(move |_, index| replies[index.min(replies.len() - 1)].clone())
    }

    /// Delay calls whose URL contains `pattern` (empty pattern matches all).
    pub(crate) fn with_delay(mut self, pattern: &str, delay: Duration) -> Self {
        self.delays.push((pattern.to_string(), delay));
        self
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.url.contains(pattern))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        let delay = self
            .delays
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        (self.handler)(request, index)
    }
}
