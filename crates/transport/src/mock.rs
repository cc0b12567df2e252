//! Mock transport
//!
//! Mock implementation for unit testing, supports scripted responses and
//! transport-failure injection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{Event, TelemetryError, Transport, TransportResponse};

/// One scripted reaction to a `send` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this status code
    Status(u16),
    /// Fail at the transport layer (connect error, timeout)
    Error(String),
}

struct MockTransportInner {
    /// Replies consumed front-to-back; 200 once exhausted
    replies: Mutex<VecDeque<MockReply>>,
    /// Every delivered batch, in call order
    batches: Mutex<Vec<Vec<Event>>>,
    /// Endpoint and headers of the most recent call
    last_endpoint: Mutex<Option<String>>,
    last_headers: Mutex<Option<HashMap<String, String>>>,
}

/// Mock transport
///
/// Internal state wrapped in Arc, supports Clone: keep one handle for
/// assertions while the dispatcher owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockTransportInner>,
}

impl MockTransport {
    /// Mock that acknowledges every batch with 200.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockTransportInner {
                replies: Mutex::new(VecDeque::new()),
                batches: Mutex::new(Vec::new()),
                last_endpoint: Mutex::new(None),
                last_headers: Mutex::new(None),
            }),
        }
    }

    /// Mock with a reply script, consumed one entry per call.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let transport = Self::new();
        *lock(&transport.inner.replies) = replies.into_iter().collect();
        transport
    }

    /// Append a reply to the script.
    pub fn push_reply(&self, reply: MockReply) {
        lock(&self.inner.replies).push_back(reply);
    }

    /// Number of `send` calls observed.
    pub fn calls(&self) -> usize {
        lock(&self.inner.batches).len()
    }

    /// All delivered batches, in call order.
    pub fn batches(&self) -> Vec<Vec<Event>> {
        lock(&self.inner.batches).clone()
    }

    /// Event names of the batch at `index`.
    pub fn batch_names(&self, index: usize) -> Vec<String> {
        lock(&self.inner.batches)[index]
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Endpoint of the most recent call.
    pub fn last_endpoint(&self) -> Option<String> {
        lock(&self.inner.last_endpoint).clone()
    }

    /// Headers of the most recent call.
    pub fn last_headers(&self) -> Option<HashMap<String, String>> {
        lock(&self.inner.last_headers).clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    async fn send(
        &self,
        batch: &[Event],
        endpoint: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TelemetryError> {
        lock(&self.inner.batches).push(batch.to_vec());
        *lock(&self.inner.last_endpoint) = Some(endpoint.to_string());
        *lock(&self.inner.last_headers) = Some(headers.clone());

        match lock(&self.inner.replies).pop_front() {
            Some(MockReply::Status(status)) => Ok(TransportResponse::new(status)),
            Some(MockReply::Error(message)) => Err(TelemetryError::transport(message)),
            None => Ok(TransportResponse::new(200)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
