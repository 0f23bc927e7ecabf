//! In-memory driver answering with queued responses.
//!
//! Every request is recorded so tests can assert on the exact URL, method,
//! headers and body the coordinator produced, and on how many requests were
//! issued at all.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::RequestDriver;
use crate::error::TransportError;
use crate::http::{DriverRequest, DriverResponse};

type Reply = Result<DriverResponse<()>, TransportError>;

/// A driver that never touches the network.
///
/// Replies are consumed in FIFO order. When the queue is empty the driver
/// fails the call with `TransportError::InvalidRequest`.
#[derive(Debug, Default)]
pub struct ReplayDriver {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<DriverRequest<()>>>,
}

impl ReplayDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body text.
    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        let response = DriverResponse {
            status,
            status_text: http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string),
            body: body.into(),
            handle: (),
        };
        lock(&self.replies).push_back(Ok(response));
        self
    }

    /// Queue a transport fault.
    pub fn fail(&self, error: TransportError) -> &Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// All requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<DriverRequest<()>> {
        lock(&self.requests).clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<DriverRequest<()>> {
        lock(&self.requests).last().cloned()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RequestDriver for ReplayDriver {
    type Options = ();
    type Handle = ();

    async fn request(&self, request: DriverRequest<()>) -> Result<DriverResponse<()>, TransportError> {
        lock(&self.requests).push(request);
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(TransportError::InvalidRequest(
                "no reply queued on replay driver".to_string(),
            ))
        })
    }
}
