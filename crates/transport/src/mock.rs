//! Scripted in-memory [`HttpClient`] for tests.
//!
//! Replies are consumed in order. A request arriving with no scripted reply
//! waits until one is pushed.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::error::TransportError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};

enum Reply {
    Response(HttpResponse),
    Network(String),
    Gated(Arc<Notify>, Box<Reply>),
}

#[derive(Default)]
struct Inner {
    replies: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
}

/// Records every request and answers from a queue of scripted replies.
#[derive(Default)]
pub struct MockHttpClient {
    inner: Mutex<Inner>,
    changed: Notify,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, reply: Reply) {
        self.lock().replies.push_back(reply);
        self.changed.notify_waiters();
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.push(Reply::Response(response));
    }

    /// Queues a bare status with no headers or body.
    pub fn push_status(&self, status: u16) {
        self.push_response(HttpResponse::new(status));
    }

    /// Queues a 308 acknowledging bytes `0..=last_byte`.
    pub fn push_range(&self, last_byte: u64) {
        self.push_response(
            HttpResponse::new(308).with_header("Range", format!("bytes=0-{last_byte}")),
        );
    }

    /// Queues a successful negotiation answer.
    pub fn push_session(&self, uri: &str) {
        self.push_response(HttpResponse::new(200).with_body(format!(r#"{{"data":"{uri}"}}"#)));
    }

    pub fn push_network_error(&self, message: &str) {
        self.push(Reply::Network(message.to_string()));
    }

    /// Queues a response that is held back until the returned gate is
    /// notified. The request is recorded as soon as it arrives.
    pub fn push_gated(&self, response: HttpResponse) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Reply::Gated(
            Arc::clone(&gate),
            Box::new(Reply::Response(response)),
        ));
        gate
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Waits until at least `n` requests have been received.
    pub async fn wait_for_requests(&self, n: usize) {
        loop {
            let notified = self.changed.notified();
            if self.request_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl HttpClient for MockHttpClient {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.lock().requests.push(request);
            self.changed.notify_waiters();

            let mut reply = loop {
                let notified = self.changed.notified();
                if let Some(reply) = self.lock().replies.pop_front() {
                    break reply;
                }
                notified.await;
            };

            loop {
                match reply {
                    Reply::Response(resp) => return Ok(resp),
                    Reply::Network(msg) => return Err(TransportError::Network(msg)),
                    Reply::Gated(gate, inner) => {
                        gate.notified().await;
                        reply = *inner;
                    }
                }
            }
        })
    }
}
