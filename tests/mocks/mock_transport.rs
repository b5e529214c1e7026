//! Scripted transport for dispatcher tests
//!
//! Replies are consumed in order; once the script is empty every call gets
//! the fallback reply. All requests are recorded for later inspection.

use async_trait::async_trait;
use devflow_fetch::{FetchError, FetchResult, HttpTransport, TransportRequest, TransportResponse};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does for one call
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(TransportResponse),
    Fail(FetchError),
    /// Never completes; only a timeout ends the attempt
    Hang,
}

impl MockReply {
    /// 200 with a success envelope around `data`
    pub fn ok(data: Value) -> Self {
        MockReply::Respond(TransportResponse::new(
            200,
            "OK",
            json!({"success": true, "data": data}).to_string(),
        ))
    }

    /// Non-2xx with a failure envelope body
    pub fn status(status: u16, status_text: &str) -> Self {
        MockReply::Respond(TransportResponse::new(
            status,
            status_text,
            json!({"success": false, "error": {"message": status_text}}).to_string(),
        ))
    }

    pub fn raw(status: u16, status_text: &str, body: &str) -> Self {
        MockReply::Respond(TransportResponse::new(status, status_text, body))
    }
}

#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<(Option<Duration>, MockReply)>>,
    fallback: MockReply,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// Every call answers with `fallback` unless scripted otherwise
    pub fn new(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: MockReply) -> Self {
        self.script.lock().unwrap().push_back((None, reply));
        self
    }

    pub fn then_after(self, delay: Duration, reply: MockReply) -> Self {
        self.script.lock().unwrap().push_back((Some(delay), reply));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> FetchResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let (delay, reply) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| (None, self.fallback.clone()));

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(error) => Err(error),
            MockReply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
