//! In-memory transport for exercising the fetcher and client without
//! a network. Routes are matched on the full URL including query.

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Status(u16, String),
    Io(String),
    Timeout,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        MockReply::Status(200, body.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        MockReply::Status(200, value.to_string())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Status(status, body.into())
    }
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, VecDeque<MockReply>>,
    requests: Vec<RecordedRequest>,
}

/// A request the mock observed, with the headers it carried.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

/// Scripted [`HttpTransport`]. Replies queue per URL; the final reply
/// of a queue repeats for subsequent hits so steady-state routes need
/// only one entry.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a URL. Call repeatedly to script sequences
    /// (e.g. a 429 followed by a 200).
    pub fn enqueue(&self, url: impl Into<String>, reply: MockReply) {
        let mut state = self.state.lock().unwrap();
        state.routes.entry(url.into()).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn hits_for(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(RecordedRequest {
                url: url.clone(),
                headers: request.headers.clone(),
            });
            let queue = state.routes.get_mut(&url);
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::Io(cause)) => Err(TransportError::Io(cause)),
            Some(MockReply::Timeout) => Err(TransportError::Timeout),
            None => Ok(HttpResponse {
                status: 404,
                body: format!("no mock route for {url}"),
            }),
        }
    }
}
