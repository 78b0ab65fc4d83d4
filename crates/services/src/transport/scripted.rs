use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::channel::oneshot;
use reqwest::{Method, StatusCode};
use serde_json::json;

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::TransportError;

type Outcome = Result<ApiResponse, TransportError>;

struct Reply {
    outcome: Outcome,
    hold: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
struct Script {
    replies: HashMap<(Method, String), VecDeque<Reply>>,
    sent: Vec<ApiRequest>,
}

/// Lets a held reply complete.
#[derive(Debug)]
pub struct Release(oneshot::Sender<()>);

impl Release {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

/// In-memory transport for tests and prototyping.
///
/// Replies are queued per `(method, path)` and consumed in order; unmatched
/// requests get a 404. Every request is recorded, including the headers the
/// client attached.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, method: Method, path: &str, reply: Reply) {
        self.script()
            .replies
            .entry((method, normalize(path)))
            .or_default()
            .push_back(reply);
    }

    pub fn push(&self, method: Method, path: &str, outcome: Outcome) {
        self.enqueue(method, path, Reply { outcome, hold: None });
    }

    pub fn push_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.push(method, path, Ok(ApiResponse::json(status, &body)));
    }

    /// Queue a reply that stays pending until the returned `Release` fires.
    #[must_use]
    pub fn push_held(&self, method: Method, path: &str, outcome: Outcome) -> Release {
        let (tx, rx) = oneshot::channel();
        self.enqueue(
            method,
            path,
            Reply {
                outcome,
                hold: Some(rx),
            },
        );
        Release(tx)
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script().sent.clone()
    }

    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        let path = normalize(path);
        self.script()
            .sent
            .iter()
            .filter(|r| r.method() == method && normalize(r.path()) == path)
            .count()
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let reply = {
            let mut script = self.script();
            script.sent.push(request.clone());
            script
                .replies
                .get_mut(&(request.method().clone(), normalize(request.path())))
                .and_then(VecDeque::pop_front)
        };

        let Some(reply) = reply else {
            return Ok(ApiResponse::json(
                StatusCode::NOT_FOUND,
                &json!({ "detail": format!("no scripted reply for {} {}", request.method(), request.path()) }),
            ));
        };

        if let Some(hold) = reply.hold {
            hold.await.map_err(|_| TransportError::Cancelled)?;
        }
        reply.outcome
    }
}
