//! Request/response types and the `Transport` seam every service talks through.

mod http;
mod scripted;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::TransportError;

pub use http::HttpTransport;
pub use scripted::{Release, ScriptedTransport};

/// Sends one request and hands back whatever status the server answered with.
///
/// Implementations never interpret status codes; a 401 or 404 is an
/// `Ok(ApiResponse)`. Only network-level failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns `TransportError` when no response could be obtained.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// An outgoing API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    id: Uuid,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    attempt: u32,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            attempt: 0,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Other` if the body cannot be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, TransportError> {
        let value =
            serde_json::to_value(body).map_err(|e| TransportError::Other(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set a header, replacing any previous value (names compare case-insensitively).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn set_bearer(&mut self, token: &str) {
        self.set_header("Authorization", format!("Bearer {token}"));
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The same request marked as its replay after a re-authentication.
    #[must_use]
    pub fn into_retry(mut self) -> Self {
        self.attempt += 1;
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// 0 for the first send, 1 for the replay.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Status and raw body of a server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// # Errors
    ///
    /// Returns the `serde_json` error when the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Human-readable failure text: the body's `detail`, then `message`, then `fallback`.
    #[must_use]
    pub fn error_message(&self, fallback: &str) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|value| {
                ["detail", "message"].iter().find_map(|key| {
                    value
                        .get(key)
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_owned)
                })
            })
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bearer_replaces_previous_authorization() {
        let mut request = ApiRequest::get("decks").with_header("authorization", "Bearer old");
        request.set_bearer("new");
        assert_eq!(request.header("Authorization"), Some("Bearer new"));
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn retry_keeps_identity_and_bumps_attempt() {
        let request = ApiRequest::post("decks")
            .with_json(&json!({"name": "x"}))
            .unwrap();
        let id = request.id();
        let retry = request.into_retry();
        assert_eq!(retry.attempt(), 1);
        assert_eq!(retry.id(), id);
        assert_eq!(retry.body(), Some(&json!({"name": "x"})));
    }

    #[test]
    fn error_message_prefers_detail_then_message() {
        let response = ApiResponse::json(
            StatusCode::BAD_REQUEST,
            &json!({"detail": "Deck not found", "message": "ignored"}),
        );
        assert_eq!(response.error_message("fallback"), "Deck not found");

        let response = ApiResponse::json(StatusCode::BAD_REQUEST, &json!({"message": "nope"}));
        assert_eq!(response.error_message("fallback"), "nope");

        let response = ApiResponse::new(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(response.error_message("Login failed"), "Login failed");
    }
}
