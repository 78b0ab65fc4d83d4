use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionCoordinator;
use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// `{"data": ...}` wrapper used by the deck, card and progress endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Authenticated API access with one silent re-authentication per request.
///
/// Every request carries the session's current token. A 401 on a first
/// attempt sent with a token triggers one shared refresh and one replay with
/// the refreshed token. The replay's outcome is final.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionCoordinator,
}

impl ApiClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: SessionCoordinator) -> Self {
        Self { transport, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }

    /// Send `request`, applying the refresh-and-retry contract.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` for network failures and `ApiError::Auth`
    /// when the refresh needed for the replay fails. Non-success statuses are
    /// returned as responses.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_authenticated = self.session.authorize(&mut request);
        let response = self.transport.send(&request).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || request.attempt() > 0
            || !sent_authenticated
        {
            return Ok(response);
        }

        debug!(request_id = %request.id(), path = request.path(), "401 received, refreshing token");
        self.session.refresh().await?;

        let mut replay = request.into_retry();
        self.session.authorize(&mut replay);
        let response = self.transport.send(&replay).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(request_id = %replay.id(), "replay rejected after refresh, ending session");
            self.session.logout().await;
        }
        Ok(response)
    }

    /// Send and decode a bare JSON body.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.checked(request, fallback).await?;
        response
            .decode()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send and decode the `data` member of an enveloped JSON body.
    pub(crate) async fn fetch_data<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.fetch(request, fallback).await?;
        Ok(envelope.data)
    }

    /// Send and ignore the body of a successful response.
    pub(crate) async fn execute(&self, request: ApiRequest, fallback: &str) -> Result<(), ApiError> {
        self.checked(request, fallback).await.map(|_| ())
    }

    async fn checked(&self, request: ApiRequest, fallback: &str) -> Result<ApiResponse, ApiError> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response, fallback))
        }
    }
}

/// Map a non-success response onto the error taxonomy.
#[must_use]
pub fn status_error(response: &ApiResponse, fallback: &str) -> ApiError {
    let message = response.error_message(fallback);
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            ApiError::Validation { message }
        }
        status => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
