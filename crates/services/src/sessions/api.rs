use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use study_core::model::{CardId, DeckId, DeckProgress, SessionId};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::ApiRequest;

/// Server-side record of a study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: SessionId,
    pub deck_id: DeckId,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Study-session boundary endpoints.
#[derive(Clone)]
pub struct StudySessionService {
    api: ApiClient,
}

impl StudySessionService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn start(&self, deck_id: DeckId) -> Result<RemoteSession, ApiError> {
        let request =
            ApiRequest::post("study-sessions").with_json(&json!({ "deckId": deck_id }))?;
        self.api
            .fetch_data(request, "Error starting study session")
            .await
    }

    /// Unfinished session for a deck, if any.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than not-found.
    pub async fn current(&self, deck_id: DeckId) -> Result<Option<RemoteSession>, ApiError> {
        let request = ApiRequest::get("study-sessions/current").with_query("deckId", deck_id);
        match self
            .api
            .fetch_data(request, "Error fetching current study session")
            .await
        {
            Ok(session) => Ok(Some(session)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn update_card_status(
        &self,
        session_id: SessionId,
        card_id: CardId,
        is_correct: bool,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::put(format!("study-sessions/{session_id}/cards/{card_id}"))
            .with_json(&json!({ "isCorrect": is_correct }))?;
        self.api
            .execute(request, "Error updating card status")
            .await
    }

    /// Close the session and return the deck progress the server settled on.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn end(&self, session_id: SessionId) -> Result<DeckProgress, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::post(format!("study-sessions/{session_id}/end")),
                "Error ending study session",
            )
            .await
    }
}
