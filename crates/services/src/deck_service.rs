use serde::{Deserialize, Serialize};
use serde_json::json;
use study_core::model::{
    CardId, CardProgress, Deck, DeckDraft, DeckId, DeckProgress, Rating, RatingSummary, UserId,
};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::ApiRequest;

pub const DEFAULT_RECENT_LIMIT: u32 = 5;

/// Server verdict for one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerVerdict {
    pub is_correct: bool,
    #[serde(default)]
    pub updated_progress: Option<CardProgress>,
}

/// Deck catalogue, progress, answers and ratings.
#[derive(Clone)]
pub struct DeckService {
    api: ApiClient,
}

impl DeckService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Deck>, ApiError> {
        let request = ApiRequest::get("decks/recent").with_query("limit", limit);
        self.api
            .fetch_data(request, "Error fetching recent decks")
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn search(&self, query: &str) -> Result<Vec<Deck>, ApiError> {
        let request = ApiRequest::get("decks/search").with_query("query", query.trim());
        self.api.fetch_data(request, "Error searching decks").await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn all(&self) -> Result<Vec<Deck>, ApiError> {
        self.api
            .fetch_data(ApiRequest::get("decks"), "Error fetching all decks")
            .await
    }

    /// Decks owned by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn own(&self) -> Result<Vec<Deck>, ApiError> {
        self.api
            .fetch_data(ApiRequest::get("decks/own"), "Error fetching own decks")
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn public_for_user(&self, user_id: UserId) -> Result<Vec<Deck>, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::get(format!("decks/user/{user_id}")),
                "Error fetching user public decks",
            )
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the deck does not exist.
    pub async fn get(&self, deck_id: DeckId) -> Result<Deck, ApiError> {
        self.api
            .fetch_data(ApiRequest::get(format!("decks/{deck_id}")), "Deck not found")
            .await
    }

    /// Validate and create a deck.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Invalid` for draft validation failures before any
    /// request is sent, otherwise request failures.
    pub async fn create(&self, draft: DeckDraft) -> Result<Deck, ApiError> {
        let payload = draft.validate()?;
        let request = ApiRequest::post("decks").with_json(&payload)?;
        self.api.fetch_data(request, "Error creating deck").await
    }

    /// # Errors
    ///
    /// Returns `ApiError::Invalid` for draft validation failures, otherwise request failures.
    pub async fn update(&self, deck_id: DeckId, draft: DeckDraft) -> Result<Deck, ApiError> {
        let payload = draft.validate()?;
        let request = ApiRequest::put(format!("decks/{deck_id}")).with_json(&payload)?;
        self.api.fetch_data(request, "Error updating deck").await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn delete(&self, deck_id: DeckId) -> Result<(), ApiError> {
        self.api
            .execute(ApiRequest::delete(format!("decks/{deck_id}")), "Error deleting deck")
            .await
    }

    /// Progress snapshot for a deck; `None` when the server has none yet.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than not-found.
    pub async fn progress(&self, deck_id: DeckId) -> Result<Option<DeckProgress>, ApiError> {
        let result = self
            .api
            .fetch_data(
                ApiRequest::get(format!("decks/{deck_id}/progress")),
                "Error fetching deck progress",
            )
            .await;
        match result {
            Ok(progress) => Ok(Some(progress)),
            Err(err) if err.is_not_found() => {
                debug!(%deck_id, "no progress recorded for deck");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn update_card_progress(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        is_correct: bool,
    ) -> Result<CardProgress, ApiError> {
        let request = ApiRequest::post(format!("decks/{deck_id}/cards/{card_id}/progress"))
            .with_json(&json!({ "isCorrect": is_correct }))?;
        self.api
            .fetch_data(request, "Error updating card progress")
            .await
    }

    /// Submit an answer for grading.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn submit_answer(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        answer: &str,
    ) -> Result<AnswerVerdict, ApiError> {
        let request = ApiRequest::post(format!("decks/{deck_id}/cards/{card_id}/answer"))
            .with_json(&json!({ "answer": answer }))?;
        self.api.fetch_data(request, "Error submitting answer").await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn ratings(&self, deck_id: DeckId) -> Result<RatingSummary, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::get(format!("decks/{deck_id}/ratings")),
                "Error fetching deck ratings",
            )
            .await
    }

    /// Like (`true`) or dislike (`false`) a deck.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn rate(&self, deck_id: DeckId, is_like: bool) -> Result<Rating, ApiError> {
        let request = ApiRequest::post(format!("decks/{deck_id}/ratings"))
            .with_json(&json!({ "isLike": is_like }))?;
        self.api.fetch_data(request, "Error rating deck").await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn delete_rating(&self, deck_id: DeckId) -> Result<(), ApiError> {
        self.api
            .execute(
                ApiRequest::delete(format!("decks/{deck_id}/ratings")),
                "Error deleting rating",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::SessionCoordinator;
    use crate::error::ErrorKind;
    use crate::transport::{ScriptedTransport, Transport};
    use reqwest::Method;

    fn service() -> (ScriptedTransport, DeckService) {
        let transport = ScriptedTransport::new();
        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let api = ApiClient::new(Arc::clone(&shared), SessionCoordinator::new(shared));
        (transport, DeckService::new(api))
    }

    #[tokio::test]
    async fn recent_and_search_send_query_parameters() {
        let (transport, decks) = service();
        transport.push_json(Method::GET, "decks/recent", 200, json!({"data": []}));
        transport.push_json(
            Method::GET,
            "decks/search",
            200,
            json!({"data": [{"id": 2, "name": "Spanish verbs"}]}),
        );

        decks.recent(DEFAULT_RECENT_LIMIT).await.unwrap();
        let found = decks.search("  verbs ").await.unwrap();

        assert_eq!(found[0].name, "Spanish verbs");
        let sent = transport.requests();
        assert_eq!(sent[0].query(), &[("limit".to_owned(), "5".to_owned())]);
        assert_eq!(sent[1].query(), &[("query".to_owned(), "verbs".to_owned())]);
    }

    #[tokio::test]
    async fn create_validates_before_sending() {
        let (transport, decks) = service();
        let err = decks
            .create(DeckDraft {
                name: " ".into(),
                ..DeckDraft::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_progress_is_none_but_other_failures_propagate() {
        let (transport, decks) = service();
        transport.push_json(Method::GET, "decks/3/progress", 404, json!({"detail": "none"}));
        transport.push_json(Method::GET, "decks/3/progress", 500, json!({}));

        assert_eq!(decks.progress(DeckId::new(3)).await.unwrap(), None);
        let err = decks.progress(DeckId::new(3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[tokio::test]
    async fn submit_answer_reads_verdict() {
        let (transport, decks) = service();
        transport.push_json(
            Method::POST,
            "decks/1/cards/7/answer",
            200,
            json!({"data": {"isCorrect": true,
                            "updatedProgress": {"cardId": 7, "status": "known", "reviewCount": 2}}}),
        );

        let verdict = decks
            .submit_answer(DeckId::new(1), CardId::new(7), "Paris")
            .await
            .unwrap();

        assert!(verdict.is_correct);
        assert_eq!(verdict.updated_progress.unwrap().review_count, 2);
        assert_eq!(
            transport.requests()[0].body(),
            Some(&json!({"answer": "Paris"}))
        );
    }

    #[tokio::test]
    async fn ratings_round_trip_through_envelope() {
        let (transport, decks) = service();
        transport.push_json(
            Method::GET,
            "decks/4/ratings",
            200,
            json!({"data": {"likes": 3, "dislikes": 1, "ratings": []}}),
        );
        transport.push_json(
            Method::POST,
            "decks/4/ratings",
            201,
            json!({"data": {"userId": 9, "isLike": false}}),
        );
        transport.push_json(Method::DELETE, "decks/4/ratings", 200, json!({"success": true}));

        assert_eq!(decks.ratings(DeckId::new(4)).await.unwrap().likes, 3);
        assert!(!decks.rate(DeckId::new(4), false).await.unwrap().is_like);
        decks.delete_rating(DeckId::new(4)).await.unwrap();
    }

    #[tokio::test]
    async fn catalogue_listings_hit_their_routes() {
        let (transport, decks) = service();
        transport.push_json(
            Method::GET,
            "decks",
            200,
            json!({"data": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]}),
        );
        transport.push_json(
            Method::GET,
            "decks/user/6",
            200,
            json!({"data": [{"id": 3, "name": "Shared", "isPublic": true, "ownerId": 6}]}),
        );

        assert_eq!(decks.all().await.unwrap().len(), 2);
        let public = decks.public_for_user(UserId::new(6)).await.unwrap();

        assert!(public[0].is_public);
        assert_eq!(transport.count(&Method::GET, "decks"), 1);
        assert_eq!(transport.count(&Method::GET, "decks/user/6"), 1);
    }

    #[tokio::test]
    async fn card_progress_update_posts_verdict() {
        let (transport, decks) = service();
        transport.push_json(
            Method::POST,
            "decks/2/cards/8/progress",
            200,
            json!({"data": {"cardId": 8, "status": "known", "reviewCount": 3}}),
        );

        let progress = decks
            .update_card_progress(DeckId::new(2), CardId::new(8), true)
            .await
            .unwrap();

        assert_eq!(progress.card_id, CardId::new(8));
        assert_eq!(progress.review_count, 3);
        assert_eq!(
            transport.requests()[0].body(),
            Some(&json!({"isCorrect": true}))
        );
    }

    #[tokio::test]
    async fn missing_deck_uses_server_detail() {
        let (transport, decks) = service();
        transport.push_json(Method::GET, "decks/99", 404, json!({"detail": "Deck not found"}));
        let err = decks.get(DeckId::new(99)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Deck not found");
    }
}
