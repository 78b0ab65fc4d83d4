use study_core::model::{Card, CardDraft, CardId, DeckId};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::ApiRequest;

/// Card CRUD within a deck.
#[derive(Clone)]
pub struct CardService {
    api: ApiClient,
}

impl CardService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn list(&self, deck_id: DeckId) -> Result<Vec<Card>, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::get(format!("decks/{deck_id}/cards")),
                "Error fetching cards in deck",
            )
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the card does not exist.
    pub async fn get(&self, deck_id: DeckId, card_id: CardId) -> Result<Card, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::get(format!("decks/{deck_id}/cards/{card_id}")),
                "Error fetching card",
            )
            .await
    }

    /// Validate and create a card.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Invalid` for draft validation failures before any
    /// request is sent, otherwise request failures.
    pub async fn create(&self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ApiError> {
        let payload = draft.validate()?;
        let request = ApiRequest::post(format!("decks/{deck_id}/cards")).with_json(&payload)?;
        self.api.fetch_data(request, "Error creating card").await
    }

    /// # Errors
    ///
    /// Returns `ApiError::Invalid` for draft validation failures, otherwise request failures.
    pub async fn update(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        draft: CardDraft,
    ) -> Result<Card, ApiError> {
        let payload = draft.validate()?;
        let request =
            ApiRequest::put(format!("decks/{deck_id}/cards/{card_id}")).with_json(&payload)?;
        self.api.fetch_data(request, "Error updating card").await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on transport, auth or server failures.
    pub async fn delete(&self, deck_id: DeckId, card_id: CardId) -> Result<(), ApiError> {
        self.api
            .execute(
                ApiRequest::delete(format!("decks/{deck_id}/cards/{card_id}")),
                "Error deleting card",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::SessionCoordinator;
    use crate::transport::{ScriptedTransport, Transport};
    use reqwest::Method;
    use serde_json::json;

    fn service() -> (ScriptedTransport, CardService) {
        let transport = ScriptedTransport::new();
        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let api = ApiClient::new(Arc::clone(&shared), SessionCoordinator::new(shared));
        (transport, CardService::new(api))
    }

    #[tokio::test]
    async fn create_sends_trimmed_payload() {
        let (transport, cards) = service();
        transport.push_json(
            Method::POST,
            "decks/2/cards",
            201,
            json!({"data": {"id": 11, "deckId": 2, "question": "Q", "answer": "A"}}),
        );

        let card = cards
            .create(DeckId::new(2), CardDraft::new(" Q ", " A "))
            .await
            .unwrap();

        assert_eq!(card.id, CardId::new(11));
        assert_eq!(
            transport.requests()[0].body(),
            Some(&json!({"question": "Q", "answer": "A"}))
        );
    }

    #[tokio::test]
    async fn server_validation_message_is_surfaced() {
        let (transport, cards) = service();
        transport.push_json(
            Method::PUT,
            "decks/2/cards/3",
            422,
            json!({"detail": "Question too long"}),
        );

        let err = cards
            .update(DeckId::new(2), CardId::new(3), CardDraft::new("q", "a"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Validation {
                message: "Question too long".into()
            }
        );
    }

    #[tokio::test]
    async fn get_and_update_hit_card_route() {
        let (transport, cards) = service();
        transport.push_json(
            Method::GET,
            "decks/2/cards/3",
            200,
            json!({"data": {"id": 3, "deckId": 2, "question": "q", "answer": "a"}}),
        );
        transport.push_json(
            Method::PUT,
            "decks/2/cards/3",
            200,
            json!({"data": {"id": 3, "deckId": 2, "question": "Capital?", "answer": "Lima"}}),
        );

        let card = cards.get(DeckId::new(2), CardId::new(3)).await.unwrap();
        assert_eq!(card.question, "q");

        let updated = cards
            .update(DeckId::new(2), CardId::new(3), CardDraft::new("Capital? ", " Lima"))
            .await
            .unwrap();

        assert_eq!(updated.answer, "Lima");
        let sent = transport.requests();
        assert_eq!(sent[1].method(), &Method::PUT);
        assert_eq!(
            sent[1].body(),
            Some(&json!({"question": "Capital?", "answer": "Lima"}))
        );
    }

    #[tokio::test]
    async fn list_and_delete() {
        let (transport, cards) = service();
        transport.push_json(
            Method::GET,
            "decks/2/cards",
            200,
            json!({"data": [{"id": 1, "question": "q", "answer": "a"}]}),
        );
        transport.push_json(Method::DELETE, "decks/2/cards/1", 200, json!({"success": true}));

        assert_eq!(cards.list(DeckId::new(2)).await.unwrap().len(), 1);
        cards.delete(DeckId::new(2), CardId::new(1)).await.unwrap();
        assert_eq!(transport.count(&Method::DELETE, "decks/2/cards/1"), 1);
    }
}
