use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, DeckId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card question cannot be empty")]
    EmptyQuestion,

    #[error("card answer cannot be empty")]
    EmptyAnswer,
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A single flashcard as returned by the deck endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub deck_id: Option<DeckId>,
    pub question: String,
    pub answer: String,
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// User-entered card content before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
}

impl CardDraft {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Trim both sides and reject blanks.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyQuestion` or `CardError::EmptyAnswer`.
    pub fn validate(self) -> Result<CardPayload, CardError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        let answer = self.answer.trim();
        if answer.is_empty() {
            return Err(CardError::EmptyAnswer);
        }
        Ok(CardPayload {
            question: question.to_owned(),
            answer: answer.to_owned(),
        })
    }
}

/// Validated request body for card create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardPayload {
    question: String,
    answer: String,
}

impl CardPayload {
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_trims_and_validates() {
        let payload = CardDraft::new("  2 + 2? ", " 4 ").validate().unwrap();
        assert_eq!(payload.question(), "2 + 2?");
        assert_eq!(payload.answer(), "4");
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            CardDraft::new("  ", "x").validate().unwrap_err(),
            CardError::EmptyQuestion
        );
        assert_eq!(
            CardDraft::new("q", "\n").validate().unwrap_err(),
            CardError::EmptyAnswer
        );
    }

    #[test]
    fn card_deserializes_without_deck_id() {
        let card: Card =
            serde_json::from_str(r#"{"id": 1, "question": "Q", "answer": "A"}"#).unwrap();
        assert_eq!(card.id, CardId::new(1));
        assert!(card.deck_id.is_none());
    }
}
