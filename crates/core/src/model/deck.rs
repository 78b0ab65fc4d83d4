use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::card::Card;
use crate::model::ids::{CardId, DeckId, UserId};
use crate::model::progress::DeckProgress;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// A deck with its ordered cards and, once loaded for study, its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default, alias = "Cards")]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub progress: Option<DeckProgress>,
}

impl Deck {
    #[must_use]
    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    #[must_use]
    pub fn position_of(&self, card_id: CardId) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }

    pub fn card_ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.cards.iter().map(|c| c.id)
    }

    /// Remove a card and its progress entry.
    pub fn remove_card(&mut self, card_id: CardId) -> Option<Card> {
        let index = self.position_of(card_id)?;
        if let Some(progress) = self.progress.as_mut() {
            progress.remove_entry(card_id);
        }
        Some(self.cards.remove(index))
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckDraft {
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
}

impl DeckDraft {
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if name is empty or whitespace-only.
    pub fn validate(self) -> Result<DeckPayload, DeckError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DeckError::EmptyName);
        }
        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(DeckPayload {
            name: name.to_owned(),
            description,
            is_public: self.is_public,
        })
    }
}

/// Validated request body for deck create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckPayload {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    is_public: bool,
}

impl DeckPayload {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

//
// ─── RATINGS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: UserId,
    pub is_like: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Like/dislike tally for a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
    #[serde(default)]
    pub ratings: Vec<Rating>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::progress::ProgressStatus;

    fn deck_with_cards(n: u64) -> Deck {
        Deck {
            id: DeckId::new(1),
            name: "Capitals".into(),
            description: None,
            is_public: false,
            owner_id: None,
            cards: (1..=n)
                .map(|id| Card {
                    id: CardId::new(id),
                    deck_id: Some(DeckId::new(1)),
                    question: format!("Q{id}"),
                    answer: format!("A{id}"),
                })
                .collect(),
            progress: None,
        }
    }

    #[test]
    fn draft_requires_a_name() {
        let err = DeckDraft {
            name: "   ".into(),
            ..DeckDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }

    #[test]
    fn draft_drops_blank_description() {
        let payload = DeckDraft {
            name: " Verbs ".into(),
            description: Some("  ".into()),
            is_public: true,
        }
        .validate()
        .unwrap();
        assert_eq!(payload.name(), "Verbs");
        assert!(payload.description().is_none());
    }

    #[test]
    fn legacy_capitalized_cards_field_is_accepted() {
        let deck: Deck = serde_json::from_str(
            r#"{"id": 3, "name": "D", "Cards": [{"id": 1, "question": "q", "answer": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(deck.cards.len(), 1);
    }

    #[test]
    fn removing_a_card_drops_its_progress() {
        let mut deck = deck_with_cards(3);
        deck.progress = Some(DeckProgress::fresh(deck.id, deck.card_ids()));
        let removed = deck.remove_card(CardId::new(2)).unwrap();
        assert_eq!(removed.id, CardId::new(2));
        assert_eq!(deck.cards.len(), 2);
        let progress = deck.progress.as_ref().unwrap();
        assert!(progress.entry(CardId::new(2)).is_none());
        assert_eq!(progress.cards_with_status(ProgressStatus::Learning).len(), 2);
    }
}
