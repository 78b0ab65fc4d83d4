use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CardId, DeckId};

/// Study status of a single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    #[default]
    Learning,
    Known,
}

/// Server-side progress entry for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    pub card_id: CardId,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub next_review: Option<DateTime<Utc>>,
}

impl CardProgress {
    /// Entry for a card that has never been reviewed.
    #[must_use]
    pub fn unseen(card_id: CardId) -> Self {
        Self {
            card_id,
            status: ProgressStatus::Learning,
            review_count: 0,
            next_review: None,
        }
    }
}

/// Progress snapshot for a deck, keyed by card id.
///
/// Entries keep the order in which the server (or local merges) introduced
/// them. Per-status card lists are derived from the entries, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckProgress {
    pub deck_id: DeckId,
    #[serde(default, rename = "progress")]
    entries: Vec<CardProgress>,
    #[serde(default)]
    pub completion_percentage: f64,
}

impl DeckProgress {
    #[must_use]
    pub fn new(deck_id: DeckId, entries: Vec<CardProgress>, completion_percentage: f64) -> Self {
        Self {
            deck_id,
            entries,
            completion_percentage,
        }
    }

    /// Snapshot used when the server has none yet: every card `learning`,
    /// zero reviews, zero completion.
    #[must_use]
    pub fn fresh<I>(deck_id: DeckId, card_ids: I) -> Self
    where
        I: IntoIterator<Item = CardId>,
    {
        Self {
            deck_id,
            entries: card_ids.into_iter().map(CardProgress::unseen).collect(),
            completion_percentage: 0.0,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[CardProgress] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, card_id: CardId) -> Option<&CardProgress> {
        self.entries.iter().find(|e| e.card_id == card_id)
    }

    /// Replace the entry for `update.card_id` in place, or append it.
    pub fn merge_entry(&mut self, update: CardProgress) {
        match self.entries.iter_mut().find(|e| e.card_id == update.card_id) {
            Some(existing) => *existing = update,
            None => self.entries.push(update),
        }
        self.completion_percentage = self.known_percentage();
    }

    /// Drop the entry for a deleted card.
    pub fn remove_entry(&mut self, card_id: CardId) -> Option<CardProgress> {
        let index = self.entries.iter().position(|e| e.card_id == card_id)?;
        let removed = self.entries.remove(index);
        self.completion_percentage = self.known_percentage();
        Some(removed)
    }

    #[must_use]
    pub fn cards_with_status(&self, status: ProgressStatus) -> Vec<CardId> {
        self.entries
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.card_id)
            .collect()
    }

    #[must_use]
    pub fn known_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == ProgressStatus::Known)
            .count()
    }

    /// Share of entries marked known, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn known_percentage(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.known_count() as f64 / self.entries.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(id: u64) -> CardProgress {
        CardProgress {
            card_id: CardId::new(id),
            status: ProgressStatus::Known,
            review_count: 1,
            next_review: None,
        }
    }

    #[test]
    fn fresh_snapshot_marks_everything_learning() {
        let progress = DeckProgress::fresh(DeckId::new(1), (1..=3).map(CardId::new));
        assert_eq!(progress.entries().len(), 3);
        assert!(
            progress
                .entries()
                .iter()
                .all(|e| e.status == ProgressStatus::Learning && e.review_count == 0)
        );
        assert!(progress.completion_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn merge_updates_in_place_then_appends() {
        let mut progress = DeckProgress::fresh(DeckId::new(1), [CardId::new(1), CardId::new(2)]);
        progress.merge_entry(known(2));
        assert_eq!(progress.entries()[1], known(2));
        assert_eq!(progress.entries().len(), 2);

        progress.merge_entry(known(9));
        assert_eq!(progress.entries().len(), 3);
        assert_eq!(progress.entries()[2].card_id, CardId::new(9));
        assert_eq!(
            progress.cards_with_status(ProgressStatus::Learning),
            vec![CardId::new(1)]
        );
    }

    #[test]
    fn completion_follows_known_share() {
        let mut progress = DeckProgress::fresh(DeckId::new(1), (1..=4).map(CardId::new));
        progress.merge_entry(known(1));
        assert!((progress.completion_percentage - 25.0).abs() < 1e-9);
        progress.remove_entry(CardId::new(2));
        assert!((progress.completion_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_reads_server_shape() {
        let json = r#"{
            "deckId": 4,
            "progress": [{"cardId": 1, "status": "known", "reviewCount": 3,
                          "nextReview": "2024-01-01T00:00:00Z"}],
            "completionPercentage": 100
        }"#;
        let progress: DeckProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.deck_id, DeckId::new(4));
        assert_eq!(progress.entry(CardId::new(1)).unwrap().review_count, 3);
        assert!(progress.entry(CardId::new(1)).unwrap().next_review.is_some());
    }
}
