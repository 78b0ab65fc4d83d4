use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use study_core::Clock;
use study_core::model::{
    Card, CardId, CardProgress, Deck, DeckProgress, StudyCounters, StudySummary,
};

use super::api::RemoteSession;
use crate::deck_service::AnswerVerdict;
use crate::error::StudyError;

/// Lifecycle of a study session. `Loaded` and `Studying` are re-entered
/// whenever a deck is (re)loaded or a session (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudyPhase {
    #[default]
    Empty,
    Loaded,
    Studying,
    Completed,
}

/// What the learner answered for a card in this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub answer: String,
    pub is_correct: bool,
}

/// Client-side study state for one deck.
///
/// Pure state: no I/O happens here. `DeckStore` performs the requests and
/// feeds their results in, so every transition below is all-or-nothing.
pub struct StudySession {
    clock: Clock,
    phase: StudyPhase,
    deck: Option<Deck>,
    card_index: usize,
    show_answer: bool,
    counters: StudyCounters,
    answers: HashMap<CardId, AnswerRecord>,
    remote: Option<RemoteSession>,
    started_at: Option<DateTime<Utc>>,
}

impl StudySession {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            phase: StudyPhase::Empty,
            deck: None,
            card_index: 0,
            show_answer: false,
            counters: StudyCounters::default(),
            answers: HashMap::new(),
            remote: None,
            started_at: None,
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn phase(&self) -> StudyPhase {
        self.phase
    }

    #[must_use]
    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    #[must_use]
    pub fn card_index(&self) -> usize {
        self.card_index
    }

    #[must_use]
    pub fn show_answer(&self) -> bool {
        self.show_answer
    }

    #[must_use]
    pub fn counters(&self) -> StudyCounters {
        self.counters
    }

    #[must_use]
    pub fn answer_for(&self, card_id: CardId) -> Option<&AnswerRecord> {
        self.answers.get(&card_id)
    }

    #[must_use]
    pub fn remote_session(&self) -> Option<&RemoteSession> {
        self.remote.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.deck.as_ref()?.card(self.card_index)
    }

    /// True when the cursor sits on the final card, or there are no cards.
    #[must_use]
    pub fn is_last_card(&self) -> bool {
        match self.deck.as_ref() {
            Some(deck) if !deck.cards.is_empty() => self.card_index + 1 == deck.cards.len(),
            _ => true,
        }
    }

    /// Cursor position as a share of the deck, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percentage(&self) -> f64 {
        match self.deck.as_ref() {
            Some(deck) if !deck.cards.is_empty() => {
                self.card_index as f64 / deck.cards.len() as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn summary(&self) -> StudySummary {
        let deck = self.deck.as_ref();
        StudySummary {
            counters: self.counters,
            accuracy_percentage: self.counters.accuracy_percentage(),
            cards_in_deck: deck.map_or(0, |d| d.cards.len()),
            cards_answered: self.answers.len(),
            completion_percentage: deck
                .and_then(|d| d.progress.as_ref())
                .map_or(0.0, |p| p.completion_percentage),
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Install a freshly fetched deck. A missing progress snapshot is replaced
    /// by one marking every card as learning.
    pub fn load(&mut self, mut deck: Deck, progress: Option<DeckProgress>) {
        let progress = progress.unwrap_or_else(|| DeckProgress::fresh(deck.id, deck.card_ids()));
        deck.progress = Some(progress);
        self.deck = Some(deck);
        self.remote = None;
        self.started_at = None;
        self.phase = StudyPhase::Loaded;
        self.reset();
    }

    /// Open a session boundary on the loaded deck.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NoDeck` if nothing is loaded.
    pub fn begin(&mut self, remote: Option<RemoteSession>) -> Result<(), StudyError> {
        if self.deck.is_none() {
            return Err(StudyError::NoDeck);
        }
        self.reset();
        self.remote = remote;
        self.started_at = Some(self.clock.now());
        self.phase = StudyPhase::Studying;
        Ok(())
    }

    /// The card an answer may be submitted for.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NoDeck`, `StudyError::Completed` or
    /// `StudyError::NoCurrentCard` when answering is not possible.
    pub fn answerable_card(&self) -> Result<&Card, StudyError> {
        if self.deck.is_none() {
            return Err(StudyError::NoDeck);
        }
        if self.phase == StudyPhase::Completed {
            return Err(StudyError::Completed);
        }
        self.current_card().ok_or(StudyError::NoCurrentCard)
    }

    /// Apply a graded answer: progress, counters and the answer log move together.
    ///
    /// # Errors
    ///
    /// Returns the `answerable_card` errors, or `StudyError::NoCurrentCard`
    /// if `card_id` is no longer in the deck. State is untouched on error.
    pub fn record_answer(
        &mut self,
        card_id: CardId,
        answer: &str,
        verdict: AnswerVerdict,
    ) -> Result<(), StudyError> {
        self.answerable_card()?;
        let deck = self.deck.as_mut().ok_or(StudyError::NoDeck)?;
        if deck.position_of(card_id).is_none() {
            return Err(StudyError::NoCurrentCard);
        }

        if let Some(update) = verdict.updated_progress {
            let deck_id = deck.id;
            deck.progress
                .get_or_insert_with(|| DeckProgress::fresh(deck_id, std::iter::empty()))
                .merge_entry(update);
        }
        self.counters.record(verdict.is_correct);
        self.answers.insert(
            card_id,
            AnswerRecord {
                answer: answer.to_owned(),
                is_correct: verdict.is_correct,
            },
        );
        self.phase = StudyPhase::Studying;
        Ok(())
    }

    /// Close the session with the server's final deck progress.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NoDeck` if nothing is loaded.
    pub fn finish(&mut self, final_progress: DeckProgress) -> Result<(), StudyError> {
        let deck = self.deck.as_mut().ok_or(StudyError::NoDeck)?;
        let completion = final_progress.completion_percentage;
        let progress = deck
            .progress
            .get_or_insert_with(|| DeckProgress::fresh(final_progress.deck_id, std::iter::empty()));
        for entry in final_progress.entries() {
            progress.merge_entry(entry.clone());
        }
        progress.completion_percentage = completion;

        self.counters = StudyCounters::default();
        self.answers.clear();
        self.show_answer = false;
        self.remote = None;
        self.phase = StudyPhase::Completed;
        Ok(())
    }

    /// Move forward one card. No-op on the last card.
    pub fn next_card(&mut self) {
        let Some(len) = self.deck.as_ref().map(|d| d.cards.len()) else {
            return;
        };
        if self.card_index + 1 < len {
            self.card_index += 1;
            self.show_answer = false;
        }
    }

    /// Move back one card. No-op on the first card.
    pub fn previous_card(&mut self) {
        if self.deck.is_none() {
            return;
        }
        if self.card_index > 0 {
            self.card_index -= 1;
            self.show_answer = false;
        }
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    /// Back to the first card with a clean tally, keeping the deck.
    pub fn reset(&mut self) {
        self.card_index = 0;
        self.show_answer = false;
        self.counters = StudyCounters::default();
        self.answers.clear();
    }

    /// Append a newly created card (and an unseen progress entry) if it
    /// belongs to the loaded deck.
    pub fn add_card(&mut self, card: Card) {
        let Some(deck) = self.deck.as_mut() else {
            return;
        };
        if let Some(progress) = deck.progress.as_mut() {
            progress.merge_entry(CardProgress::unseen(card.id));
        }
        deck.cards.push(card);
    }

    /// Drop a deleted card, pulling the cursor back into bounds.
    pub fn remove_card(&mut self, card_id: CardId) -> Option<Card> {
        let deck = self.deck.as_mut()?;
        let index = deck.position_of(card_id)?;
        let removed = deck.remove_card(card_id)?;
        let len = deck.cards.len();

        if index == self.card_index {
            self.show_answer = false;
        }
        if index < self.card_index {
            self.card_index -= 1;
        }
        if self.card_index >= len {
            self.card_index = len.saturating_sub(1);
        }
        self.answers.remove(&card_id);
        Some(removed)
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("phase", &self.phase)
            .field("deck_id", &self.deck.as_ref().map(|d| d.id))
            .field("cards_len", &self.deck.as_ref().map_or(0, |d| d.cards.len()))
            .field("card_index", &self.card_index)
            .field("show_answer", &self.show_answer)
            .field("counters", &self.counters)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
