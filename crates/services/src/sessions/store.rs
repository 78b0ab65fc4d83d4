use std::fmt::Display;

use study_core::Clock;
use study_core::model::{
    Card, CardDraft, CardId, Deck, DeckDraft, DeckId, DeckProgress, StudySummary,
};
use tracing::{debug, info};

use super::api::{RemoteSession, StudySessionService};
use super::state::{StudyPhase, StudySession};
use crate::card_service::CardService;
use crate::deck_service::{AnswerVerdict, DeckService};
use crate::error::{ApiError, StudyError};

/// Deck library plus the active study session, with view-facing
/// `loading`/`error` flags.
///
/// Every async operation sets `loading` while its request runs, clears it
/// afterwards, and records the failure message in `error`. Local state only
/// changes after the request succeeded.
pub struct DeckStore {
    decks_api: DeckService,
    cards_api: CardService,
    sessions_api: StudySessionService,
    decks: Vec<Deck>,
    study: StudySession,
    loading: bool,
    error: Option<String>,
}

impl DeckStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks_api: DeckService,
        cards_api: CardService,
        sessions_api: StudySessionService,
    ) -> Self {
        Self {
            decks_api,
            cards_api,
            sessions_api,
            decks: Vec::new(),
            study: StudySession::new(clock),
            loading: false,
            error: None,
        }
    }

    //
    // ─── VIEW STATE ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    #[must_use]
    pub fn study(&self) -> &StudySession {
        &self.study
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.study.current_card()
    }

    #[must_use]
    pub fn is_last_card(&self) -> bool {
        self.study.is_last_card()
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        self.study.progress_percentage()
    }

    #[must_use]
    pub fn study_summary(&self) -> StudySummary {
        self.study.summary()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn begin_request(&mut self) {
        self.loading = true;
    }

    fn settle<T, E: Display>(&mut self, result: Result<T, E>) -> Result<T, E> {
        self.loading = false;
        if let Err(err) = &result {
            self.error = Some(err.to_string());
        }
        result
    }

    //
    // ─── LIBRARY ───────────────────────────────────────────────────────────────
    //

    /// Replace the library with the signed-in user's decks.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the list cannot be fetched; the library is kept.
    pub async fn fetch_decks(&mut self) -> Result<&[Deck], ApiError> {
        self.begin_request();
        let result = self.decks_api.own().await;
        self.decks = self.settle(result)?;
        Ok(&self.decks)
    }

    /// # Errors
    ///
    /// Returns `ApiError` for validation or request failures.
    pub async fn create_deck(&mut self, draft: DeckDraft) -> Result<Deck, ApiError> {
        self.begin_request();
        let result = self.decks_api.create(draft).await;
        let deck = self.settle(result)?;
        self.decks.push(deck.clone());
        Ok(deck)
    }

    /// # Errors
    ///
    /// Returns `ApiError` for validation or request failures.
    pub async fn update_deck(&mut self, deck_id: DeckId, draft: DeckDraft) -> Result<Deck, ApiError> {
        self.begin_request();
        let result = self.decks_api.update(deck_id, draft).await;
        let updated = self.settle(result)?;
        if let Some(slot) = self.decks.iter_mut().find(|d| d.id == deck_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the server refuses the deletion.
    pub async fn delete_deck(&mut self, deck_id: DeckId) -> Result<(), ApiError> {
        self.begin_request();
        let result = self.decks_api.delete(deck_id).await;
        self.settle(result)?;
        self.decks.retain(|d| d.id != deck_id);
        if self.study.deck().is_some_and(|d| d.id == deck_id) {
            self.study = StudySession::new(self.study.clock());
        }
        Ok(())
    }

    //
    // ─── CARDS ─────────────────────────────────────────────────────────────────
    //

    /// Create a card; it is appended to the study deck when that deck is loaded.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for validation or request failures.
    pub async fn add_card(&mut self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ApiError> {
        self.begin_request();
        let result = self.cards_api.create(deck_id, draft).await;
        let card = self.settle(result)?;
        if self.study.deck().is_some_and(|d| d.id == deck_id) {
            self.study.add_card(card.clone());
        }
        Ok(card)
    }

    /// Delete a card, keeping the study cursor in bounds.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the server refuses the deletion.
    pub async fn delete_card(&mut self, deck_id: DeckId, card_id: CardId) -> Result<(), ApiError> {
        self.begin_request();
        let result = self.cards_api.delete(deck_id, card_id).await;
        self.settle(result)?;
        if self.study.deck().is_some_and(|d| d.id == deck_id) {
            self.study.remove_card(card_id);
        }
        if let Some(deck) = self.decks.iter_mut().find(|d| d.id == deck_id) {
            deck.remove_card(card_id);
        }
        Ok(())
    }

    //
    // ─── STUDY ─────────────────────────────────────────────────────────────────
    //

    /// Fetch a deck with its progress and make it the study deck.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Api` if the deck or its progress cannot be fetched.
    /// A missing progress snapshot is not an error.
    pub async fn load_deck(&mut self, deck_id: DeckId) -> Result<&Deck, StudyError> {
        self.begin_request();
        let result = self.fetch_deck_with_progress(deck_id).await;
        let (deck, progress) = self.settle(result)?;
        if progress.is_none() {
            debug!(%deck_id, "synthesizing default progress");
        }
        self.study.load(deck, progress);
        self.study.deck().ok_or(StudyError::NoDeck)
    }

    async fn fetch_deck_with_progress(
        &self,
        deck_id: DeckId,
    ) -> Result<(Deck, Option<DeckProgress>), StudyError> {
        let deck = self.decks_api.get(deck_id).await?;
        let progress = self.decks_api.progress(deck_id).await?;
        Ok((deck, progress))
    }

    /// Open a study session, loading the deck first if it is not the study deck.
    /// An unfinished server-side session for the deck is resumed.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Api` on request failures.
    pub async fn start_session(&mut self, deck_id: DeckId) -> Result<(), StudyError> {
        if !self.study.deck().is_some_and(|d| d.id == deck_id) {
            self.load_deck(deck_id).await?;
        }

        self.begin_request();
        let result = self.open_remote_session(deck_id).await;
        let remote = self.settle(result)?;
        info!(%deck_id, session_id = %remote.id, "study session started");
        self.study.begin(Some(remote))
    }

    async fn open_remote_session(
        &self,
        deck_id: DeckId,
    ) -> Result<RemoteSession, StudyError> {
        if let Some(existing) = self.sessions_api.current(deck_id).await? {
            return Ok(existing);
        }
        Ok(self.sessions_api.start(deck_id).await?)
    }

    /// Grade an answer for the current card.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NoDeck`/`NoCurrentCard`/`Completed` without a
    /// request when there is nothing to answer, or `StudyError::Api` when the
    /// submission fails. Counters and progress are unchanged on error.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<AnswerVerdict, StudyError> {
        let card_id = self.study.answerable_card()?.id;
        let deck_id = self.study.deck().map(|d| d.id).ok_or(StudyError::NoDeck)?;

        self.begin_request();
        let result = self
            .decks_api
            .submit_answer(deck_id, card_id, answer)
            .await
            .map_err(StudyError::from);
        let verdict = self.settle(result)?;

        self.study.record_answer(card_id, answer, verdict.clone())?;
        Ok(verdict)
    }

    /// Close the session and fold the server's final progress into the deck.
    ///
    /// Without a server-side session the deck's current progress snapshot is
    /// used instead.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::NoDeck` if nothing is loaded, or `StudyError::Api`.
    pub async fn end_session(&mut self) -> Result<StudySummary, StudyError> {
        let deck = self.study.deck().ok_or(StudyError::NoDeck)?;
        let deck_id = deck.id;
        let card_ids: Vec<CardId> = deck.card_ids().collect();
        let remote_id = self.study.remote_session().map(|s| s.id);
        let mut summary = self.study.summary();

        self.begin_request();
        let result = match remote_id {
            Some(session_id) => self.sessions_api.end(session_id).await,
            None => self
                .decks_api
                .progress(deck_id)
                .await
                .map(|p| p.unwrap_or_else(|| DeckProgress::fresh(deck_id, card_ids))),
        }
        .map_err(StudyError::from);
        let final_progress = self.settle(result)?;

        summary.completion_percentage = final_progress.completion_percentage;
        self.study.finish(final_progress)?;
        info!(
            %deck_id,
            correct = summary.counters.correct(),
            incorrect = summary.counters.incorrect(),
            "study session ended"
        );
        Ok(summary)
    }

    pub fn next_card(&mut self) {
        self.study.next_card();
    }

    pub fn previous_card(&mut self) {
        self.study.previous_card();
    }

    pub fn toggle_answer(&mut self) {
        self.study.toggle_answer();
    }

    pub fn reset_session(&mut self) {
        self.study.reset();
    }

    #[must_use]
    pub fn phase(&self) -> StudyPhase {
        self.study.phase()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
