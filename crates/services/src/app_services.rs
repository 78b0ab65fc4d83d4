use std::sync::Arc;

use crate::Clock;
use crate::auth::SessionCoordinator;
use crate::card_service::CardService;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::deck_service::DeckService;
use crate::error::TransportError;
use crate::sessions::{DeckStore, StudySessionService};
use crate::transport::{HttpTransport, Transport};
use crate::user_service::UserService;

/// Assembles app-facing services over one transport and one session.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    session: SessionCoordinator,
    decks: DeckService,
    cards: CardService,
    users: UserService,
    study_sessions: StudySessionService,
}

impl AppServices {
    /// Build services backed by the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the HTTP client cannot be constructed.
    pub fn new_http(config: &ClientConfig, clock: Clock) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(transport, clock))
    }

    /// Build services over any transport; the session coordinator and the
    /// retrying client share it.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, clock: Clock) -> Self {
        let session = SessionCoordinator::new(Arc::clone(&transport));
        let api = ApiClient::new(transport, session.clone());

        Self {
            clock,
            session,
            decks: DeckService::new(api.clone()),
            cards: CardService::new(api.clone()),
            users: UserService::new(api.clone()),
            study_sessions: StudySessionService::new(api),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }

    #[must_use]
    pub fn decks(&self) -> &DeckService {
        &self.decks
    }

    #[must_use]
    pub fn cards(&self) -> &CardService {
        &self.cards
    }

    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.users
    }

    #[must_use]
    pub fn study_sessions(&self) -> &StudySessionService {
        &self.study_sessions
    }

    /// A fresh deck store with an empty library and no study deck.
    #[must_use]
    pub fn deck_store(&self) -> DeckStore {
        DeckStore::new(
            self.clock,
            self.decks.clone(),
            self.cards.clone(),
            self.study_sessions.clone(),
        )
    }
}
