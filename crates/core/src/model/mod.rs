mod card;
mod deck;
mod ids;
mod progress;
mod study;
mod user;

pub use ids::{CardId, DeckId, SessionId, UserId};

pub use card::{Card, CardDraft, CardError, CardPayload};
pub use deck::{Deck, DeckDraft, DeckError, DeckPayload, Rating, RatingSummary};
pub use progress::{CardProgress, DeckProgress, ProgressStatus};
pub use study::{StudyCounters, StudySummary};
pub use user::{RegistrationDraft, User};
