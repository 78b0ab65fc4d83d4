mod api;
mod state;
mod store;

// Public API of the study subsystem.
pub use crate::error::StudyError;
pub use api::{RemoteSession, StudySessionService};
pub use state::{AnswerRecord, StudyPhase, StudySession};
pub use store::DeckStore;
