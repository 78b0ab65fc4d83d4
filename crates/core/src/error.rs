use thiserror::Error;

use crate::model::{CardError, DeckError};

/// Validation failures raised while building request payloads from drafts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Deck(#[from] DeckError),
}
