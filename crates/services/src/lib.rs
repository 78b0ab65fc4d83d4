#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod card_service;
pub mod client;
pub mod config;
pub mod deck_service;
pub mod error;
pub mod sessions;
pub mod transport;
pub mod user_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use auth::{SessionCoordinator, SessionSnapshot};
pub use card_service::CardService;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use deck_service::{AnswerVerdict, DeckService};
pub use error::{ApiError, AuthError, ConfigError, ErrorKind, StudyError, TransportError};
pub use sessions::{DeckStore, StudyPhase, StudySession, StudySessionService};
pub use user_service::UserService;
