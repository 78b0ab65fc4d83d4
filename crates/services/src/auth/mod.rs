mod api;
mod coordinator;
mod single_flight;

pub use api::{AuthApi, AuthPayload};
pub use coordinator::{SessionCoordinator, SessionSnapshot};
pub use single_flight::SingleFlight;
