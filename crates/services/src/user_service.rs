use study_core::model::{User, UserId};
use tracing::warn;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::ApiRequest;

/// User lookups and the signed-in user's profile.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Reload the signed-in user from `auth/me` into the session.
    ///
    /// Returns `Ok(None)` without a request when signed out. A failure clears
    /// the stored user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the profile cannot be fetched, including after
    /// the refresh-and-retry path is exhausted.
    pub async fn fetch_current(&self) -> Result<Option<User>, ApiError> {
        let session = self.api.session();
        if !session.is_authenticated() {
            warn!("fetch user skipped: user is not authenticated");
            session.set_user(None);
            return Ok(None);
        }

        match self
            .api
            .fetch::<User>(ApiRequest::get("auth/me"), "Failed to fetch user data")
            .await
        {
            Ok(user) => {
                session.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(err) => {
                session.set_user(None);
                Err(err)
            }
        }
    }

    /// Public profile of another user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the user does not exist.
    pub async fn fetch(&self, user_id: UserId) -> Result<User, ApiError> {
        self.api
            .fetch_data(
                ApiRequest::get(format!("auth/{user_id}")),
                "Failed to fetch user data",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::SessionCoordinator;
    use crate::transport::{ScriptedTransport, Transport};
    use reqwest::Method;
    use serde_json::json;

    fn service() -> (ScriptedTransport, UserService) {
        let transport = ScriptedTransport::new();
        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let api = ApiClient::new(Arc::clone(&shared), SessionCoordinator::new(shared));
        (transport, UserService::new(api))
    }

    #[tokio::test]
    async fn signed_out_fetch_is_skipped() {
        let (transport, users) = service();
        assert_eq!(users.fetch_current().await.unwrap(), None);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn current_user_is_stored_in_session() {
        let (transport, users) = service();
        transport.push_json(
            Method::POST,
            "auth/login",
            200,
            json!({"accessToken": "t"}),
        );
        users.api.session().login("a@x.com", "pw").await.unwrap();
        assert!(users.api.session().current_user().is_none());

        transport.push_json(
            Method::GET,
            "auth/me",
            200,
            json!({"id": 4, "username": "ana"}),
        );
        let user = users.fetch_current().await.unwrap().unwrap();

        assert_eq!(user.username.as_deref(), Some("ana"));
        assert_eq!(users.api.session().current_user(), Some(user));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (transport, users) = service();
        transport.push_json(Method::GET, "auth/42", 404, json!({"detail": "User not found"}));
        let err = users.fetch(UserId::new(42)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "User not found");
    }
}
