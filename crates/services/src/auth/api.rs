use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use study_core::model::{RegistrationDraft, User};

use crate::error::AuthError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Body returned by `auth/login` and `auth/refresh-token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Raw auth endpoints.
///
/// These bypass the refresh-and-retry path on purpose: a 401 from
/// `auth/refresh-token` must end the session, not trigger another refresh.
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn Transport>,
}

impl AuthApi {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        let request = ApiRequest::post("auth/login")
            .with_header("Content-Type", "application/json")
            .with_json(&Credentials { email, password })?;
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(AuthError::Rejected {
                message: response.error_message("Login failed"),
            });
        }
        decode(&response)
    }

    pub async fn register(&self, draft: &RegistrationDraft) -> Result<User, AuthError> {
        let request = ApiRequest::post("auth/register")
            .with_header("Content-Type", "application/json")
            .with_json(draft)?;
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(AuthError::Rejected {
                message: response.error_message("Registration failed"),
            });
        }
        decode(&response)
    }

    pub async fn refresh(&self, access_token: Option<&str>) -> Result<AuthPayload, AuthError> {
        let mut request = ApiRequest::post("auth/refresh-token");
        if let Some(token) = access_token {
            request.set_bearer(token);
        }
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(AuthError::Refresh {
                message: response.error_message("Token refresh failed"),
            });
        }
        decode(&response)
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let mut request = ApiRequest::post("auth/logout");
        request.set_bearer(access_token);
        let response = self.transport.send(&request).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(AuthError::NotAuthenticated),
            _ => Err(AuthError::Rejected {
                message: response.error_message("Logout failed"),
            }),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: &ApiResponse) -> Result<T, AuthError> {
    response
        .decode()
        .map_err(|e| AuthError::Malformed(e.to_string()))
}
