use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Identity record returned by the auth endpoints.
///
/// Only `id` is required; everything else is carried through as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sign-up form, sent as-is to `auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(user.id, UserId::new(5));
        assert!(user.username.is_none());
        assert!(user.email.is_none());
    }
}
