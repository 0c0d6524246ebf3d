//! Request and response bodies that belong to the backend API surface
//! rather than to the domain (auth, order confirmation, error envelopes).

use garagehub_core::{Email, OrderId, Role};
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// The user the backend authenticated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}

/// Response of login and register.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Response of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body the backend sends with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Pull a human message out of a response body, if it has one.
    #[must_use]
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|parsed| parsed.message)
            .filter(|message| !message.trim().is_empty())
    }
}
