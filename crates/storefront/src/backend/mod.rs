//! Client for the GarageHub backend REST API.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`
//! - The backend is the source of truth - NO local sync, direct API calls
//! - Catalog responses (categories, per-category products) are cached in
//!   memory via `moka`; everything else is fetched fresh
//!
//! # Authentication
//!
//! The backend is not uniform about which endpoints want a bearer token.
//! Every request states its [`Access`] explicitly, and the method signatures
//! mirror that: public reads take no token, protected calls take `token: &str`,
//! and placing an order takes `Option<&str>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use garagehub_storefront::backend::{Access, BackendClient};
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let categories = client.categories().await?;
//! let products = client.products(&categories[0].id, None).await?;
//!
//! let bookings = client.my_bookings(&user.token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Token is valid but the action is not allowed for this user.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Backend returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the status reason.
        message: String,
    },

    /// A backend URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the error is the backend rejecting the request as invalid
    /// (as opposed to the backend being unreachable or broken).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::Unauthorized | Self::Forbidden(_) => true,
            Self::Api { status, .. } => *status >= 400 && *status < 500,
            _ => false,
        }
    }

    /// Message safe to show next to a form or list.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status, message } if (400..500).contains(status) => message.clone(),
            Self::NotFound(_) => "That record no longer exists.".to_string(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden(_) => "You are not allowed to do that.".to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
            _ => "We could not reach the server. Please try again.".to_string(),
        }
    }
}

/// Whether a backend call carries the signed-in user's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<'a> {
    /// No `Authorization` header.
    Public,
    /// `Authorization: Bearer <token>`.
    Bearer(&'a str),
}

impl<'a> Access<'a> {
    /// Send the token when there is one.
    #[must_use]
    pub fn optional(token: Option<&'a str>) -> Self {
        token.map_or(Self::Public, Self::Bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("garages/g1".to_string());
        assert_eq!(err.to_string(), "Not found: garages/g1");

        let err = BackendError::Api {
            status: 422,
            message: "Date is taken".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned 422: Date is taken");
    }

    #[test]
    fn test_user_message_hides_server_details() {
        let server = BackendError::Api {
            status: 500,
            message: "stack trace here".to_string(),
        };
        assert!(!server.user_message().contains("stack trace"));
        assert!(!server.is_client_error());

        let client = BackendError::Api {
            status: 409,
            message: "Slot already booked".to_string(),
        };
        assert_eq!(client.user_message(), "Slot already booked");
        assert!(client.is_client_error());
    }

    #[test]
    fn test_optional_access() {
        assert_eq!(Access::optional(None), Access::Public);
        assert_eq!(Access::optional(Some("t0k")), Access::Bearer("t0k"));
    }
}
