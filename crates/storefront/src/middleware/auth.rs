//! Authentication extractors.
//!
//! The backend issues the token and decides the role; the storefront only
//! remembers both in the session and gates pages by role.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use garagehub_core::Role;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user of any role.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Signed-in customer (books services, writes reviews).
pub struct RequireCustomer(pub CurrentUser);

/// Signed-in garage owner.
pub struct RequireOwner(pub CurrentUser);

/// Signed-in garage admin.
pub struct RequireAdmin(pub CurrentUser);

/// Signed-in garage owner or garage admin (booking status changes).
pub struct RequireStaff(pub CurrentUser);

/// Error returned when a page needs a user the session does not have.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in: send the browser to the login page.
    RedirectToLogin { htmx: bool },
    /// Signed in with a role that cannot use this page.
    Forbidden(Role),
    /// No session layer on this route.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            // HTMX swaps the response body, so ask it to navigate instead
            Self::RedirectToLogin { htmx: true } => (
                StatusCode::UNAUTHORIZED,
                [("HX-Redirect", HeaderValue::from_static("/auth/login"))],
            )
                .into_response(),
            Self::RedirectToLogin { htmx: false } => Redirect::to("/auth/login").into_response(),
            Self::Forbidden(role) => (
                StatusCode::FORBIDDEN,
                format!("This page is not available to a {}", role.label().to_lowercase()),
            )
                .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Any role is accepted when `allowed` is empty.
async fn require_user(parts: &Parts, allowed: &[Role]) -> Result<CurrentUser, AuthRejection> {
    if parts.extensions.get::<Session>().is_none() {
        return Err(AuthRejection::Unauthorized);
    }

    let user = current_user(parts)
        .await
        .ok_or_else(|| AuthRejection::RedirectToLogin {
            htmx: parts.headers.contains_key("hx-request"),
        })?;

    if allowed.is_empty() || allowed.contains(&user.role) {
        Ok(user)
    } else {
        Err(AuthRejection::Forbidden(user.role))
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts, &[]).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts, &[Role::Customer]).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireOwner
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts, &[Role::GarageOwner]).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts, &[Role::GarageAdmin]).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts, &[Role::GarageOwner, Role::GarageAdmin])
            .await
            .map(Self)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login session ID cannot be
/// reused after sign-in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Forget the signed-in user (logout).
///
/// The cart survives logout; the garage selection does not.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session
        .remove::<garagehub_core::GarageId>(session_keys::SELECTED_GARAGE)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use garagehub_core::Email;
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            token: "t0k".into(),
            role,
            name: "Chaminda".into(),
            email: Email::parse("chaminda@example.lk").unwrap(),
        }
    }

    async fn parts_with(user: Option<&CurrentUser>, htmx: bool) -> Parts {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        if let Some(user) = user {
            session
                .insert(session_keys::CURRENT_USER, user)
                .await
                .unwrap();
        }
        let mut builder = Request::builder().uri("/dashboard/owner");
        if htmx {
            builder = builder.header("hx-request", "true");
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        parts.extensions.insert(session);
        parts
    }

    #[tokio::test]
    async fn test_role_gate() {
        let owner = user(Role::GarageOwner);
        let mut parts = parts_with(Some(&owner), false).await;
        assert!(RequireOwner::from_request_parts(&mut parts, &()).await.is_ok());

        let rejection = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::Forbidden(Role::GarageOwner)));
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_staff_gate_admits_owners_and_admins() {
        for role in [Role::GarageOwner, Role::GarageAdmin] {
            let staff = user(role);
            let mut parts = parts_with(Some(&staff), true).await;
            assert!(RequireStaff::from_request_parts(&mut parts, &()).await.is_ok());
        }

        let customer = user(Role::Customer);
        let mut parts = parts_with(Some(&customer), true).await;
        let rejection = RequireStaff::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::Forbidden(Role::Customer)));
    }

    #[tokio::test]
    async fn test_anonymous_is_sent_to_login() {
        let mut parts = parts_with(None, false).await;
        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::SEE_OTHER);

        let mut parts = parts_with(None, true).await;
        let response = RequireCustomer::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login");
    }

    #[tokio::test]
    async fn test_optional_auth() {
        let mut parts = parts_with(None, false).await;
        let OptionalAuth(nobody) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(nobody.is_none());

        let customer = user(Role::Customer);
        let mut parts = parts_with(Some(&customer), false).await;
        let OptionalAuth(someone) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(someone.unwrap().name, "Chaminda");
    }
}
