//! Authentication route handlers.
//!
//! Credentials go straight to the backend. On success the returned token,
//! role, name, and email are kept in the session and the user lands on the
//! page for their role.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use garagehub_core::{Email, Role};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{AuthResponse, BackendError, LoginRequest, RegisterRequest};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::Layout;
use crate::state::AppState;

/// Shortest password accepted at sign-up.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub role: String,
}

/// Role choice on the sign-up form.
#[derive(Clone)]
pub struct RoleOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn role_options(selected: Role) -> Vec<RoleOption> {
    Role::ALL
        .into_iter()
        .map(|role| RoleOption {
            value: role.as_str(),
            label: role.label(),
            selected: role == selected,
        })
        .collect()
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub roles: Vec<RoleOption>,
    pub error: Option<String>,
}

/// Where a freshly signed-in user is sent.
#[must_use]
pub const fn landing_page(role: Role) -> &'static str {
    match role {
        Role::Customer => "/account",
        Role::GarageOwner => "/dashboard/owner",
        Role::GarageAdmin => "/dashboard/admin",
    }
}

fn auth_error_message(err: &BackendError, action: &str) -> String {
    match err {
        BackendError::Unauthorized => "Incorrect email or password.".to_string(),
        BackendError::Api { status, message } if (400..500).contains(status) => message.clone(),
        _ => format!("We could not {action} right now. Please try again."),
    }
}

async fn start_session(session: &Session, auth: AuthResponse) -> Result<Role, Response> {
    let user = CurrentUser {
        token: auth.token,
        role: auth.user.role,
        name: auth.user.name,
        email: auth.user.email,
    };
    if let Err(e) = set_current_user(session, &user).await {
        tracing::error!(error = %e, "Failed to store user in session");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not start your session",
        )
            .into_response());
    }
    set_sentry_user(user.email.as_str(), user.role.as_str());
    Ok(user.role)
}

/// Display the login page.
pub async fn login_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if let Some(user) = user {
        return Redirect::to(landing_page(user.role)).into_response();
    }
    LoginTemplate {
        layout: Layout::load(&session, None).await,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_owned();
    if email.is_empty() || form.password.is_empty() {
        return login_error(&session, email, "Enter your email and password.".to_string()).await;
    }

    let request = LoginRequest {
        email: email.clone(),
        password: form.password,
    };
    match state.backend().login(&request).await {
        Ok(auth) => match start_session(&session, auth).await {
            Ok(role) => {
                tracing::info!(role = %role, "User signed in");
                Redirect::to(landing_page(role)).into_response()
            }
            Err(response) => response,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            login_error(&session, email, auth_error_message(&e, "sign you in")).await
        }
    }
}

async fn login_error(session: &Session, email: String, error: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        LoginTemplate {
            layout: Layout::load(session, None).await,
            email,
            error: Some(error),
        },
    )
        .into_response()
}

/// Display the registration page.
pub async fn register_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if let Some(user) = user {
        return Redirect::to(landing_page(user.role)).into_response();
    }
    RegisterTemplate {
        layout: Layout::load(&session, None).await,
        name: String::new(),
        email: String::new(),
        roles: role_options(Role::Customer),
        error: None,
    }
    .into_response()
}

/// Check a sign-up form before it is sent to the backend.
fn validate_registration(form: &RegisterForm) -> Result<(Email, Role), String> {
    if form.name.trim().is_empty() {
        return Err("Please enter your name.".to_string());
    }
    let email = Email::parse(&form.email).map_err(|e| format!("Invalid email address: {e}"))?;
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if form.password != form.password_confirm {
        return Err("Passwords do not match.".to_string());
    }
    let role = if form.role.trim().is_empty() {
        Role::Customer
    } else {
        form.role.parse()?
    };
    Ok((email, role))
}

async fn register_error(session: &Session, form: &RegisterForm, error: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        RegisterTemplate {
            layout: Layout::load(session, None).await,
            name: form.name.trim().to_owned(),
            email: form.email.trim().to_owned(),
            roles: role_options(form.role.parse().unwrap_or_default()),
            error: Some(error),
        },
    )
        .into_response()
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let (email, role) = match validate_registration(&form) {
        Ok(valid) => valid,
        Err(error) => return register_error(&session, &form, error).await,
    };

    let request = RegisterRequest {
        name: form.name.trim().to_owned(),
        email: email.into_inner(),
        password: form.password.clone(),
        role,
    };
    match state.backend().register(&request).await {
        Ok(auth) => match start_session(&session, auth).await {
            Ok(role) => {
                tracing::info!(role = %role, "User registered");
                Redirect::to(landing_page(role)).into_response()
            }
            Err(response) => response,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            register_error(&session, &form, auth_error_message(&e, "create your account")).await
        }
    }
}

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str, role: &str) -> RegisterForm {
        RegisterForm {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            password_confirm: confirm.into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_registration_defaults_to_customer() {
        let (email, role) =
            validate_registration(&form("Saman", "saman@example.lk", "longenough", "longenough", ""))
                .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(email.as_str(), "saman@example.lk");
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_registration_rejections() {
        assert!(validate_registration(&form(" ", "a@b.lk", "longenough", "longenough", "")).is_err());
        assert!(validate_registration(&form("S", "nope", "longenough", "longenough", "")).is_err());
        assert!(validate_registration(&form("S", "a@b.lk", "short", "short", "")).is_err());
        assert!(validate_registration(&form("S", "a@b.lk", "longenough", "different", "")).is_err());
        assert!(
            validate_registration(&form("S", "a@b.lk", "longenough", "longenough", "mechanic"))
                .is_err()
        );
    }

    #[test]
    fn test_owner_registration() {
        let (_, role) = validate_registration(&form(
            "S",
            "a@b.lk",
            "longenough",
            "longenough",
            "garageOwner",
        ))
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(role, Role::GarageOwner);
        assert_eq!(landing_page(role), "/dashboard/owner");
    }
}
