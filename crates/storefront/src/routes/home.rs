//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use garagehub_core::booking::Garage;
use garagehub_core::catalog::Category;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Layout;
use crate::state::AppState;

/// Garages shown on the home page.
const FEATURED_GARAGES: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub categories: Vec<Category>,
    pub garages: Vec<Garage>,
    pub error: Option<String>,
}

/// Display the home page.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> HomeTemplate {
    let (categories, garages) =
        tokio::join!(state.backend().categories(), state.backend().garages());

    let mut error = None;
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories for home page");
        error = Some(e.user_message());
        Vec::new()
    });
    let garages = garages
        .map(|mut garages| {
            garages.truncate(FEATURED_GARAGES);
            garages
        })
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load garages for home page");
            error = Some(e.user_message());
            Vec::new()
        });

    HomeTemplate {
        layout: Layout::load(&session, user).await,
        categories,
        garages,
        error,
    }
}
