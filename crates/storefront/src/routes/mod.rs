//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//!
//! # Catalog
//! GET  /catalog                   - Category browser with facet filters and paging
//! POST /catalog/categories/{id}/toggle - Expand/collapse a category (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (returns badge, triggers cart-updated)
//! POST /cart/update               - Update quantity (returns cart_items fragment)
//! POST /cart/remove               - Remove item (returns cart_items fragment)
//! GET  /cart/count                - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                  - Checkout form
//! POST /checkout                  - Validate and place the order
//! POST /checkout/field            - Save one edited field, clear its error (HTMX)
//! GET  /checkout/fee              - Delivery fee and totals for a region (HTMX)
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Account (customer)
//! GET    /account                 - My bookings and my reviews
//! DELETE /account/bookings/{id}   - Cancel a booking (HTMX)
//!
//! # Reviews
//! GET    /reviews                 - All reviews, with the review form for customers
//! POST   /reviews                 - Create a review
//! GET    /reviews/{id}/edit       - Edit form for an own review
//! POST   /reviews/{id}            - Update an own review
//! DELETE /reviews/{id}            - Delete an own review (HTMX)
//!
//! # Garages
//! GET  /garages                   - Garage roster
//! GET  /garages/{id}              - Garage detail, services, booking form
//! POST /garages/{id}/bookings     - Book a service
//! POST /garages/select            - Owner or admin: pick the garage to manage
//!
//! # Dashboards
//! GET    /dashboard/owner                       - Stats, bookings, services (admins: bookings)
//! POST   /dashboard/owner/bookings/{id}/status  - Accept/reject (HTMX)
//! POST   /dashboard/owner/services              - Add a service (HTMX)
//! POST   /dashboard/owner/services/{id}         - Edit a service (HTMX)
//! DELETE /dashboard/owner/services/{id}         - Delete a service (HTMX)
//! GET    /dashboard/admin                       - Stats and garage roster
//! POST   /dashboard/admin/garages               - Add a garage (HTMX)
//! POST   /dashboard/admin/garages/{id}          - Edit a garage (HTMX)
//! DELETE /dashboard/admin/garages/{id}          - Delete a garage (HTMX)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod garages;
pub mod home;
pub mod reviews;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, get, post},
};
use garagehub_core::Role;
use garagehub_core::cart::{Cart, CartStore};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::models::{CurrentUser, SessionCartStore};
use crate::state::AppState;

// =============================================================================
// Shared page data
// =============================================================================

/// Data every full page needs for the header.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
}

impl Layout {
    /// Build the header data for the current session.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        let cart_count = load_cart(session).await.item_count();
        Self { user, cart_count }
    }

    fn has_role(&self, role: Role) -> bool {
        self.user.as_ref().is_some_and(|user| user.role == role)
    }

    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.has_role(Role::Customer)
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.has_role(Role::GarageOwner)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::GarageAdmin)
    }
}

/// Load the session cart, treating an unreadable cart as empty.
pub async fn load_cart(session: &Session) -> Cart {
    SessionCartStore::new(session.clone())
        .load()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load cart from session");
            Cart::new()
        })
}

/// Inline message fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/flash.html")]
pub struct FlashTemplate {
    pub message: String,
    pub is_error: bool,
}

/// Show an error in the page's flash area instead of the HTMX target.
pub fn flash_error(message: impl Into<String>) -> Response {
    (
        AppendHeaders([("HX-Retarget", "#flash"), ("HX-Reswap", "innerHTML")]),
        FlashTemplate {
            message: message.into(),
            is_error: true,
        },
    )
        .into_response()
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

// =============================================================================
// Routers
// =============================================================================

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/categories/{id}/toggle", post(catalog::toggle_category))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(
            Router::new()
                .route("/add", post(cart::add))
                .route("/update", post(cart::update))
                .route("/remove", post(cart::remove))
                .route_layer(api_rate_limiter()),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place_order))
        .route("/field", post(checkout::update_field))
        .route("/fee", get(checkout::fee))
        .route_layer(api_rate_limiter())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).route_layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).route_layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/bookings/{id}", delete(account::cancel_booking))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index).post(reviews::create))
        .route("/{id}", post(reviews::update).delete(reviews::delete))
        .route("/{id}/edit", get(reviews::edit))
}

/// Create the garage routes router.
pub fn garage_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(garages::index))
        .route("/select", post(garages::select))
        .route("/{id}", get(garages::show))
        .route(
            "/{id}/bookings",
            post(garages::book).route_layer(api_rate_limiter()),
        )
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/owner", get(dashboard::owner))
        .route(
            "/owner/bookings/{id}/status",
            post(dashboard::update_booking_status),
        )
        .route("/owner/services", post(dashboard::create_service))
        .route(
            "/owner/services/{id}",
            post(dashboard::update_service).delete(dashboard::delete_service),
        )
        .route("/admin", get(dashboard::admin))
        .route("/admin/garages", post(dashboard::create_garage))
        .route(
            "/admin/garages/{id}",
            post(dashboard::update_garage).delete(dashboard::delete_garage),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/catalog", catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/reviews", review_routes())
        .nest("/garages", garage_routes())
        .nest("/dashboard", dashboard_routes())
        .fallback(not_found)
}

async fn not_found(session: Session) -> Response {
    let user = session
        .get::<CurrentUser>(crate::models::session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();
    (
        axum::http::StatusCode::NOT_FOUND,
        NotFoundTemplate {
            layout: Layout::load(&session, user).await,
        },
    )
        .into_response()
}
