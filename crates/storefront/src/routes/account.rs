//! Customer account route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use garagehub_core::booking::Booking;
use garagehub_core::review::{self, Review};
use garagehub_core::{BookingId, BookingStatus};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAuth, RequireCustomer};
use crate::routes::auth::landing_page;
use crate::routes::{Layout, flash_error};
use crate::state::AppState;

/// Booking row for templates.
#[derive(Clone)]
pub struct BookingView {
    pub id: String,
    pub garage_name: String,
    pub service_name: String,
    pub customer_name: String,
    pub customer_email: String,
    pub vehicle: String,
    pub date: String,
    pub time_slot: String,
    pub notes: String,
    pub status: &'static str,
    pub is_pending: bool,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            garage_name: booking
                .garage_name
                .clone()
                .unwrap_or_else(|| booking.garage_id.to_string()),
            service_name: booking.service_name.clone(),
            customer_name: booking.customer_name.clone(),
            customer_email: booking.customer_email.to_string(),
            vehicle: booking.vehicle.clone(),
            date: booking.date.to_string(),
            time_slot: booking.time_slot.clone(),
            notes: booking.notes.clone(),
            status: booking.status.as_str(),
            is_pending: booking.status == BookingStatus::Pending,
        }
    }
}

/// Review card for templates.
#[derive(Clone)]
pub struct ReviewView {
    pub id: String,
    pub name: String,
    pub rating: &'static str,
    pub stars: u8,
    pub feedback: String,
    pub recommend: u8,
    pub mine: bool,
}

impl ReviewView {
    #[must_use]
    pub fn new(review: &Review, mine: bool) -> Self {
        Self {
            id: review.id.to_string(),
            name: review.name.clone(),
            rating: review.rating.as_str(),
            stars: review.rating.stars(),
            feedback: review.feedback.clone(),
            recommend: review.recommend,
            mine,
        }
    }
}

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub bookings: Vec<BookingView>,
    pub reviews: Vec<ReviewView>,
    pub bookings_error: Option<String>,
    pub reviews_error: Option<String>,
}

/// Account overview: the customer's bookings and reviews.
///
/// Garage owners and admins have their own dashboards.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    if !user.is_customer() {
        return Redirect::to(landing_page(user.role)).into_response();
    }

    let (bookings, reviews) = tokio::join!(
        state.backend().my_bookings(&user.token),
        state.backend().reviews()
    );

    let (bookings, bookings_error) = match bookings {
        Ok(bookings) => (bookings.iter().map(BookingView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load bookings");
            (Vec::new(), Some(e.user_message()))
        }
    };
    let (reviews, reviews_error) = match reviews {
        Ok(reviews) => (
            review::owned_by(&reviews, &user.email)
                .into_iter()
                .map(|r| ReviewView::new(r, true))
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load reviews");
            (Vec::new(), Some(e.user_message()))
        }
    };

    AccountTemplate {
        layout: Layout::load(&session, Some(user)).await,
        bookings,
        reviews,
        bookings_error,
        reviews_error,
    }
    .into_response()
}

/// Cancel one of the customer's bookings (HTMX).
///
/// Returns an empty body so the row is swapped out.
#[instrument(skip(state, user), fields(booking_id = %id))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<String>,
) -> Response {
    let id = BookingId::new(id);
    match state.backend().delete_booking(&user.token, &id).await {
        Ok(()) => {
            add_breadcrumb("booking", "Cancelled booking", Some(&[("booking_id", id.as_str())]));
            ().into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cancel booking");
            flash_error(e.user_message())
        }
    }
}
