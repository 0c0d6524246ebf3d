//! Garage-owner and garage-admin dashboards.
//!
//! Every mutation here is an HTMX request that returns the refreshed list
//! fragment. The list is re-read from the backend and the record returned by
//! the mutation is merged into it, so the fragment always reflects the
//! server's answer. A failed mutation leaves the page as it was and shows the
//! problem in the flash area.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garagehub_core::booking::{
    AdminStats, Garage, GarageInput, OwnerStats, ServiceInput, StatusUpdate, merge_by_id,
    remove_by_id,
};
use garagehub_core::{BookingId, BookingStatus, GarageId, Money, Role, ServiceId, Transition};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireOwner, RequireStaff};
use crate::models::{CurrentUser, session_keys};
use crate::routes::account::BookingView;
use crate::routes::garages::{GarageView, ServiceView};
use crate::routes::{Layout, flash_error};
use crate::state::AppState;

// =============================================================================
// View types
// =============================================================================

/// Entry in the owner's garage picker.
#[derive(Clone)]
pub struct GarageChoice {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// Accept/reject button on a booking row.
#[derive(Clone)]
pub struct StatusAction {
    pub status: &'static str,
    /// The booking is already in this status.
    pub disabled: bool,
}

/// Booking row with its status buttons.
#[derive(Clone)]
pub struct OwnerBookingRow {
    pub booking: BookingView,
    pub actions: Vec<StatusAction>,
}

impl OwnerBookingRow {
    fn new(booking: &garagehub_core::booking::Booking) -> Self {
        Self {
            booking: BookingView::from(booking),
            actions: BookingStatus::ALL
                .into_iter()
                .map(|status| StatusAction {
                    status: status.as_str(),
                    disabled: booking.status.transition(status) == Transition::Unchanged,
                })
                .collect(),
        }
    }
}

fn booking_rows(bookings: &[garagehub_core::booking::Booking]) -> Vec<OwnerBookingRow> {
    bookings.iter().map(OwnerBookingRow::new).collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Garage-owner dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/owner.html")]
pub struct OwnerTemplate {
    pub layout: Layout,
    pub garages: Vec<GarageChoice>,
    pub garage: Option<GarageView>,
    pub garage_id: String,
    pub stats: Option<OwnerStats>,
    pub stats_error: Option<String>,
    pub bookings: Vec<OwnerBookingRow>,
    pub bookings_error: Option<String>,
    pub services: Vec<ServiceView>,
    pub services_error: Option<String>,
    /// Admins see bookings only; services belong to the owner.
    pub manage_services: bool,
    pub error: Option<String>,
}

impl OwnerTemplate {
    /// Dashboard with no garage to manage.
    fn empty(layout: Layout, error: Option<String>) -> Self {
        Self {
            manage_services: false,
            layout,
            garages: Vec::new(),
            garage: None,
            garage_id: String::new(),
            stats: None,
            stats_error: None,
            bookings: Vec::new(),
            bookings_error: None,
            services: Vec::new(),
            services_error: None,
            error,
        }
    }
}

/// Booking list fragment on the owner dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "partials/owner_bookings.html")]
pub struct OwnerBookingsTemplate {
    pub garage_id: String,
    pub bookings: Vec<OwnerBookingRow>,
    pub bookings_error: Option<String>,
}

/// Service list fragment on the owner dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "partials/owner_services.html")]
pub struct OwnerServicesTemplate {
    pub garage_id: String,
    pub services: Vec<ServiceView>,
    pub services_error: Option<String>,
}

/// Garage-admin dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/admin.html")]
pub struct AdminTemplate {
    pub layout: Layout,
    pub stats: Option<AdminStats>,
    pub stats_error: Option<String>,
    pub garages: Vec<GarageView>,
    pub garages_error: Option<String>,
}

/// Garage roster fragment on the admin dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "partials/admin_garages.html")]
pub struct AdminGaragesTemplate {
    pub garages: Vec<GarageView>,
    pub garages_error: Option<String>,
}

// =============================================================================
// Owner dashboard
// =============================================================================

/// Garages an owner may manage.
///
/// Garages that name the owner come first; when none do, the owner may pick
/// from the whole roster. Admins always get the whole roster.
fn owned_garages(garages: Vec<Garage>, user: &CurrentUser) -> Vec<Garage> {
    if user.role == Role::GarageAdmin {
        return garages;
    }
    let owned: Vec<Garage> = garages
        .iter()
        .filter(|garage| {
            garage
                .owner_email
                .as_ref()
                .is_some_and(|email| email.matches(user.email.as_str()))
        })
        .cloned()
        .collect();
    if owned.is_empty() { garages } else { owned }
}

/// The managed garage: the session's pick when it is still available,
/// otherwise the first one.
fn pick_garage<'a>(garages: &'a [Garage], selected: Option<&GarageId>) -> Option<&'a Garage> {
    selected
        .and_then(|id| garages.iter().find(|garage| &garage.id == id))
        .or_else(|| garages.first())
}

/// Owner dashboard: stats, bookings and services of the selected garage.
///
/// Admins may open it too, to handle bookings of any garage.
#[instrument(skip_all)]
pub async fn owner(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(user): RequireStaff,
) -> Result<OwnerTemplate, AppError> {
    let selected: Option<GarageId> = session.get(session_keys::SELECTED_GARAGE).await?;

    let garages = match state.backend().garages().await {
        Ok(garages) => owned_garages(garages, &user),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load garages");
            let layout = Layout::load(&session, Some(user)).await;
            return Ok(OwnerTemplate::empty(layout, Some(e.user_message())));
        }
    };

    let Some(garage) = pick_garage(&garages, selected.as_ref()).cloned() else {
        let layout = Layout::load(&session, Some(user)).await;
        return Ok(OwnerTemplate::empty(layout, None));
    };

    let (stats, bookings, services) = tokio::join!(
        state.backend().owner_stats(&garage.id),
        state.backend().garage_bookings(&user.token, &garage.id),
        state.backend().garage_services(&garage.id)
    );

    let (stats, stats_error) = match stats {
        Ok(stats) => (Some(stats), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load owner stats");
            (None, Some(e.user_message()))
        }
    };
    let (bookings, bookings_error) = match bookings {
        Ok(bookings) => (booking_rows(&bookings), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load garage bookings");
            (Vec::new(), Some(e.user_message()))
        }
    };
    let (services, services_error) = match services {
        Ok(services) => (services.iter().map(ServiceView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load services");
            (Vec::new(), Some(e.user_message()))
        }
    };

    let manage_services = user.role == Role::GarageOwner;
    Ok(OwnerTemplate {
        layout: Layout::load(&session, Some(user)).await,
        garages: garages
            .iter()
            .map(|g| GarageChoice {
                id: g.id.to_string(),
                name: g.name.clone(),
                selected: g.id == garage.id,
            })
            .collect(),
        garage_id: garage.id.to_string(),
        garage: Some(GarageView::from(&garage)),
        stats,
        stats_error,
        bookings,
        bookings_error,
        services,
        services_error,
        manage_services,
        error: None,
    })
}

/// Status button submission.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    /// Garage whose booking list the row belongs to.
    pub garage_id: String,
}

/// Move a booking to a new status (HTMX).
///
/// The booking's status is read from the backend before anything is sent,
/// so a row rendered before someone else's change cannot turn a real change
/// into a no-op. Asking for the status the booking already has sends
/// nothing and answers `204`, which HTMX treats as "leave the page alone".
#[instrument(skip(state, user, form), fields(booking_id = %id))]
pub async fn update_booking_status(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let target: BookingStatus = form.status.parse().map_err(AppError::BadRequest)?;
    let garage_id = form.garage_id.trim();
    if garage_id.is_empty() {
        return Err(AppError::BadRequest("No garage selected".to_string()));
    }
    let garage_id = GarageId::new(garage_id);
    let id = BookingId::new(id);

    let bookings = match state.backend().garage_bookings(&user.token, &garage_id).await {
        Ok(bookings) => bookings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load garage bookings");
            return Ok(flash_error(e.user_message()));
        }
    };
    let Some(current) = bookings.iter().find(|b| b.id == id).map(|b| b.status) else {
        return Ok(flash_error("This booking no longer exists. Refresh the page."));
    };

    let Transition::Changed { from, to } = current.transition(target) else {
        tracing::debug!(status = %target, "Booking already in requested status");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let updated = match state
        .backend()
        .update_booking_status(&user.token, &id, StatusUpdate { status: to })
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update booking status");
            return Ok(flash_error(e.user_message()));
        }
    };
    tracing::info!(%from, %to, role = %user.role, "Booking status changed");
    add_breadcrumb("booking", "Changed booking status", Some(&[("status", to.as_str())]));

    match state
        .backend()
        .garage_bookings(&user.token, &updated.garage_id)
        .await
    {
        Ok(mut bookings) => {
            let garage_id = updated.garage_id.to_string();
            merge_by_id(&mut bookings, updated);
            Ok(OwnerBookingsTemplate {
                garage_id,
                bookings: booking_rows(&bookings),
                bookings_error: None,
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload garage bookings");
            Ok(flash_error(
                "Status updated, but the booking list could not be reloaded",
            ))
        }
    }
}

/// Service add/edit form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceForm {
    pub garage_id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub duration_minutes: String,
}

impl ServiceForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a message for the first invalid field.
    pub fn to_input(&self) -> Result<ServiceInput, String> {
        let garage_id = self.garage_id.trim();
        if garage_id.is_empty() {
            return Err("Select a garage first".to_string());
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Service name is required".to_string());
        }

        let price = match self.price.trim() {
            "" => None,
            raw => {
                let amount = raw
                    .parse::<Decimal>()
                    .ok()
                    .filter(|amount| !amount.is_sign_negative())
                    .ok_or_else(|| format!("Invalid price: {raw}"))?;
                Some(Money::new(amount))
            }
        };
        let duration_minutes = match self.duration_minutes.trim() {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .map_err(|_| format!("Invalid duration: {raw}"))?,
            ),
        };

        Ok(ServiceInput {
            garage_id: GarageId::new(garage_id),
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            duration_minutes,
        })
    }
}

/// Re-read the service list and apply `apply` to it.
async fn services_fragment(
    state: &AppState,
    garage_id: &GarageId,
    apply: impl FnOnce(&mut Vec<garagehub_core::booking::GarageService>),
) -> Response {
    match state.backend().garage_services(garage_id).await {
        Ok(mut services) => {
            apply(&mut services);
            OwnerServicesTemplate {
                garage_id: garage_id.to_string(),
                services: services.iter().map(ServiceView::from).collect(),
                services_error: None,
            }
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload services");
            flash_error("Saved, but the service list could not be reloaded")
        }
    }
}

/// Add a service to the managed garage (HTMX).
#[instrument(skip_all)]
pub async fn create_service(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Form(form): Form<ServiceForm>,
) -> Response {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => return flash_error(message),
    };

    match state.backend().create_service(&user.token, &input).await {
        Ok(service) => {
            add_breadcrumb("service", "Created service", Some(&[("service_id", service.id.as_str())]));
            services_fragment(&state, &input.garage_id, |services| {
                merge_by_id(services, service);
            })
            .await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create service");
            flash_error(e.user_message())
        }
    }
}

/// Edit a service (HTMX).
#[instrument(skip(state, user, form), fields(service_id = %id))]
pub async fn update_service(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Path(id): Path<String>,
    Form(form): Form<ServiceForm>,
) -> Response {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => return flash_error(message),
    };

    let id = ServiceId::new(id);
    match state.backend().update_service(&user.token, &id, &input).await {
        Ok(service) => {
            services_fragment(&state, &input.garage_id, |services| {
                merge_by_id(services, service);
            })
            .await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update service");
            flash_error(e.user_message())
        }
    }
}

/// Which garage a deleted service belonged to.
#[derive(Debug, Deserialize)]
pub struct GarageQuery {
    pub garage_id: String,
}

/// Delete a service (HTMX).
#[instrument(skip(state, user, query), fields(service_id = %id))]
pub async fn delete_service(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Path(id): Path<String>,
    axum::extract::Query(query): axum::extract::Query<GarageQuery>,
) -> Response {
    let id = ServiceId::new(id);
    match state.backend().delete_service(&user.token, &id).await {
        Ok(()) => {
            services_fragment(&state, &GarageId::new(query.garage_id), |services| {
                remove_by_id(services, &id);
            })
            .await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete service");
            flash_error(e.user_message())
        }
    }
}

// =============================================================================
// Admin dashboard
// =============================================================================

/// Admin dashboard: platform stats and the garage roster.
#[instrument(skip_all)]
pub async fn admin(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> AdminTemplate {
    let (stats, garages) = tokio::join!(
        state.backend().admin_stats(&user.token),
        state.backend().garages()
    );

    let (stats, stats_error) = match stats {
        Ok(stats) => (Some(stats), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load admin stats");
            (None, Some(e.user_message()))
        }
    };
    let (garages, garages_error) = match garages {
        Ok(garages) => (garages.iter().map(GarageView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load garages");
            (Vec::new(), Some(e.user_message()))
        }
    };

    AdminTemplate {
        layout: Layout::load(&session, Some(user)).await,
        stats,
        stats_error,
        garages,
        garages_error,
    }
}

fn check_garage_input(input: &GarageInput) -> Result<(), Response> {
    let missing = input.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(flash_error(format!("Please fill in: {}", missing.join(", "))))
    }
}

async fn garages_fragment(state: &AppState, apply: impl FnOnce(&mut Vec<Garage>)) -> Response {
    match state.backend().garages().await {
        Ok(mut garages) => {
            apply(&mut garages);
            AdminGaragesTemplate {
                garages: garages.iter().map(GarageView::from).collect(),
                garages_error: None,
            }
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload garages");
            flash_error("Saved, but the garage list could not be reloaded")
        }
    }
}

/// Add a garage (HTMX).
#[instrument(skip_all)]
pub async fn create_garage(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Form(input): Form<GarageInput>,
) -> Response {
    if let Err(response) = check_garage_input(&input) {
        return response;
    }

    match state.backend().create_garage(&user.token, &input).await {
        Ok(garage) => {
            add_breadcrumb("garage", "Created garage", Some(&[("garage_id", garage.id.as_str())]));
            garages_fragment(&state, |garages| merge_by_id(garages, garage)).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create garage");
            flash_error(e.user_message())
        }
    }
}

/// Edit a garage (HTMX).
#[instrument(skip(state, user, input), fields(garage_id = %id))]
pub async fn update_garage(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<String>,
    Form(input): Form<GarageInput>,
) -> Response {
    if let Err(response) = check_garage_input(&input) {
        return response;
    }

    let id = GarageId::new(id);
    match state.backend().update_garage(&user.token, &id, &input).await {
        Ok(garage) => garages_fragment(&state, |garages| merge_by_id(garages, garage)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update garage");
            flash_error(e.user_message())
        }
    }
}

/// Delete a garage (HTMX).
#[instrument(skip(state, user), fields(garage_id = %id))]
pub async fn delete_garage(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<String>,
) -> Response {
    let id = GarageId::new(id);
    match state.backend().delete_garage(&user.token, &id).await {
        Ok(()) => garages_fragment(&state, |garages| remove_by_id(garages, &id)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete garage");
            flash_error(e.user_message())
        }
    }
}
