//! Garage roster, garage detail and service booking.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use garagehub_core::booking::{BookingError, BookingRequest, Garage, GarageService};
use garagehub_core::{GarageId, ServiceId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireCustomer, RequireStaff};
use crate::models::session_keys;
use crate::routes::Layout;
use crate::routes::account::{BookingView, ReviewView};
use crate::state::AppState;

/// Slots offered on the booking form.
pub const TIME_SLOTS: &[&str] = &[
    "08:00", "09:00", "10:00", "11:00", "13:00", "14:00", "15:00", "16:00",
];

/// Garage card for templates.
#[derive(Clone)]
pub struct GarageView {
    pub id: String,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub description: String,
    pub owner_email: String,
    pub image_url: Option<String>,
}

impl From<&Garage> for GarageView {
    fn from(garage: &Garage) -> Self {
        Self {
            id: garage.id.to_string(),
            name: garage.name.clone(),
            location: garage.location.clone(),
            phone: garage.phone.clone(),
            description: garage.description.clone(),
            owner_email: garage
                .owner_email
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            image_url: garage.image_url.clone(),
        }
    }
}

/// Service row for templates.
#[derive(Clone)]
pub struct ServiceView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Option<String>,
    /// Raw amount for edit forms.
    pub price_input: String,
    pub duration_minutes: Option<u32>,
}

impl From<&GarageService> for ServiceView {
    fn from(service: &GarageService) -> Self {
        Self {
            id: service.id.to_string(),
            name: service.name.clone(),
            description: service.description.clone(),
            price: service.price.map(|price| price.to_string()),
            price_input: service
                .price
                .map(|price| price.amount().normalize().to_string())
                .unwrap_or_default(),
            duration_minutes: service.duration_minutes,
        }
    }
}

/// Garage roster template.
#[derive(Template, WebTemplate)]
#[template(path = "garages/index.html")]
pub struct GaragesTemplate {
    pub layout: Layout,
    pub garages: Vec<GarageView>,
    pub error: Option<String>,
}

/// Garage detail template.
#[derive(Template, WebTemplate)]
#[template(path = "garages/show.html")]
pub struct GarageTemplate {
    pub layout: Layout,
    pub garage: GarageView,
    pub services: Vec<ServiceView>,
    pub reviews: Vec<ReviewView>,
    pub time_slots: Vec<&'static str>,
    pub min_date: String,
    pub services_error: Option<String>,
}

/// Outcome of a booking attempt (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/booking_result.html")]
pub struct BookingResultTemplate {
    pub booking: Option<BookingView>,
    pub error: Option<String>,
}

/// List every garage.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> GaragesTemplate {
    let (garages, error) = match state.backend().garages().await {
        Ok(garages) => (garages.iter().map(GarageView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load garages");
            (Vec::new(), Some(e.user_message()))
        }
    };

    GaragesTemplate {
        layout: Layout::load(&session, user).await,
        garages,
        error,
    }
}

/// Garage detail with its services, reviews and the booking form.
#[instrument(skip(state, session, user), fields(garage_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<GarageTemplate, AppError> {
    let id = GarageId::new(id);
    let (garage, services, reviews) = tokio::join!(
        state.backend().garage(&id),
        state.backend().garage_services(&id),
        state.backend().reviews()
    );
    let garage = garage?;

    let (services, services_error) = match services {
        Ok(services) => (services.iter().map(ServiceView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load services");
            (Vec::new(), Some(e.user_message()))
        }
    };

    let customer = user.as_ref().filter(|u| u.is_customer());
    let reviews = reviews
        .unwrap_or_default()
        .iter()
        .filter(|review| review.garage_id.as_ref() == Some(&garage.id))
        .map(|review| {
            ReviewView::new(
                review,
                customer.is_some_and(|u| review.is_owned_by(&u.email)),
            )
        })
        .collect();

    Ok(GarageTemplate {
        layout: Layout::load(&session, user).await,
        garage: GarageView::from(&garage),
        services,
        reviews,
        time_slots: TIME_SLOTS.to_vec(),
        min_date: Utc::now().date_naive().to_string(),
        services_error,
    })
}

/// Booking form submission.
#[derive(Debug, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub vehicle: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time_slot: String,
    #[serde(default)]
    pub notes: String,
}

impl BookingForm {
    /// Turn the form into a request on behalf of the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn to_request(
        &self,
        garage_id: GarageId,
        name: &str,
        email: &garagehub_core::Email,
        today: NaiveDate,
    ) -> Result<BookingRequest, BookingError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| BookingError::MissingDate)?;
        let service_id = self.service_id.trim();

        let request = BookingRequest {
            garage_id,
            service_id: (!service_id.is_empty()).then(|| ServiceId::new(service_id)),
            customer_name: name.to_owned(),
            customer_email: email.clone(),
            vehicle: self.vehicle.trim().to_owned(),
            date,
            time_slot: self.time_slot.trim().to_owned(),
            notes: self.notes.trim().to_owned(),
        };
        request.validate(today)?;
        Ok(request)
    }
}

/// Book a service (HTMX). Renders the confirmation or the problem in place.
#[instrument(skip(state, user, form), fields(garage_id = %id))]
pub async fn book(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<String>,
    Form(form): Form<BookingForm>,
) -> BookingResultTemplate {
    let request = match form.to_request(
        GarageId::new(id),
        &user.name,
        &user.email,
        Utc::now().date_naive(),
    ) {
        Ok(request) => request,
        Err(e) => {
            return BookingResultTemplate {
                booking: None,
                error: Some(e.to_string()),
            };
        }
    };

    match state.backend().create_booking(&user.token, &request).await {
        Ok(booking) => {
            add_breadcrumb(
                "booking",
                "Created booking",
                Some(&[("booking_id", booking.id.as_str())]),
            );
            BookingResultTemplate {
                booking: Some(BookingView::from(&booking)),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create booking");
            BookingResultTemplate {
                booking: None,
                error: Some(e.user_message()),
            }
        }
    }
}

/// Garage picker submission.
#[derive(Debug, Deserialize)]
pub struct SelectGarageForm {
    pub garage_id: String,
}

/// Remember which garage an owner or admin is managing.
#[instrument(skip_all)]
pub async fn select(
    session: Session,
    RequireStaff(_user): RequireStaff,
    Form(form): Form<SelectGarageForm>,
) -> Result<Response, AppError> {
    let garage_id = form.garage_id.trim();
    if garage_id.is_empty() {
        return Err(AppError::BadRequest("No garage selected".to_string()));
    }
    session
        .insert(session_keys::SELECTED_GARAGE, GarageId::new(garage_id))
        .await?;
    Ok(Redirect::to("/dashboard/owner").into_response())
}
