//! Checkout route handlers.
//!
//! The form and its field errors are kept in the session while the customer
//! works through it. Errors are recomputed in full on submit and cleared one
//! field at a time as the customer edits.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garagehub_core::cart::{Cart, CartStore};
use garagehub_core::checkout::{
    self, CheckoutField, CheckoutForm, FieldErrors, OrderQuote, OrderRequest, authorize_order,
};
use garagehub_core::delivery::{DELIVERY_LOCATIONS, DeliveryLocation};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{SessionCartStore, session_keys};
use crate::routes::Layout;
use crate::routes::cart::CartView;
use crate::state::AppState;

/// One input of the checkout form.
#[derive(Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub error: Option<String>,
    pub input_type: &'static str,
    pub required: bool,
}

/// Price breakdown for templates.
#[derive(Clone)]
pub struct QuoteView {
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
    pub location_name: &'static str,
    pub location_description: &'static str,
    pub free_delivery: bool,
}

impl From<&OrderQuote> for QuoteView {
    fn from(quote: &OrderQuote) -> Self {
        Self {
            subtotal: quote.subtotal.to_string(),
            delivery_fee: quote.delivery_fee.to_string(),
            total: quote.total.to_string(),
            location_name: quote.location_name,
            location_description: quote.location_description,
            free_delivery: quote.delivery_fee.is_zero(),
        }
    }
}

/// Delivery region option.
#[derive(Clone)]
pub struct LocationOption {
    pub key: &'static str,
    pub label: String,
    pub selected: bool,
}

fn location_options(selected: &str) -> Vec<LocationOption> {
    DELIVERY_LOCATIONS
        .iter()
        .map(|location: &DeliveryLocation| LocationOption {
            key: location.key,
            label: format!("{} ({})", location.name, location.fee_amount()),
            selected: location.key.eq_ignore_ascii_case(selected.trim()),
        })
        .collect()
}

fn field_views(form: &CheckoutForm, errors: &FieldErrors) -> Vec<FieldView> {
    let required = |field: CheckoutField, input_type: &'static str| FieldView {
        name: field.name(),
        label: field.label(),
        value: form.value(field).to_owned(),
        error: errors.get(field).map(str::to_owned),
        input_type,
        required: true,
    };
    let optional = |name: &'static str, label: &'static str, value: &str, input_type| FieldView {
        name,
        label,
        value: value.to_owned(),
        error: None,
        input_type,
        required: false,
    };

    vec![
        required(CheckoutField::Email, "email"),
        required(CheckoutField::FirstName, "text"),
        required(CheckoutField::LastName, "text"),
        required(CheckoutField::AddressLine1, "text"),
        optional("address_line2", "Address line 2", &form.address_line2, "text"),
        required(CheckoutField::City, "text"),
        required(CheckoutField::PostalCode, "text"),
        required(CheckoutField::State, "text"),
        optional("phone", "Phone", &form.phone, "tel"),
    ]
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub fields: Vec<FieldView>,
    pub locations: Vec<LocationOption>,
    pub quote: QuoteView,
    pub terms_accepted: bool,
    pub error: Option<String>,
}

/// Totals fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_quote.html")]
pub struct QuoteTemplate {
    pub quote: QuoteView,
}

/// Field error fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/field_error.html")]
pub struct FieldErrorTemplate {
    pub error: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub order_id: String,
    pub email: String,
    pub quote: QuoteView,
}

async fn stored_form(session: &Session) -> Option<CheckoutForm> {
    session
        .get::<CheckoutForm>(session_keys::CHECKOUT_FORM)
        .await
        .ok()
        .flatten()
}

async fn stored_errors(session: &Session) -> FieldErrors {
    session
        .get::<FieldErrors>(session_keys::CHECKOUT_ERRORS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn save_progress(
    session: &Session,
    form: &CheckoutForm,
    errors: &FieldErrors,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CHECKOUT_FORM, form).await?;
    session.insert(session_keys::CHECKOUT_ERRORS, errors).await
}

async fn render_page(
    session: &Session,
    layout: Layout,
    form: &CheckoutForm,
    errors: &FieldErrors,
    error: Option<String>,
) -> CheckoutTemplate {
    let cart = super::load_cart(session).await;
    CheckoutTemplate {
        layout,
        cart: CartView::from(&cart),
        fields: field_views(form, errors),
        locations: location_options(&form.delivery_location),
        quote: QuoteView::from(&OrderQuote::new(&cart, &form.delivery_location)),
        terms_accepted: form.terms_accepted,
        error,
    }
}

/// Display the checkout form.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> CheckoutTemplate {
    let mut form = stored_form(&session).await.unwrap_or_default();
    if form.email.is_empty()
        && let Some(user) = &user
    {
        form.email = user.email.to_string();
    }
    let errors = stored_errors(&session).await;
    let layout = Layout::load(&session, user).await;
    render_page(&session, layout, &form, &errors, None).await
}

/// Save one edited field and clear its error (HTMX).
///
/// The request carries `field` (the field's name) and the field's own
/// input, so `{"field": "city", "city": "Kandy"}`.
#[instrument(skip(session, values))]
pub async fn update_field(
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let Some(name) = values.get("field") else {
        return Err(AppError::BadRequest("missing field name".to_string()));
    };
    let value = values.get(name.as_str()).cloned().unwrap_or_default();

    let mut form = stored_form(&session).await.unwrap_or_default();
    if !form.set(name, value) {
        return Err(AppError::BadRequest(format!("unknown field: {name}")));
    }

    let mut errors = stored_errors(&session).await;
    if let Some(field) = CheckoutField::from_name(name) {
        errors.clear(field);
    }
    save_progress(&session, &form, &errors).await?;

    Ok(FieldErrorTemplate { error: None }.into_response())
}

/// Delivery fee query.
#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    /// The region select posts under its form field name.
    #[serde(default, alias = "delivery_location")]
    pub location: String,
}

/// Recalculate totals for a delivery region (HTMX).
#[instrument(skip(session))]
pub async fn fee(session: Session, Query(query): Query<FeeQuery>) -> QuoteTemplate {
    let cart = super::load_cart(&session).await;
    let mut form = stored_form(&session).await.unwrap_or_default();
    form.delivery_location.clone_from(&query.location);
    if let Err(e) = session.insert(session_keys::CHECKOUT_FORM, &form).await {
        tracing::warn!(error = %e, "Failed to remember delivery location");
    }

    QuoteTemplate {
        quote: QuoteView::from(&OrderQuote::new(&cart, &query.location)),
    }
}

/// Validate the form and place the order.
#[instrument(skip(state, session, user, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let store = SessionCartStore::new(session.clone());
    let cart: Cart = store
        .load()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let errors = checkout::validate(&form);
    save_progress(&session, &form, &errors).await?;

    if let Err(blocked) = authorize_order(&form, &cart, &errors) {
        let layout = Layout::load(&session, user).await;
        let page = render_page(&session, layout, &form, &errors, Some(blocked.to_string())).await;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let order = OrderRequest::new(&form, &cart);
    let token = user.as_ref().map(|u| u.token.as_str());
    let confirmation = match state.backend().place_order(token, &order).await {
        Ok(confirmation) => confirmation,
        Err(e) => {
            tracing::warn!(error = %e, "Order placement failed");
            let layout = Layout::load(&session, user).await;
            let page = render_page(&session, layout, &form, &errors, Some(e.user_message())).await;
            return Ok((StatusCode::BAD_GATEWAY, page).into_response());
        }
    };

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", confirmation.id.as_str())]),
    );
    tracing::info!(order_id = %confirmation.id, items = order.items.len(), "Order placed");
    // Stock levels changed
    state.backend().invalidate_catalog();

    // The order exists now; a failure to tidy the session must not hide that
    if let Err(e) = store.clear().await {
        tracing::error!(error = %e, "Failed to clear cart after order");
    }
    for key in [session_keys::CHECKOUT_FORM, session_keys::CHECKOUT_ERRORS] {
        if let Err(e) = session.remove_value(key).await {
            tracing::error!(error = %e, key, "Failed to clear checkout state");
        }
    }

    let quote = OrderQuote::new(&cart, &form.delivery_location);
    Ok(ConfirmationTemplate {
        layout: Layout::load(&session, user).await,
        order_id: confirmation.id.to_string(),
        email: order.shipping.email,
        quote: QuoteView::from(&quote),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_views_mark_errors_and_required() {
        let form = CheckoutForm {
            email: "buyer@example.lk".into(),
            ..CheckoutForm::default()
        };
        let errors = checkout::validate(&form);
        let views = field_views(&form, &errors);

        assert_eq!(views.len(), 9);
        assert_eq!(views.iter().filter(|v| v.required).count(), 7);
        assert_eq!(views.iter().filter(|v| v.error.is_some()).count(), 6);

        let email = views.iter().find(|v| v.name == "email");
        assert!(email.is_some_and(|v| v.error.is_none() && v.value == "buyer@example.lk"));
    }

    #[test]
    fn test_location_options_mark_selection() {
        let options = location_options(" Kandy ");
        assert_eq!(options.len(), DELIVERY_LOCATIONS.len());
        assert_eq!(
            options.iter().filter(|o| o.selected).map(|o| o.key).collect::<Vec<_>>(),
            ["kandy"]
        );
        assert!(options[0].label.starts_with("Colombo ("));
    }
}
