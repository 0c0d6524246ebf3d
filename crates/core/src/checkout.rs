//! Checkout form validation and order quoting.
//!
//! Validation is recomputed in full on every submit attempt and yields one
//! error per empty required field. Editing a field clears that field's error
//! only; the rest stay until the next submit.
//!
//! An order may only be placed when the terms are accepted, the cart is not
//! empty and the form has no errors ([`authorize_order`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::delivery;
use crate::types::{Money, ProductId};

/// Fields that must be filled before an order can be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutField {
    Email,
    FirstName,
    LastName,
    AddressLine1,
    City,
    PostalCode,
    State,
}

impl CheckoutField {
    /// Required fields in form order.
    pub const ALL: [Self; 7] = [
        Self::Email,
        Self::FirstName,
        Self::LastName,
        Self::AddressLine1,
        Self::City,
        Self::PostalCode,
        Self::State,
    ];

    /// HTML form field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::AddressLine1 => "address_line1",
            Self::City => "city",
            Self::PostalCode => "postal_code",
            Self::State => "state",
        }
    }

    /// Inverse of [`CheckoutField::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Label shown next to the input.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::AddressLine1 => "Address line 1",
            Self::City => "City",
            Self::PostalCode => "Postal code",
            Self::State => "State / Province",
        }
    }
}

/// The checkout form as submitted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub phone: String,
    /// Key into the delivery fee table.
    pub delivery_location: String,
    /// HTML checkboxes submit `on` when ticked and nothing otherwise.
    #[serde(deserialize_with = "checkbox")]
    pub terms_accepted: bool,
}

impl CheckoutForm {
    /// Current value of a required field.
    #[must_use]
    pub fn value(&self, field: CheckoutField) -> &str {
        match field {
            CheckoutField::Email => &self.email,
            CheckoutField::FirstName => &self.first_name,
            CheckoutField::LastName => &self.last_name,
            CheckoutField::AddressLine1 => &self.address_line1,
            CheckoutField::City => &self.city,
            CheckoutField::PostalCode => &self.postal_code,
            CheckoutField::State => &self.state,
        }
    }

    /// Set a text field by its form name. Returns `false` for unknown names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "email" => &mut self.email,
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            "address_line1" => &mut self.address_line1,
            "address_line2" => &mut self.address_line2,
            "city" => &mut self.city,
            "postal_code" => &mut self.postal_code,
            "state" => &mut self.state,
            "phone" => &mut self.phone,
            "delivery_location" => &mut self.delivery_location,
            _ => return false,
        };
        *slot = value;
        true
    }
}

fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Checkbox {
        Bool(bool),
        Text(String),
    }

    Ok(match Checkbox::deserialize(deserializer)? {
        Checkbox::Bool(value) => value,
        Checkbox::Text(text) => matches!(text.as_str(), "on" | "true" | "1" | "yes"),
    })
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    errors: BTreeMap<CheckoutField, String>,
}

impl FieldErrors {
    /// Message for one field, if it is in error.
    #[must_use]
    pub fn get(&self, field: CheckoutField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Drop one field's error (the user started editing it).
    pub fn clear(&mut self, field: CheckoutField) {
        self.errors.remove(&field);
    }

    /// Whether no field is in error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields in error.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Fields in error, in form order.
    pub fn fields(&self) -> impl Iterator<Item = CheckoutField> + '_ {
        self.errors.keys().copied()
    }
}

/// Validate every required field.
///
/// A field is in error when it is blank after trimming. Only presence is
/// checked; the email address is passed to the backend as typed.
#[must_use]
pub fn validate(form: &CheckoutForm) -> FieldErrors {
    let mut errors = BTreeMap::new();
    for field in CheckoutField::ALL {
        let value = form.value(field).trim();
        if value.is_empty() {
            errors.insert(field, format!("{} is required", field.label()));
        }
    }
    FieldErrors { errors }
}

/// Why an order cannot be placed yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderBlocked {
    #[error("Please accept the terms and conditions")]
    TermsNotAccepted,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Please fix the {0} highlighted field(s)")]
    InvalidFields(usize),
}

/// Gate for order placement.
///
/// # Errors
///
/// Returns the first blocking reason: terms, then cart, then validation.
pub fn authorize_order(
    form: &CheckoutForm,
    cart: &Cart,
    errors: &FieldErrors,
) -> Result<(), OrderBlocked> {
    if !form.terms_accepted {
        return Err(OrderBlocked::TermsNotAccepted);
    }
    if cart.is_empty() {
        return Err(OrderBlocked::EmptyCart);
    }
    if !errors.is_empty() {
        return Err(OrderBlocked::InvalidFields(errors.len()));
    }
    Ok(())
}

/// Price breakdown shown on the checkout page and sent with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub location_name: &'static str,
    pub location_description: &'static str,
}

impl OrderQuote {
    /// Quote `cart` for delivery to `location_key`.
    #[must_use]
    pub fn new(cart: &Cart, location_key: &str) -> Self {
        Self::for_subtotal(cart.total_price(), location_key)
    }

    /// Quote a bare subtotal for delivery to `location_key`.
    #[must_use]
    pub fn for_subtotal(subtotal: Money, location_key: &str) -> Self {
        let delivery_fee = delivery::delivery_fee(location_key);
        Self {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            location_name: delivery::location_name(location_key),
            location_description: delivery::location_description(location_key),
        }
    }
}

/// A line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

/// Shipping details of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub phone: Option<String>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub delivery_location: String,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl OrderRequest {
    /// Assemble the request from a validated form and the cart.
    #[must_use]
    pub fn new(form: &CheckoutForm, cart: &Cart) -> Self {
        let quote = OrderQuote::new(cart, &form.delivery_location);
        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_owned())
        };

        Self {
            items: cart
                .items()
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    price: item.price.unwrap_or(Money::ZERO),
                    quantity: item.quantity,
                })
                .collect(),
            shipping: ShippingDetails {
                email: form.email.trim().to_owned(),
                first_name: form.first_name.trim().to_owned(),
                last_name: form.last_name.trim().to_owned(),
                address_line1: form.address_line1.trim().to_owned(),
                address_line2: optional(&form.address_line2),
                city: form.city.trim().to_owned(),
                postal_code: form.postal_code.trim().to_owned(),
                state: form.state.trim().to_owned(),
                phone: optional(&form.phone),
            },
            delivery_location: form.delivery_location.trim().to_lowercase(),
            subtotal: quote.subtotal,
            delivery_fee: quote.delivery_fee,
            total: quote.total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{Product, Specifications};

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            email: "nimal@example.lk".into(),
            first_name: "Nimal".into(),
            last_name: "Perera".into(),
            address_line1: "12 Galle Road".into(),
            city: "Colombo".into(),
            postal_code: "00300".into(),
            state: "Western".into(),
            delivery_location: "colombo".into(),
            terms_accepted: true,
            ..CheckoutForm::default()
        }
    }

    fn cart_with_one_item() -> Cart {
        let mut cart = Cart::new();
        cart.add(
            &Product {
                id: ProductId::new("p1"),
                name: "Air Filter".into(),
                price: Some(Money::from_units(2400)),
                quantity: 3,
                product_grade: "OEM".into(),
                fitment: "Direct Fit".into(),
                availability: "In Stock".into(),
                specifications: Specifications::default(),
                image_url: None,
            },
            2,
        );
        cart
    }

    #[test]
    fn test_empty_form_has_seven_errors() {
        let errors = validate(&CheckoutForm::default());
        assert_eq!(errors.len(), 7);
        assert_eq!(errors.fields().collect::<Vec<_>>(), CheckoutField::ALL);
        assert_eq!(errors.get(CheckoutField::City), Some("City is required"));

        let blocked = authorize_order(
            &CheckoutForm {
                terms_accepted: true,
                ..CheckoutForm::default()
            },
            &cart_with_one_item(),
            &errors,
        );
        assert_eq!(blocked, Err(OrderBlocked::InvalidFields(7)));
    }

    #[test]
    fn test_filled_form_has_no_errors() {
        let form = filled_form();
        let errors = validate(&form);
        assert!(errors.is_empty());
        assert_eq!(authorize_order(&form, &cart_with_one_item(), &errors), Ok(()));
    }

    #[test]
    fn test_whitespace_only_is_missing() {
        let mut form = filled_form();
        form.city = "   ".into();
        let errors = validate(&form);
        assert_eq!(errors.fields().collect::<Vec<_>>(), [CheckoutField::City]);
    }

    #[test]
    fn test_any_filled_email_is_accepted() {
        let mut form = filled_form();
        form.email = "nimal".into();
        let errors = validate(&form);
        assert!(errors.is_empty());
        assert_eq!(authorize_order(&form, &cart_with_one_item(), &errors), Ok(()));
    }

    #[test]
    fn test_clear_only_touches_one_field() {
        let mut errors = validate(&CheckoutForm::default());
        errors.clear(CheckoutField::Email);
        assert_eq!(errors.len(), 6);
        assert!(errors.get(CheckoutField::Email).is_none());
        assert!(errors.get(CheckoutField::State).is_some());
    }

    #[test]
    fn test_authorize_requires_terms_and_items() {
        let mut form = filled_form();
        let errors = validate(&form);

        form.terms_accepted = false;
        assert_eq!(
            authorize_order(&form, &cart_with_one_item(), &errors),
            Err(OrderBlocked::TermsNotAccepted)
        );

        form.terms_accepted = true;
        assert_eq!(
            authorize_order(&form, &Cart::new(), &errors),
            Err(OrderBlocked::EmptyCart)
        );
    }

    #[test]
    fn test_set_by_form_name() {
        let mut form = CheckoutForm::default();
        assert!(form.set("postal_code", "20000".into()));
        assert!(form.set("address_line2", "Apt 4".into()));
        assert!(!form.set("favourite_colour", "red".into()));
        assert_eq!(form.value(CheckoutField::PostalCode), "20000");
        assert_eq!(CheckoutField::from_name("postal_code"), Some(CheckoutField::PostalCode));
        assert_eq!(CheckoutField::from_name("address_line2"), None);
    }

    #[test]
    fn test_quote_adds_delivery_fee() {
        let cart = cart_with_one_item();

        let colombo = OrderQuote::new(&cart, "colombo");
        assert_eq!(colombo.subtotal, Money::from_units(4800));
        assert_eq!(colombo.total, Money::from_units(4800));

        let elsewhere = OrderQuote::new(&cart, "nowhere");
        assert_eq!(elsewhere.delivery_fee, Money::from_units(500));
        assert_eq!(elsewhere.total, Money::from_units(5300));
        assert_eq!(elsewhere.location_name, "Other");
    }

    #[test]
    fn test_quote_for_bare_subtotal() {
        let quote = OrderQuote::for_subtotal(Money::from_units(1000), "Kandy");
        assert_eq!(quote.delivery_fee, Money::from_units(350));
        assert_eq!(quote.total, Money::from_units(1350));
        assert_eq!(quote.location_name, "Kandy");
    }

    #[test]
    fn test_order_request_shape() {
        let mut form = filled_form();
        form.delivery_location = " Galle ".into();
        let request = OrderRequest::new(&form, &cart_with_one_item());

        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.shipping.address_line2, None);
        assert_eq!(request.delivery_location, "galle");
        assert_eq!(request.total, Money::from_units(4800 + 350));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["shipping"]["firstName"], "Nimal");
        assert_eq!(json["deliveryFee"], 350.0);
    }

    #[test]
    fn test_checkbox_deserialization() {
        let ticked: CheckoutForm = serde_json::from_str(r#"{"terms_accepted": "on"}"#).unwrap();
        assert!(ticked.terms_accepted);

        let unticked: CheckoutForm = serde_json::from_str("{}").unwrap();
        assert!(!unticked.terms_accepted);
    }
}
