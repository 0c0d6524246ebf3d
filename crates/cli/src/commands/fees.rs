//! Delivery fee lookups.
//!
//! Prints the delivery fee table, or a quote for one region.

use garagehub_core::Money;
use garagehub_core::checkout::OrderQuote;
use garagehub_core::delivery::{DEFAULT_DELIVERY_FEE, DEFAULT_LOCATION_NAME, DELIVERY_LOCATIONS};
use rust_decimal::Decimal;

/// Render the fee table, one region per line.
#[must_use]
pub fn table() -> String {
    let mut out = String::new();
    for location in DELIVERY_LOCATIONS {
        out.push_str(&format!(
            "{:<12} {:>14}  {}\n",
            location.name,
            location.fee_amount().to_string(),
            location.description
        ));
    }
    out.push_str(&format!(
        "{:<12} {:>14}  (any other region)\n",
        DEFAULT_LOCATION_NAME,
        Money::from_units(DEFAULT_DELIVERY_FEE).to_string()
    ));
    out
}

/// Render a quote for `subtotal` delivered to `region`.
#[must_use]
pub fn quote(region: &str, subtotal: Decimal) -> String {
    let quote = OrderQuote::for_subtotal(Money::new(subtotal), region);
    format!(
        "Region:   {} ({})\nSubtotal: {}\nDelivery: {}\nTotal:    {}\n",
        quote.location_name,
        quote.location_description,
        quote.subtotal,
        quote.delivery_fee,
        quote.total
    )
}
