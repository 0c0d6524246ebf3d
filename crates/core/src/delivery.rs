//! Delivery fee table.
//!
//! Delivery is charged as a flat fee per region. The table is static
//! configuration; lookups are pure. An unknown region is not an error: it is
//! charged [`DEFAULT_DELIVERY_FEE`].

use serde::Serialize;

use crate::types::Money;

/// Fee (in rupees) for regions missing from the table.
pub const DEFAULT_DELIVERY_FEE: i64 = 500;

/// Display name used for regions missing from the table.
pub const DEFAULT_LOCATION_NAME: &str = "Other";

/// Description used for regions missing from the table.
pub const DEFAULT_LOCATION_DESCRIPTION: &str = "Island-wide courier delivery, 3-5 working days";

/// One row of the fee table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryLocation {
    /// Lookup key, lowercase.
    pub key: &'static str,
    pub name: &'static str,
    /// Flat fee in whole rupees.
    pub fee: i64,
    pub description: &'static str,
}

impl DeliveryLocation {
    /// The fee as money.
    #[must_use]
    pub fn fee_amount(&self) -> Money {
        Money::from_units(self.fee)
    }
}

/// Regions with a negotiated flat fee, in checkout dropdown order.
pub const DELIVERY_LOCATIONS: &[DeliveryLocation] = &[
    DeliveryLocation {
        key: "colombo",
        name: "Colombo",
        fee: 0,
        description: "Free same-day delivery within Colombo city limits",
    },
    DeliveryLocation {
        key: "gampaha",
        name: "Gampaha",
        fee: 250,
        description: "Next-day delivery",
    },
    DeliveryLocation {
        key: "kalutara",
        name: "Kalutara",
        fee: 300,
        description: "Next-day delivery",
    },
    DeliveryLocation {
        key: "kandy",
        name: "Kandy",
        fee: 350,
        description: "Delivery within 2 working days",
    },
    DeliveryLocation {
        key: "galle",
        name: "Galle",
        fee: 350,
        description: "Delivery within 2 working days",
    },
    DeliveryLocation {
        key: "matara",
        name: "Matara",
        fee: 400,
        description: "Delivery within 2 working days",
    },
    DeliveryLocation {
        key: "kurunegala",
        name: "Kurunegala",
        fee: 400,
        description: "Delivery within 2 working days",
    },
    DeliveryLocation {
        key: "jaffna",
        name: "Jaffna",
        fee: 650,
        description: "Delivery within 3-4 working days",
    },
];

/// Find a table row by key (case-insensitive, surrounding whitespace ignored).
#[must_use]
pub fn find_location(key: &str) -> Option<&'static DeliveryLocation> {
    let key = key.trim();
    DELIVERY_LOCATIONS
        .iter()
        .find(|location| location.key.eq_ignore_ascii_case(key))
}

/// Fee for a region; unknown regions pay [`DEFAULT_DELIVERY_FEE`].
#[must_use]
pub fn delivery_fee(key: &str) -> Money {
    Money::from_units(find_location(key).map_or(DEFAULT_DELIVERY_FEE, |location| location.fee))
}

/// Display name of a region.
#[must_use]
pub fn location_name(key: &str) -> &'static str {
    find_location(key).map_or(DEFAULT_LOCATION_NAME, |location| location.name)
}

/// Delivery promise for a region.
#[must_use]
pub fn location_description(key: &str) -> &'static str {
    find_location(key).map_or(DEFAULT_LOCATION_DESCRIPTION, |location| {
        location.description
    })
}
