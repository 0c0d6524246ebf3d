//! Status and role enums shared by the storefront and the backend.

use serde::{Deserialize, Serialize};

/// Booking lifecycle status.
///
/// Serialized as the backend spells it: `Pending`, `Accepted`, `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookingStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Outcome of asking a booking to move to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status differs; the change must be sent to the backend.
    Changed {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Already in the requested status; nothing to send.
    Unchanged,
}

impl BookingStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Accepted, Self::Rejected];

    /// Plan a move to `target`.
    ///
    /// Owners and admins may move a booking in any direction; the only
    /// special case is a move to the current status, which is a no-op.
    #[must_use]
    pub fn transition(self, target: Self) -> Transition {
        if self == target {
            Transition::Unchanged
        } else {
            Transition::Changed {
                from: self,
                to: target,
            }
        }
    }

    /// Wire and display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "pending" => Ok(Self::Pending),
            "Accepted" | "accepted" => Ok(Self::Accepted),
            "Rejected" | "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid booking status: {s}")),
        }
    }
}

/// Role of a signed-in user, as returned by the backend at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Shops for parts, books garage services, writes reviews.
    #[default]
    Customer,
    /// Runs one or more garages: bookings and services.
    GarageOwner,
    /// Curates the garage roster.
    GarageAdmin,
}

impl Role {
    /// Every role, in sign-up form order.
    pub const ALL: [Self; 3] = [Self::Customer, Self::GarageOwner, Self::GarageAdmin];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::GarageOwner => "garageOwner",
            Self::GarageAdmin => "garageAdmin",
        }
    }

    /// Human-readable role name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::GarageOwner => "Garage owner",
            Self::GarageAdmin => "Garage admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}
