//! Garages, their services, and service bookings.
//!
//! All of these are owned by the backend. The storefront holds a working
//! copy taken from the latest response and reconciles it with
//! [`merge_by_id`] whenever a mutation returns the authoritative record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BookingId, BookingStatus, Email, GarageId, Money, ServiceId};

/// A record with a stable backend identity.
pub trait Record {
    type Id: PartialEq;

    fn id(&self) -> &Self::Id;
}

/// Apply an authoritative record to a working copy.
///
/// The record replaces the entry with the same id in place; a record that is
/// not in the list yet is appended.
pub fn merge_by_id<T: Record>(records: &mut Vec<T>, record: T) {
    match records.iter_mut().find(|existing| existing.id() == record.id()) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Drop the entry with `id` from a working copy after a confirmed delete.
pub fn remove_by_id<T: Record>(records: &mut Vec<T>, id: &T::Id) {
    records.retain(|record| record.id() != id);
}

/// A garage listed in the booking portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garage {
    #[serde(alias = "_id")]
    pub id: GarageId,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_email: Option<Email>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Record for Garage {
    type Id = GarageId;

    fn id(&self) -> &GarageId {
        &self.id
    }
}

/// Fields an admin submits to create or edit a garage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GarageInput {
    pub name: String,
    pub location: String,
    pub phone: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner_email: String,
}

impl GarageInput {
    /// Names of blank required fields (name, location, phone).
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("location", &self.location),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// A service a garage offers (oil change, wheel alignment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarageService {
    #[serde(alias = "_id")]
    pub id: ServiceId,
    pub garage_id: GarageId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<Money>,
    /// Typical duration in minutes.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl Record for GarageService {
    type Id = ServiceId;

    fn id(&self) -> &ServiceId {
        &self.id
    }
}

/// Fields an owner submits to create or edit a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInput {
    pub garage_id: GarageId,
    pub name: String,
    pub description: String,
    pub price: Option<Money>,
    pub duration_minutes: Option<u32>,
}

/// A customer's booking of a garage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: BookingId,
    pub garage_id: GarageId,
    #[serde(default)]
    pub garage_name: Option<String>,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    #[serde(default)]
    pub service_name: String,
    pub customer_name: String,
    pub customer_email: Email,
    #[serde(default)]
    pub vehicle: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time_slot: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Booking {
    type Id = BookingId;

    fn id(&self) -> &BookingId {
        &self.id
    }
}

/// Body of `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub garage_id: GarageId,
    pub service_id: Option<ServiceId>,
    pub customer_name: String,
    pub customer_email: Email,
    pub vehicle: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub notes: String,
}

/// Errors in a booking form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Please choose a date")]
    MissingDate,
    #[error("Bookings cannot be made for a past date")]
    DateInPast,
    #[error("Please describe your vehicle")]
    MissingVehicle,
}

impl BookingRequest {
    /// Check the customer-entered fields against `today`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self, today: NaiveDate) -> Result<(), BookingError> {
        if self.date < today {
            return Err(BookingError::DateInPast);
        }
        if self.vehicle.trim().is_empty() {
            return Err(BookingError::MissingVehicle);
        }
        Ok(())
    }
}

/// Body of `PUT /bookings/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

/// Aggregates on the garage-owner dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerStats {
    pub total_bookings: u32,
    pub pending_bookings: u32,
    pub accepted_bookings: u32,
    pub rejected_bookings: u32,
    pub total_services: u32,
    pub total_reviews: u32,
}

/// Aggregates on the garage-admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_garages: u32,
    pub total_bookings: u32,
    pub total_users: u32,
    pub total_reviews: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn booking(id: &str, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(id),
            garage_id: GarageId::new("g1"),
            garage_name: None,
            service_id: None,
            service_name: "Full service".into(),
            customer_name: "Sunil".into(),
            customer_email: Email::parse("sunil@example.lk").unwrap(),
            vehicle: "Toyota Aqua".into(),
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            time_slot: "09:00".into(),
            notes: String::new(),
            status,
            created_at: None,
        }
    }

    #[test]
    fn test_merge_replaces_in_place() {
        let mut bookings = vec![
            booking("b1", BookingStatus::Pending),
            booking("b2", BookingStatus::Pending),
        ];
        merge_by_id(&mut bookings, booking("b1", BookingStatus::Accepted));

        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].id.as_str(), "b1");
        assert_eq!(bookings[0].status, BookingStatus::Accepted);
    }

    #[test]
    fn test_merge_appends_new_records() {
        let mut bookings = vec![booking("b1", BookingStatus::Pending)];
        merge_by_id(&mut bookings, booking("b9", BookingStatus::Rejected));
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[1].id.as_str(), "b9");
    }

    #[test]
    fn test_remove_by_id() {
        let mut bookings = vec![
            booking("b1", BookingStatus::Pending),
            booking("b2", BookingStatus::Accepted),
        ];
        remove_by_id(&mut bookings, &BookingId::new("b1"));
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, BookingStatus::Accepted);
    }

    #[test]
    fn test_booking_deserializes_backend_shape() {
        let json = r#"{
            "_id": "b1",
            "garageId": "g1",
            "serviceName": "Wheel alignment",
            "customerName": "Sunil",
            "customerEmail": "sunil@example.lk",
            "vehicle": "Honda Vezel",
            "date": "2026-11-02",
            "timeSlot": "10:30",
            "status": "Accepted"
        }"#;
        let parsed: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, BookingStatus::Accepted);
        assert_eq!(parsed.time_slot, "10:30");
    }

    #[test]
    fn test_booking_request_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut request = BookingRequest {
            garage_id: GarageId::new("g1"),
            service_id: None,
            customer_name: "Sunil".into(),
            customer_email: Email::parse("sunil@example.lk").unwrap(),
            vehicle: "Toyota Aqua".into(),
            date: today,
            time_slot: "09:00".into(),
            notes: String::new(),
        };
        assert_eq!(request.validate(today), Ok(()));

        request.date = today.pred_opt().unwrap();
        assert_eq!(request.validate(today), Err(BookingError::DateInPast));

        request.date = today;
        request.vehicle = " ".into();
        assert_eq!(request.validate(today), Err(BookingError::MissingVehicle));
    }

    #[test]
    fn test_garage_input_missing_fields() {
        let input = GarageInput {
            name: "Lanka Motors".into(),
            ..GarageInput::default()
        };
        assert_eq!(input.missing_fields(), ["location", "phone"]);
    }
}
