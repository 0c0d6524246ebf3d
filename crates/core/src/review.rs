//! Customer reviews (the backend calls them feedback).
//!
//! A review is owned by the customer whose email it carries. Editing and
//! deleting are only offered for, and only forwarded for, the signed-in
//! customer's own reviews.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, GarageId, ReviewId};

/// Lowest accepted recommend score.
pub const MIN_RECOMMEND_SCORE: u8 = 1;

/// Highest accepted recommend score.
pub const MAX_RECOMMEND_SCORE: u8 = 10;

/// Fixed rating scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Average,
    Poor,
    Terrible,
}

impl Rating {
    /// Every rating, best first.
    pub const ALL: [Self; 5] = [
        Self::Excellent,
        Self::Good,
        Self::Average,
        Self::Poor,
        Self::Terrible,
    ];

    /// Wire and display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
            Self::Terrible => "Terrible",
        }
    }

    /// Star count for compact rendering (Excellent = 5).
    #[must_use]
    pub const fn stars(self) -> u8 {
        match self {
            Self::Excellent => 5,
            Self::Good => 4,
            Self::Average => 3,
            Self::Poor => 2,
            Self::Terrible => 1,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rating| rating.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(ReviewError::MissingRating)
    }
}

/// A review as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: ReviewId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub garage_id: Option<GarageId>,
    pub rating: Rating,
    pub feedback: String,
    pub recommend: u8,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Whether `email` owns this review.
    #[must_use]
    pub fn is_owned_by(&self, email: &Email) -> bool {
        self.email.matches(email.as_str())
    }
}

impl crate::booking::Record for Review {
    type Id = ReviewId;

    fn id(&self) -> &ReviewId {
        &self.id
    }
}

/// Validation failures for a review form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("Please choose a rating")]
    MissingRating,
    #[error("Please write some feedback")]
    MissingFeedback,
    #[error("Recommend score must be between 1 and 10")]
    RecommendOutOfRange,
    #[error("You can only change your own reviews")]
    NotOwner,
}

/// A review form as submitted, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub rating: String,
    pub feedback: String,
    pub recommend: String,
    pub garage_id: String,
}

/// A validated review body, ready for `POST`/`PUT /feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garage_id: Option<GarageId>,
    pub rating: Rating,
    pub feedback: String,
    pub recommend: u8,
}

impl ReviewForm {
    /// Prefill from an existing review, for the edit page.
    #[must_use]
    pub fn from_review(review: &Review) -> Self {
        Self {
            rating: review.rating.as_str().to_owned(),
            feedback: review.feedback.clone(),
            recommend: review.recommend.to_string(),
            garage_id: review
                .garage_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    /// Validate every field and attach the author.
    ///
    /// # Errors
    ///
    /// Returns the first missing or out-of-range field.
    pub fn validate(&self, name: &str, email: &Email) -> Result<ReviewDraft, ReviewError> {
        let rating: Rating = self.rating.parse()?;

        let feedback = self.feedback.trim();
        if feedback.is_empty() {
            return Err(ReviewError::MissingFeedback);
        }

        let recommend = self
            .recommend
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|score| (MIN_RECOMMEND_SCORE..=MAX_RECOMMEND_SCORE).contains(score))
            .ok_or(ReviewError::RecommendOutOfRange)?;

        let garage_id = self.garage_id.trim();
        Ok(ReviewDraft {
            name: name.to_owned(),
            email: email.clone(),
            garage_id: (!garage_id.is_empty()).then(|| GarageId::new(garage_id)),
            rating,
            feedback: feedback.to_owned(),
            recommend,
        })
    }
}

/// Check that `email` may edit or delete `review`.
///
/// # Errors
///
/// Returns [`ReviewError::NotOwner`] for someone else's review.
pub fn ensure_owner(review: &Review, email: &Email) -> Result<(), ReviewError> {
    if review.is_owned_by(email) {
        Ok(())
    } else {
        Err(ReviewError::NotOwner)
    }
}

/// Reviews written by `email`, in their original order.
#[must_use]
pub fn owned_by<'a>(reviews: &'a [Review], email: &Email) -> Vec<&'a Review> {
    reviews.iter().filter(|r| r.is_owned_by(email)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn review(id: &str, author: &str) -> Review {
        Review {
            id: ReviewId::new(id),
            name: "Author".into(),
            email: email(author),
            garage_id: None,
            rating: Rating::Good,
            feedback: "Quick and tidy work".into(),
            recommend: 8,
            created_at: None,
        }
    }

    fn form(rating: &str, feedback: &str, recommend: &str) -> ReviewForm {
        ReviewForm {
            rating: rating.into(),
            feedback: feedback.into(),
            recommend: recommend.into(),
            garage_id: String::new(),
        }
    }

    #[test]
    fn test_valid_form() {
        let draft = form("Excellent", " Great service ", "10")
            .validate("Kasun", &email("kasun@example.lk"))
            .unwrap();
        assert_eq!(draft.rating, Rating::Excellent);
        assert_eq!(draft.feedback, "Great service");
        assert_eq!(draft.recommend, 10);
        assert_eq!(draft.garage_id, None);
    }

    #[test]
    fn test_every_field_is_required() {
        let who = email("kasun@example.lk");
        assert_eq!(
            form("", "ok", "5").validate("K", &who),
            Err(ReviewError::MissingRating)
        );
        assert_eq!(
            form("Superb", "ok", "5").validate("K", &who),
            Err(ReviewError::MissingRating)
        );
        assert_eq!(
            form("Good", "   ", "5").validate("K", &who),
            Err(ReviewError::MissingFeedback)
        );
        assert_eq!(
            form("Good", "ok", "").validate("K", &who),
            Err(ReviewError::RecommendOutOfRange)
        );
    }

    #[test]
    fn test_recommend_score_bounds() {
        let who = email("kasun@example.lk");
        assert!(form("Poor", "meh", "1").validate("K", &who).is_ok());
        assert!(form("Poor", "meh", "10").validate("K", &who).is_ok());
        assert_eq!(
            form("Poor", "meh", "0").validate("K", &who),
            Err(ReviewError::RecommendOutOfRange)
        );
        assert_eq!(
            form("Poor", "meh", "11").validate("K", &who),
            Err(ReviewError::RecommendOutOfRange)
        );
    }

    #[test]
    fn test_ownership_matches_email_case_insensitively() {
        let mine = review("r1", "Kasun@Example.lk");
        assert_eq!(ensure_owner(&mine, &email("kasun@example.lk")), Ok(()));
        assert_eq!(
            ensure_owner(&mine, &email("someone@example.lk")),
            Err(ReviewError::NotOwner)
        );
    }

    #[test]
    fn test_owned_by_filters_in_order() {
        let reviews = vec![
            review("r1", "a@example.lk"),
            review("r2", "b@example.lk"),
            review("r3", "a@example.lk"),
        ];
        let ids: Vec<_> = owned_by(&reviews, &email("a@example.lk"))
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["r1", "r3"]);
    }

    #[test]
    fn test_edit_form_prefill_round_trips() {
        let existing = review("r1", "a@example.lk");
        let draft = ReviewForm::from_review(&existing)
            .validate(&existing.name, &existing.email)
            .unwrap();
        assert_eq!(draft.rating, existing.rating);
        assert_eq!(draft.recommend, existing.recommend);
        assert_eq!(draft.feedback, existing.feedback);
    }
}
