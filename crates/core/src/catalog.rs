//! Catalog records served by the backend.
//!
//! Categories and products are read-only on this side: the storefront keeps
//! a cached copy per category selection and never writes them back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Money, ProductId, SubcategoryId};

/// Technical details of a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Specifications {
    pub brand: String,
    pub model: String,
    pub compatibility: String,
}

/// A spare part listed in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    /// Missing prices are tolerated; they count as zero in cart totals.
    #[serde(default)]
    pub price: Option<Money>,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    /// e.g. `OEM`, `Aftermarket`, `Refurbished`.
    #[serde(default)]
    pub product_grade: String,
    /// e.g. `Direct Fit`, `Universal`.
    #[serde(default)]
    pub fitment: String,
    /// e.g. `In Stock`, `Out of Stock`, `Pre-order`.
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

impl Product {
    /// Price with the missing-price rule applied.
    #[must_use]
    pub fn price_or_zero(&self) -> Money {
        self.price.unwrap_or(Money::ZERO)
    }
}

/// A subcategory inside a category, with the backend's product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    #[serde(alias = "_id")]
    pub id: SubcategoryId,
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

/// A top-level catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Kept in backend order.
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    /// Look up a subcategory by id.
    #[must_use]
    pub fn subcategory(&self, id: &SubcategoryId) -> Option<&Subcategory> {
        self.subcategories.iter().find(|sub| &sub.id == id)
    }
}

/// Which categories are expanded in the category sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedCategories(BTreeSet<CategoryId>);

impl ExpandedCategories {
    /// Flip the expanded flag of one category. Returns the new state.
    pub fn toggle(&mut self, id: &CategoryId) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.clone());
            true
        }
    }

    /// Whether a category is expanded.
    #[must_use]
    pub fn is_expanded(&self, id: &CategoryId) -> bool {
        self.0.contains(id)
    }
}
