//! Cache types for catalog responses.

use garagehub_core::catalog::{Category, Product};
use garagehub_core::{CategoryId, SubcategoryId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Products {
        category: CategoryId,
        subcategory: Option<SubcategoryId>,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Products(Vec<Product>),
}
