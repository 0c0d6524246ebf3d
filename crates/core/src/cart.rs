//! Shopping cart.
//!
//! The cart is keyed by product id: adding a product that is already in the
//! cart increases its quantity instead of adding a second line. Each line
//! keeps a snapshot of the product's name, price and image taken when it was
//! added, so the cart renders without another catalog fetch.
//!
//! Persistence goes through the [`CartStore`] trait. The storefront backs it
//! with the session store; tests use [`MemoryCartStore`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Money, ProductId};

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    /// Missing prices count as zero.
    pub price: Option<Money>,
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    /// Price × quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.unwrap_or(Money::ZERO) * self.quantity
    }
}

/// The customer's cart. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line for the same product id has its quantity increased;
    /// otherwise a new line is appended. Adding zero units is a no-op.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(item) = self.item_mut(&product.id) {
            item.quantity = item.quantity.saturating_add(quantity);
            return;
        }
        self.items.push(CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            quantity,
        });
    }

    /// Remove the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }

    /// Set the quantity of an existing line; zero or less removes it.
    ///
    /// Unknown product ids are ignored.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        if let Some(item) = self.item_mut(product_id) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Σ price × quantity over all lines.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ quantity over all lines (the cart badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    fn item_mut(&mut self, product_id: &ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
    }
}

/// Errors raised by a [`CartStore`].
#[derive(Debug, thiserror::Error)]
pub enum CartStoreError {
    /// The backing store failed to read or write.
    #[error("cart storage failed: {0}")]
    Storage(String),
}

/// Durable home of the cart.
///
/// Implementations must return an empty cart when nothing has been saved
/// yet, and a saved cart must be returned by later loads in the same
/// session.
pub trait CartStore: Send + Sync {
    /// Read the current cart.
    fn load(&self) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Replace the stored cart.
    fn save(&self, cart: &Cart) -> impl Future<Output = Result<(), CartStoreError>> + Send;

    /// Forget the stored cart (after an order is placed).
    fn clear(&self) -> impl Future<Output = Result<(), CartStoreError>> + Send;
}

/// In-process [`CartStore`], shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    cart: Arc<Mutex<Cart>>,
}

impl MemoryCartStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Cart>, CartStoreError> {
        self.cart
            .lock()
            .map_err(|e| CartStoreError::Storage(e.to_string()))
    }
}

impl CartStore for MemoryCartStore {
    async fn load(&self) -> Result<Cart, CartStoreError> {
        Ok(self.lock()?.clone())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStoreError> {
        *self.lock()? = cart.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        *self.lock()? = Cart::new();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Specifications;
    use rust_decimal::Decimal;

    fn product(id: &str, price: Option<Money>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            price,
            quantity: 10,
            product_grade: "OEM".to_string(),
            fitment: "Universal".to_string(),
            availability: "In Stock".to_string(),
            specifications: Specifications::default(),
            image_url: None,
        }
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Money::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_add_same_product_merges_quantity() {
        let filter = product("oil-filter", Some(Money::from_units(1200)));
        let mut cart = Cart::new();
        cart.add(&filter, 2);
        cart.add(&filter, 3);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_add_distinct_products_appends_in_order() {
        let mut cart = Cart::new();
        cart.add(&product("a", None), 1);
        cart.add(&product("b", None), 1);
        cart.add(&product("a", None), 1);

        let order: Vec<_> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(&product("a", None), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity() {
        let id = ProductId::new("spark-plug");
        let mut cart = Cart::new();
        cart.add(&product("spark-plug", Some(Money::from_units(800))), 4);

        cart.update_quantity(&id, 2);
        assert_eq!(cart.item(&id).unwrap().quantity, 2);

        cart.update_quantity(&id, 0);
        assert!(cart.item(&id).is_none());

        cart.add(&product("spark-plug", None), 1);
        cart.update_quantity(&id, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_product_is_ignored() {
        let mut cart = Cart::new();
        cart.add(&product("a", None), 1);
        cart.update_quantity(&ProductId::new("zzz"), 9);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(&product("a", None), 1);
        assert!(cart.remove(&ProductId::new("a")));
        assert!(!cart.remove(&ProductId::new("a")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_price_treats_missing_price_as_zero() {
        let mut cart = Cart::new();
        cart.add(&product("a", Some(Money::new(Decimal::new(1999, 2)))), 2);
        cart.add(&product("b", None), 7);
        cart.add(&product("c", Some(Money::from_units(500))), 1);

        assert_eq!(cart.total_price(), Money::new(Decimal::new(53998, 2)));
        assert_eq!(cart.item_count(), 10);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryCartStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let mut cart = Cart::new();
        cart.add(&product("a", Some(Money::from_units(10))), 3);
        store.save(&cart).await.unwrap();

        let shared = store.clone();
        assert_eq!(shared.load().await.unwrap(), cart);

        store.clear().await.unwrap();
        assert!(shared.load().await.unwrap().is_empty());
    }
}
