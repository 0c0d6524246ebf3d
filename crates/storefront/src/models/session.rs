//! Session-related types.
//!
//! Everything the storefront remembers between requests lives in the
//! `tower-sessions` record: who is signed in, the cart, and a few UI choices.

use garagehub_core::cart::{Cart, CartStore, CartStoreError};
use garagehub_core::{Email, Role};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session-stored user identity.
///
/// Holds the backend token so protected calls can be made on the user's
/// behalf.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Bearer token issued by the backend.
    pub token: String,
    pub role: Role,
    /// Display name.
    pub name: String,
    pub email: Email,
}

impl CurrentUser {
    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("token", &"[REDACTED]")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for the expanded categories in the catalog sidebar.
    pub const EXPANDED_CATEGORIES: &str = "expanded_categories";

    /// Key for the garage a garage owner is currently managing.
    pub const SELECTED_GARAGE: &str = "selected_garage";

    /// Key for the in-progress checkout form.
    pub const CHECKOUT_FORM: &str = "checkout_form";

    /// Key for the checkout form's field errors.
    pub const CHECKOUT_ERRORS: &str = "checkout_errors";
}

/// Cart persistence backed by the visitor's session.
#[derive(Debug, Clone)]
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn storage_error(err: tower_sessions::session::Error) -> CartStoreError {
    CartStoreError::Storage(err.to_string())
}

impl CartStore for SessionCartStore {
    async fn load(&self) -> Result<Cart, CartStoreError> {
        Ok(self
            .session
            .get::<Cart>(keys::CART)
            .await
            .map_err(storage_error)?
            .unwrap_or_default())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStoreError> {
        self.session
            .insert(keys::CART, cart)
            .await
            .map_err(storage_error)
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        self.session
            .remove::<Cart>(keys::CART)
            .await
            .map(drop)
            .map_err(storage_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use garagehub_core::ProductId;
    use garagehub_core::catalog::{Product, Specifications};
    use tower_sessions::MemoryStore;

    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: "Brake pads".into(),
            price: Some(garagehub_core::Money::from_units(4500)),
            quantity: 12,
            product_grade: "OEM".into(),
            fitment: "Front".into(),
            availability: "In stock".into(),
            specifications: Specifications::default(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_session_cart_round_trip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let store = SessionCartStore::new(session.clone());

        assert!(store.load().await.unwrap().is_empty());

        let mut cart = Cart::new();
        cart.add(&product("p1"), 2);
        store.save(&cart).await.unwrap();

        let reloaded = SessionCartStore::new(session).load().await.unwrap();
        assert_eq!(reloaded, cart);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[test]
    fn test_current_user_debug_redacts_token() {
        let user = CurrentUser {
            token: "eyJ.secret".into(),
            role: Role::Customer,
            name: "Nimal".into(),
            email: Email::parse("nimal@example.lk").unwrap(),
        };
        assert!(!format!("{user:?}").contains("secret"));
        assert!(user.is_customer());
    }
}
