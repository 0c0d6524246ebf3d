//! Cart route handlers.
//!
//! The cart lives in the session through [`SessionCartStore`]. Mutations use
//! HTMX: they return a fragment and fire `cart-updated` so the header badge
//! refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use garagehub_core::ProductId;
use garagehub_core::cart::{Cart, CartItem, CartStore};
use garagehub_core::{CategoryId, SubcategoryId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::SessionCartStore;
use crate::routes::{Layout, flash_error};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            quantity: item.quantity,
            price: item
                .price
                .map_or_else(|| "Price on request".to_string(), |p| p.to_string()),
            line_total: item.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            subtotal: cart.total_price().to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    /// Category the product was listed under, to look it up again.
    pub category_id: String,
    #[serde(default)]
    pub subcategory_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    /// Signed so that zero and negative values remove the line.
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> CartShowTemplate {
    let layout = Layout::load(&session, user).await;
    let cart = super::load_cart(&session).await;
    CartShowTemplate {
        layout,
        cart: CartView::from(&cart),
    }
}

/// Apply a change to the stored cart and persist it.
///
/// Nothing is saved when the store cannot be read.
async fn mutate_cart<F>(session: &Session, change: F) -> Result<Cart, Response>
where
    F: FnOnce(&mut Cart),
{
    let store = SessionCartStore::new(session.clone());
    let mut cart = store.load().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load cart");
        flash_error("We could not update your cart. Please try again.")
    })?;
    change(&mut cart);
    store.save(&cart).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to save cart");
        flash_error("We could not update your cart. Please try again.")
    })?;
    Ok(cart)
}

fn cart_items_response(cart: &Cart) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(cart),
        },
    )
        .into_response()
}

/// Add item to cart (HTMX).
///
/// The product is looked up again from the (cached) category listing so that
/// name and price come from the backend, not from the form.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let category = CategoryId::new(form.category_id);
    let subcategory =
        (!form.subcategory_id.is_empty()).then(|| SubcategoryId::new(form.subcategory_id));
    let product_id = ProductId::new(form.product_id);

    let products = match state
        .backend()
        .products(&category, subcategory.as_ref())
        .await
    {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products for add to cart");
            return flash_error(e.user_message());
        }
    };

    let Some(product) = products.iter().find(|p| p.id == product_id) else {
        return flash_error("That part is no longer listed.");
    };

    let quantity = form.quantity.unwrap_or(1);
    match mutate_cart(&session, |cart| cart.add(product, quantity)).await {
        Ok(cart) => (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response(),
        Err(response) => response,
    }
}

/// Update cart item quantity (HTMX).
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Response {
    let product_id = ProductId::new(form.product_id);
    match mutate_cart(&session, |cart| {
        cart.update_quantity(&product_id, form.quantity);
    })
    .await
    {
        Ok(cart) => cart_items_response(&cart),
        Err(response) => response,
    }
}

/// Remove item from cart (HTMX).
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Response {
    let product_id = ProductId::new(form.product_id);
    match mutate_cart(&session, |cart| {
        cart.remove(&product_id);
    })
    .await
    {
        Ok(cart) => cart_items_response(&cart),
        Err(response) => response,
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> CartCountTemplate {
    CartCountTemplate {
        count: super::load_cart(&session).await.item_count(),
    }
}
