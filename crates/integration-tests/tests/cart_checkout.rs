//! Cart fragments and checkout.

#![allow(clippy::unwrap_used)]

use garagehub_integration_tests::{TestApp, header};

async fn add(app: &TestApp, product_id: &str, quantity: &str) -> reqwest::Response {
    app.htmx_post(
        "/cart/add",
        &[
            ("product_id", product_id),
            ("category_id", "c1"),
            ("subcategory_id", ""),
            ("quantity", quantity),
        ],
    )
    .await
}

const CHECKOUT_FORM: &[(&str, &str)] = &[
    ("email", "kasun@example.lk"),
    ("first_name", "Kasun"),
    ("last_name", "Perera"),
    ("address_line1", "12 Galle Road"),
    ("address_line2", ""),
    ("city", "Colombo"),
    ("postal_code", "00300"),
    ("state", "Western"),
    ("phone", "0771234567"),
    ("delivery_location", "colombo"),
    ("terms_accepted", "on"),
];

#[tokio::test]
async fn test_add_to_cart_updates_badge_and_triggers_event() {
    let app = TestApp::spawn().await;

    let response = add(&app, "p1", "2").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "hx-trigger"), "cart-updated");
    assert!(response.text().await.unwrap().contains(">2<"));

    let response = add(&app, "p1", "1").await;
    assert!(response.text().await.unwrap().contains(">3<"));

    let count = app.htmx_get("/cart/count").await.text().await.unwrap();
    assert!(count.contains(">3<"));

    let cart = app.get("/cart").await.text().await.unwrap();
    assert!(cart.contains("Alpha oil filter"));
}

#[tokio::test]
async fn test_add_unknown_product_flashes_error() {
    let app = TestApp::spawn().await;

    let response = add(&app, "nope", "1").await;
    assert_eq!(header(&response, "hx-retarget"), "#flash");
    assert!(header(&response, "hx-trigger").is_empty());
    assert!(response.text().await.unwrap().contains("no longer listed"));
}

#[tokio::test]
async fn test_quantity_zero_removes_the_line() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "1").await;
    add(&app, "p2", "1").await;

    let response = app
        .htmx_post("/cart/update", &[("product_id", "p1"), ("quantity", "0")])
        .await;
    assert_eq!(header(&response, "hx-trigger"), "cart-updated");
    let body = response.text().await.unwrap();
    assert!(!body.contains("Alpha oil filter"));
    assert!(body.contains("Bravo air filter"));

    let body = app
        .htmx_post("/cart/remove", &[("product_id", "p2")])
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_fee_fragment_for_free_region() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "1").await;

    let free = app
        .htmx_get("/checkout/fee?delivery_location=colombo")
        .await
        .text()
        .await
        .unwrap();
    assert!(free.contains("Free"));

    let charged = app
        .htmx_get("/checkout/fee?delivery_location=jaffna")
        .await
        .text()
        .await
        .unwrap();
    assert!(!charged.contains("Free"));
    assert!(charged.contains("Jaffna"));
}

#[tokio::test]
async fn test_incomplete_checkout_is_rejected_without_an_order() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "1").await;

    let response = app
        .post_form("/checkout", &[("email", "kasun@example.lk")])
        .await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert!(body.contains("First name"));

    assert!(app.backend.data().orders.is_empty());
}

#[tokio::test]
async fn test_editing_a_field_clears_only_its_error() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "1").await;

    let response = app.post_form("/checkout", &[("email", "")]).await;
    assert_eq!(response.status(), 422);
    let body = response.text().await.unwrap();
    assert_eq!(body.matches(" is required</span>").count(), 7);
    assert!(body.contains("City is required"));

    let response = app
        .htmx_post("/checkout/field", &[("field", "city"), ("city", "Kandy")])
        .await;
    assert_eq!(response.status(), 200);
    assert!(!response.text().await.unwrap().contains("is required"));

    let body = app.get("/checkout").await.text().await.unwrap();
    assert!(!body.contains("City is required"));
    assert!(body.contains("value=\"Kandy\""));
    assert_eq!(body.matches(" is required</span>").count(), 6);
    assert!(body.contains("First name is required"));
    assert!(app.backend.data().orders.is_empty());
}

#[tokio::test]
async fn test_checkout_requires_terms() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "1").await;

    let without_terms: Vec<_> = CHECKOUT_FORM
        .iter()
        .copied()
        .filter(|(name, _)| *name != "terms_accepted")
        .collect();
    let response = app.post_form("/checkout", &without_terms).await;
    assert_eq!(response.status(), 422);
    assert!(app.backend.data().orders.is_empty());
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let app = TestApp::spawn().await;
    let response = app.post_form("/checkout", CHECKOUT_FORM).await;
    assert_eq!(response.status(), 422);
    assert!(app.backend.data().orders.is_empty());
}

#[tokio::test]
async fn test_successful_order_clears_cart() {
    let app = TestApp::spawn().await;
    add(&app, "p1", "2").await;
    add(&app, "p3", "1").await;

    let response = app.post_form("/checkout", CHECKOUT_FORM).await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("ord-1"));
    assert!(body.contains("Free"));

    {
        let data = app.backend.data();
        assert_eq!(data.orders.len(), 1);
        let order = &data.orders[0];
        assert_eq!(order["items"].as_array().unwrap().len(), 2);
        assert_eq!(order["deliveryLocation"], "colombo");
    }

    let count = app.htmx_get("/cart/count").await.text().await.unwrap();
    assert!(count.contains(">0<"));
}
