//! Catalog browsing: category selection, facets, paging, sidebar.

#![allow(clippy::unwrap_used)]

use garagehub_integration_tests::TestApp;

#[tokio::test]
async fn test_health_and_home() {
    let app = TestApp::spawn().await;
    assert_eq!(app.get("/health").await.status(), 200);
    assert_eq!(app.get("/").await.status(), 200);
}

#[tokio::test]
async fn test_catalog_without_category_prompts_for_one() {
    let app = TestApp::spawn().await;
    let body = app.get("/catalog").await.text().await.unwrap();

    assert!(body.contains("Choose a category"));
    assert!(body.contains("Engine"));
    assert!(!body.contains("Alpha oil filter"));
}

#[tokio::test]
async fn test_catalog_pages_five_products_at_a_time() {
    let app = TestApp::spawn().await;

    let first = app.get("/catalog?category=c1").await.text().await.unwrap();
    assert!(first.contains("Alpha oil filter"));
    assert!(first.contains("Echo timing belt"));
    assert!(!first.contains("Foxtrot water pump"));
    assert!(first.contains("of 7"));

    let second = app
        .get("/catalog?category=c1&page=2")
        .await
        .text()
        .await
        .unwrap();
    assert!(second.contains("Foxtrot water pump"));
    assert!(second.contains("Golf fan belt"));
    assert!(!second.contains("Alpha oil filter"));

    // Out-of-range pages land on the last page
    let clamped = app
        .get("/catalog?category=c1&page=99")
        .await
        .text()
        .await
        .unwrap();
    assert!(clamped.contains("Golf fan belt"));
}

#[tokio::test]
async fn test_brand_filter_narrows_products() {
    let app = TestApp::spawn().await;
    let body = app
        .get("/catalog?category=c1&brand=Bosch")
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("Alpha oil filter"));
    assert!(body.contains("Charlie fuel filter"));
    assert!(body.contains("Echo timing belt"));
    assert!(!body.contains("Bravo air filter"));
    assert!(body.contains("Clear filters"));
}

#[tokio::test]
async fn test_subcategory_shows_its_products_only() {
    let app = TestApp::spawn().await;
    let body = app
        .get("/catalog?category=c1&subcategory=s1")
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("Engine / Filters"));
    assert!(body.contains("Charlie fuel filter"));
    assert!(!body.contains("Delta spark plug"));
}

#[tokio::test]
async fn test_out_of_stock_products_cannot_be_added() {
    let app = TestApp::spawn().await;
    let body = app
        .get("/catalog?category=c1&page=2")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Out of stock"));
}

#[tokio::test]
async fn test_toggle_category_expands_then_collapses() {
    let app = TestApp::spawn().await;

    let expanded = app
        .htmx_post("/catalog/categories/c1/toggle", &[])
        .await
        .text()
        .await
        .unwrap();
    assert!(expanded.contains("Filters"));
    assert!(expanded.contains("aria-expanded=\"true\""));

    // The choice is kept in the session and survives a full page load
    let page = app.get("/catalog").await.text().await.unwrap();
    assert!(page.contains("Filters"));

    let collapsed = app
        .htmx_post("/catalog/categories/c1/toggle", &[])
        .await
        .text()
        .await
        .unwrap();
    assert!(collapsed.contains("aria-expanded=\"false\""));
    assert!(!collapsed.contains("Filters"));
}

#[tokio::test]
async fn test_catalog_survives_backend_failure() {
    let app = TestApp::spawn().await;
    app.backend.data().fail_catalog = true;

    let response = app.get("/catalog?category=c1").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Refresh"));
    assert!(!body.contains("Alpha oil filter"));
}

#[tokio::test]
async fn test_unknown_page_is_not_found() {
    let app = TestApp::spawn().await;
    assert_eq!(app.get("/no/such/page").await.status(), 404);
}
