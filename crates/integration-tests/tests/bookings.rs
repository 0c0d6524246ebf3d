//! Garage bookings, the owner dashboard and the admin dashboard.

#![allow(clippy::unwrap_used)]

use garagehub_integration_tests::{ADMIN, CUSTOMER, OWNER, TestApp, header, location};

#[tokio::test]
async fn test_garage_roster_and_detail_are_public() {
    let app = TestApp::spawn().await;

    let roster = app.get("/garages").await.text().await.unwrap();
    assert!(roster.contains("Lanka Motors"));
    assert!(roster.contains("Hill Country Auto"));

    let detail = app.get("/garages/g1").await.text().await.unwrap();
    assert!(detail.contains("Full service"));
    assert!(detail.contains("Quick oil change"));
    assert!(!detail.contains("Had to wait a while"));
}

#[tokio::test]
async fn test_customer_books_a_service() {
    let app = TestApp::spawn().await;
    app.login(CUSTOMER).await;

    let body = app
        .htmx_post(
            "/garages/g1/bookings",
            &[
                ("service_id", "sv1"),
                ("vehicle", "Honda Vezel"),
                ("date", "2030-02-01"),
                ("time_slot", "10:00"),
                ("notes", "Rattle from the rear"),
            ],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Booking requested"));
    assert!(body.contains("Pending"));

    let data = app.backend.data();
    assert_eq!(data.bookings.len(), 2);
    let booking = &data.bookings[1];
    assert_eq!(booking["customerEmail"], CUSTOMER);
    assert_eq!(booking["garageId"], "g1");
    assert_eq!(booking["vehicle"], "Honda Vezel");
}

#[tokio::test]
async fn test_booking_in_the_past_is_refused_locally() {
    let app = TestApp::spawn().await;
    app.login(CUSTOMER).await;

    let body = app
        .htmx_post(
            "/garages/g1/bookings",
            &[
                ("service_id", "sv1"),
                ("vehicle", "Honda Vezel"),
                ("date", "2001-01-01"),
                ("time_slot", "10:00"),
            ],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("past date"));
    assert_eq!(app.backend.data().bookings.len(), 1);
}

#[tokio::test]
async fn test_customer_sees_and_cancels_own_booking() {
    let app = TestApp::spawn().await;
    assert_eq!(app.login(CUSTOMER).await, "/account");

    let account = app.get("/account").await.text().await.unwrap();
    assert!(account.contains("Toyota Aqua"));
    assert!(account.contains("Quick oil change"));

    let response = app.htmx_delete("/account/bookings/b1").await;
    assert_eq!(response.status(), 200);
    assert!(app.backend.data().bookings.is_empty());
}

#[tokio::test]
async fn test_dashboards_are_role_gated() {
    let app = TestApp::spawn().await;

    let anonymous = app.get("/dashboard/owner").await;
    assert_eq!(anonymous.status(), 303);
    assert_eq!(location(&anonymous), "/auth/login");

    let htmx = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Accepted"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(htmx.status(), 401);
    assert_eq!(header(&htmx, "hx-redirect"), "/auth/login");

    app.login(CUSTOMER).await;
    assert_eq!(app.get("/dashboard/owner").await.status(), 403);
    assert_eq!(app.get("/dashboard/admin").await.status(), 403);
    let forbidden = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Accepted"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(forbidden.status(), 403);
    assert_eq!(app.backend.data().status_updates, 0);
}

#[tokio::test]
async fn test_owner_dashboard_lists_bookings_and_services() {
    let app = TestApp::spawn().await;
    assert_eq!(app.login(OWNER).await, "/dashboard/owner");

    let body = app.get("/dashboard/owner").await.text().await.unwrap();
    assert!(body.contains("Lanka Motors"));
    assert!(body.contains("Toyota Aqua"));
    assert!(body.contains("Full service"));
    // Only the owner's own garage is offered
    assert!(!body.contains("Hill Country Auto"));
}

#[tokio::test]
async fn test_status_change_is_sent_once() {
    let app = TestApp::spawn().await;
    app.login(OWNER).await;

    let response = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Accepted"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("owner-bookings"));
    assert!(body.contains("value=\"Accepted\""));

    {
        let data = app.backend.data();
        assert_eq!(data.status_updates, 1);
        assert_eq!(data.bookings[0]["status"], "Accepted");
    }

    // Clicking the current status again does nothing
    let response = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Accepted"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(response.status(), 204);
    assert_eq!(app.backend.data().status_updates, 1);
}

#[tokio::test]
async fn test_status_change_from_a_stale_row_is_still_sent() {
    let app = TestApp::spawn().await;
    app.login(OWNER).await;

    let body = app.get("/dashboard/owner").await.text().await.unwrap();
    assert!(body.contains("value=\"Pending\""));

    // Someone else accepts the booking after the page was rendered
    app.backend.data().bookings[0]["status"] = "Accepted".into();

    let response = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Pending"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(response.status(), 200);

    let data = app.backend.data();
    assert_eq!(data.status_updates, 1);
    assert_eq!(data.bookings[0]["status"], "Pending");
}

#[tokio::test]
async fn test_missing_booking_flashes_error() {
    let app = TestApp::spawn().await;
    app.login(OWNER).await;

    let response = app
        .htmx_post(
            "/dashboard/owner/bookings/gone/status",
            &[("status", "Accepted"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(header(&response, "hx-retarget"), "#flash");
    assert!(response.text().await.unwrap().contains("no longer exists"));
    assert_eq!(app.backend.data().status_updates, 0);
}

#[tokio::test]
async fn test_admin_handles_bookings_but_not_services() {
    let app = TestApp::spawn().await;
    app.login(ADMIN).await;

    let admin = app.get("/dashboard/admin").await.text().await.unwrap();
    assert!(admin.contains("href=\"/dashboard/owner\""));

    let body = app.get("/dashboard/owner").await.text().await.unwrap();
    assert!(body.contains("Toyota Aqua"));
    assert!(body.contains("Hill Country Auto"));
    assert!(!body.contains("Add a service"));

    let response = app
        .htmx_post(
            "/dashboard/owner/bookings/b1/status",
            &[("status", "Rejected"), ("garage_id", "g1")],
        )
        .await;
    assert_eq!(response.status(), 200);

    let data = app.backend.data();
    assert_eq!(data.status_updates, 1);
    assert_eq!(data.bookings[0]["status"], "Rejected");
}

#[tokio::test]
async fn test_owner_manages_services() {
    let app = TestApp::spawn().await;
    app.login(OWNER).await;

    let body = app
        .htmx_post(
            "/dashboard/owner/services",
            &[
                ("garage_id", "g1"),
                ("name", "Wheel alignment"),
                ("description", "Computerised"),
                ("price", "3500"),
                ("duration_minutes", "45"),
            ],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Wheel alignment"));
    assert!(body.contains("Full service"));

    let invalid = app
        .htmx_post(
            "/dashboard/owner/services",
            &[("garage_id", "g1"), ("name", "Tyres"), ("price", "-5")],
        )
        .await;
    assert_eq!(header(&invalid, "hx-retarget"), "#flash");
    assert!(invalid.text().await.unwrap().contains("Invalid price"));

    let body = app
        .htmx_delete("/dashboard/owner/services/sv1?garage_id=g1")
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains("Full service"));
    assert!(body.contains("Wheel alignment"));
    assert_eq!(app.backend.data().services.len(), 1);
}

#[tokio::test]
async fn test_admin_manages_garages() {
    let app = TestApp::spawn().await;
    assert_eq!(app.login(ADMIN).await, "/dashboard/admin");

    let body = app.get("/dashboard/admin").await.text().await.unwrap();
    assert!(body.contains("Hill Country Auto"));

    let body = app
        .htmx_post(
            "/dashboard/admin/garages",
            &[
                ("name", "Southern Auto Care"),
                ("location", "Galle"),
                ("phone", "0912345678"),
                ("description", ""),
                ("ownerEmail", ""),
            ],
        )
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Southern Auto Care"));
    assert_eq!(app.backend.data().garages.len(), 3);

    let missing = app
        .htmx_post("/dashboard/admin/garages", &[("name", "Nameless")])
        .await;
    assert_eq!(header(&missing, "hx-retarget"), "#flash");
    assert!(missing.text().await.unwrap().contains("location, phone"));
    assert_eq!(app.backend.data().garages.len(), 3);

    let body = app
        .htmx_delete("/dashboard/admin/garages/g2")
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains("Hill Country Auto"));
}
