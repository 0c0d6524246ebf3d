//! Integration test harness for GarageHub.
//!
//! Every test gets its own storefront and its own in-process fake of the
//! backend REST API, both bound to ephemeral ports. Sessions use the
//! in-memory store, so no database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p garagehub-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! app.login("customer@example.lk").await;
//! let response = app.get("/account").await;
//! assert_eq!(response.status(), 200);
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use garagehub_storefront::config::{BackendConfig, StorefrontConfig, parse_base_url};
use garagehub_storefront::state::AppState;
use reqwest::header::{HeaderMap as ClientHeaders, HeaderValue};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

/// Password every seeded user signs in with.
pub const PASSWORD: &str = "password123";

/// Seeded customer.
pub const CUSTOMER: &str = "customer@example.lk";

/// A second customer, author of a review the first one must not touch.
pub const OTHER_CUSTOMER: &str = "other@example.lk";

/// Seeded garage owner (owns `g1`).
pub const OWNER: &str = "owner@example.lk";

/// Seeded garage admin.
pub const ADMIN: &str = "admin@example.lk";

// =============================================================================
// Fake backend
// =============================================================================

/// Everything the fake backend stores, open for tests to inspect and tweak.
#[derive(Debug, Default)]
pub struct BackendData {
    /// `(name, email, role)`
    pub users: Vec<(String, String, String)>,
    pub categories: Vec<Value>,
    /// Keyed by `category` or `category/subcategory`.
    pub products: HashMap<String, Vec<Value>>,
    pub garages: Vec<Value>,
    pub services: Vec<Value>,
    pub bookings: Vec<Value>,
    pub reviews: Vec<Value>,
    /// Order bodies as received.
    pub orders: Vec<Value>,
    /// Number of `PUT /bookings/{id}/status` calls received.
    pub status_updates: usize,
    /// Make every catalog endpoint fail with a 500.
    pub fail_catalog: bool,
    /// Make review updates fail with a 500.
    pub fail_review_updates: bool,
    next_id: u32,
}

impl BackendData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn user_for_token(&self, headers: &HeaderMap) -> Option<(String, String, String)> {
        let token = headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let email = token.strip_prefix("token:")?;
        self.users.iter().find(|(_, e, _)| e == email).cloned()
    }
}

fn product(id: &str, name: &str, price: u32, brand: &str, quantity: u32) -> Value {
    json!({
        "_id": id,
        "name": name,
        "price": price,
        "quantity": quantity,
        "productGrade": "OEM",
        "fitment": "Direct Fit",
        "availability": if quantity > 0 { "In Stock" } else { "Out of Stock" },
        "specifications": {"brand": brand, "model": "", "compatibility": "Toyota Axio"}
    })
}

/// In-process stand-in for the GarageHub backend.
#[derive(Clone, Default)]
pub struct FakeBackend {
    data: Arc<Mutex<BackendData>>,
}

impl FakeBackend {
    /// A backend with a small, predictable data set.
    #[must_use]
    pub fn seeded() -> Self {
        let engine: Vec<Value> = [
            ("p1", "Alpha oil filter", 30, "Bosch", 10),
            ("p2", "Bravo air filter", 75, "Denso", 4),
            ("p3", "Charlie fuel filter", 150, "Bosch", 6),
            ("p4", "Delta spark plug", 45, "Denso", 20),
            ("p5", "Echo timing belt", 450, "Bosch", 2),
            ("p6", "Foxtrot water pump", 900, "Denso", 1),
            ("p7", "Golf fan belt", 60, "Denso", 0),
        ]
        .into_iter()
        .map(|(id, name, price, brand, quantity)| product(id, name, price, brand, quantity))
        .collect();
        let filters = engine[..3].to_vec();

        let data = BackendData {
            users: vec![
                ("Kasun".into(), CUSTOMER.into(), "customer".into()),
                ("Nimali".into(), OTHER_CUSTOMER.into(), "customer".into()),
                ("Ruwan".into(), OWNER.into(), "garageOwner".into()),
                ("Dilani".into(), ADMIN.into(), "garageAdmin".into()),
            ],
            categories: vec![
                json!({
                    "_id": "c1",
                    "name": "Engine",
                    "subcategories": [{"_id": "s1", "name": "Filters", "count": 3}]
                }),
                json!({"_id": "c2", "name": "Brakes", "subcategories": []}),
            ],
            products: HashMap::from([
                ("c1".to_string(), engine),
                ("c1/s1".to_string(), filters),
                ("c2".to_string(), Vec::new()),
            ]),
            garages: vec![
                json!({
                    "_id": "g1",
                    "name": "Lanka Motors",
                    "location": "Colombo 05",
                    "phone": "0112345678",
                    "description": "Full service workshop",
                    "ownerEmail": OWNER
                }),
                json!({
                    "_id": "g2",
                    "name": "Hill Country Auto",
                    "location": "Kandy",
                    "phone": "0812345678"
                }),
            ],
            services: vec![json!({
                "_id": "sv1",
                "garageId": "g1",
                "name": "Full service",
                "description": "Oil, filters and a 40 point check",
                "price": 8500,
                "durationMinutes": 120
            })],
            bookings: vec![json!({
                "_id": "b1",
                "garageId": "g1",
                "garageName": "Lanka Motors",
                "serviceId": "sv1",
                "serviceName": "Full service",
                "customerName": "Kasun",
                "customerEmail": CUSTOMER,
                "vehicle": "Toyota Aqua",
                "date": "2030-01-15",
                "timeSlot": "09:00",
                "status": "Pending"
            })],
            reviews: vec![
                json!({
                    "_id": "r1",
                    "name": "Kasun",
                    "email": CUSTOMER,
                    "garageId": "g1",
                    "rating": "Good",
                    "feedback": "Quick oil change",
                    "recommend": 8
                }),
                json!({
                    "_id": "r2",
                    "name": "Nimali",
                    "email": OTHER_CUSTOMER,
                    "rating": "Average",
                    "feedback": "Had to wait a while",
                    "recommend": 5
                }),
            ],
            ..BackendData::default()
        };

        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Lock the backend state for inspection.
    pub fn data(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().unwrap()
    }

    /// Router serving the backend API under `/api`.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/categories", get(categories))
            .route("/categories/{id}/products", get(products))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/orders", post(place_order))
            .route("/feedback", get(list_reviews).post(create_review))
            .route("/feedback/{id}", put(update_review).delete(delete_review))
            .route("/garages", get(list_garages).post(create_garage))
            .route(
                "/garages/{id}",
                get(show_garage).put(update_garage).delete(delete_garage),
            )
            .route("/garages/{id}/services", get(garage_services))
            .route("/garages/{id}/bookings", get(garage_bookings))
            .route("/services", post(create_service))
            .route("/services/{id}", put(update_service).delete(delete_service))
            .route("/bookings", post(create_booking))
            .route("/bookings/mine", get(my_bookings))
            .route("/bookings/{id}", axum::routing::delete(delete_booking))
            .route("/bookings/{id}/status", put(update_status))
            .route("/dashboard/garage-owner/{id}", get(owner_stats))
            .route("/dashboard/garage-admin", get(admin_stats))
            .with_state(self.clone());
        Router::new().nest("/api", api)
    }
}

type Reply = Result<Response, Response>;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(
    data: &BackendData,
    headers: &HeaderMap,
) -> Result<(String, String, String), Response> {
    data.user_for_token(headers)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))
}

fn find_index(records: &[Value], id: &str) -> Result<usize, Response> {
    records
        .iter()
        .position(|record| record["_id"] == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Not found"))
}

/// Merge the fields of `patch` into `record`.
fn patch(record: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(fields)) = (record.as_object_mut(), patch) {
        target.extend(fields);
    }
}

async fn categories(State(backend): State<FakeBackend>) -> Reply {
    let data = backend.data();
    if data.fail_catalog {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Database down"));
    }
    Ok(Json(data.categories.clone()).into_response())
}

#[derive(Deserialize)]
struct ProductsQuery {
    subcategory: Option<String>,
}

async fn products(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Query(query): Query<ProductsQuery>,
) -> Reply {
    let data = backend.data();
    if data.fail_catalog {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Database down"));
    }
    let key = match query.subcategory {
        Some(sub) => format!("{id}/{sub}"),
        None => id,
    };
    let products = data
        .products
        .get(&key)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Unknown category"))?;
    Ok(Json(products.clone()).into_response())
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: String,
}

fn auth_response(name: &str, email: &str, role: &str) -> Response {
    Json(json!({
        "token": format!("token:{email}"),
        "user": {"name": name, "email": email, "role": role}
    }))
    .into_response()
}

async fn login(State(backend): State<FakeBackend>, Json(body): Json<Credentials>) -> Reply {
    let data = backend.data();
    let user = data
        .users
        .iter()
        .find(|(_, email, _)| email.eq_ignore_ascii_case(&body.email))
        .filter(|_| body.password == PASSWORD)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    Ok(auth_response(&user.0, &user.1, &user.2))
}

async fn register(State(backend): State<FakeBackend>, Json(body): Json<Credentials>) -> Reply {
    let mut data = backend.data();
    if data.users.iter().any(|(_, email, _)| email == &body.email) {
        return Err(error(StatusCode::CONFLICT, "Email already registered"));
    }
    if body.password.len() < 6 {
        return Err(error(StatusCode::BAD_REQUEST, "Password is too short"));
    }
    data.users
        .push((body.name.clone(), body.email.clone(), body.role.clone()));
    Ok((
        StatusCode::CREATED,
        auth_response(&body.name, &body.email, &body.role),
    )
        .into_response())
}

async fn place_order(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> Reply {
    let mut data = backend.data();
    let id = data.next_id("ord");
    data.orders.push(body);
    Ok((StatusCode::CREATED, Json(json!({"_id": id, "status": "Pending"}))).into_response())
}

async fn list_reviews(State(backend): State<FakeBackend>) -> Json<Vec<Value>> {
    Json(backend.data().reviews.clone())
}

async fn create_review(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    body["_id"] = json!(data.next_id("r"));
    data.reviews.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_review(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    let (_, email, _) = authorized(&data, &headers)?;
    if data.fail_review_updates {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Database down"));
    }
    let index = find_index(&data.reviews, &id)?;
    if data.reviews[index]["email"] != email.as_str() {
        return Err(error(StatusCode::FORBIDDEN, "Not your review"));
    }
    patch(&mut data.reviews[index], body);
    Ok(Json(data.reviews[index].clone()).into_response())
}

async fn delete_review(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = backend.data();
    let (_, email, _) = authorized(&data, &headers)?;
    let index = find_index(&data.reviews, &id)?;
    if data.reviews[index]["email"] != email.as_str() {
        return Err(error(StatusCode::FORBIDDEN, "Not your review"));
    }
    data.reviews.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_garages(State(backend): State<FakeBackend>) -> Json<Vec<Value>> {
    Json(backend.data().garages.clone())
}

async fn show_garage(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Reply {
    let data = backend.data();
    let index = find_index(&data.garages, &id)?;
    Ok(Json(data.garages[index].clone()).into_response())
}

async fn create_garage(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    body["_id"] = json!(data.next_id("g"));
    data.garages.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_garage(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    let index = find_index(&data.garages, &id)?;
    patch(&mut data.garages[index], body);
    Ok(Json(data.garages[index].clone()).into_response())
}

async fn delete_garage(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    let index = find_index(&data.garages, &id)?;
    data.garages.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn garage_services(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
) -> Json<Vec<Value>> {
    Json(
        backend
            .data()
            .services
            .iter()
            .filter(|service| service["garageId"] == id.as_str())
            .cloned()
            .collect(),
    )
}

async fn garage_bookings(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let data = backend.data();
    authorized(&data, &headers)?;
    let bookings: Vec<Value> = data
        .bookings
        .iter()
        .filter(|booking| booking["garageId"] == id.as_str())
        .cloned()
        .collect();
    Ok(Json(bookings).into_response())
}

async fn create_service(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    body["_id"] = json!(data.next_id("sv"));
    data.services.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_service(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    let index = find_index(&data.services, &id)?;
    patch(&mut data.services[index], body);
    Ok(Json(data.services[index].clone()).into_response())
}

async fn delete_service(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    let index = find_index(&data.services, &id)?;
    data.services.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn create_booking(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    body["_id"] = json!(data.next_id("b"));
    body["status"] = json!("Pending");
    data.bookings.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn my_bookings(State(backend): State<FakeBackend>, headers: HeaderMap) -> Reply {
    let data = backend.data();
    let (_, email, _) = authorized(&data, &headers)?;
    let bookings: Vec<Value> = data
        .bookings
        .iter()
        .filter(|booking| booking["customerEmail"] == email.as_str())
        .cloned()
        .collect();
    Ok(Json(bookings).into_response())
}

async fn delete_booking(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    let index = find_index(&data.bookings, &id)?;
    data.bookings.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn update_status(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut data = backend.data();
    authorized(&data, &headers)?;
    data.status_updates += 1;
    let index = find_index(&data.bookings, &id)?;
    data.bookings[index]["status"] = body["status"].clone();
    Ok(Json(data.bookings[index].clone()).into_response())
}

async fn owner_stats(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Json<Value> {
    let data = backend.data();
    let bookings: Vec<&Value> = data
        .bookings
        .iter()
        .filter(|booking| booking["garageId"] == id.as_str())
        .collect();
    let with_status = |status: &str| bookings.iter().filter(|b| b["status"] == status).count();
    Json(json!({
        "totalBookings": bookings.len(),
        "pendingBookings": with_status("Pending"),
        "acceptedBookings": with_status("Accepted"),
        "rejectedBookings": with_status("Rejected"),
        "totalServices": data.services.iter().filter(|s| s["garageId"] == id.as_str()).count(),
        "totalReviews": data.reviews.iter().filter(|r| r["garageId"] == id.as_str()).count(),
    }))
}

async fn admin_stats(State(backend): State<FakeBackend>, headers: HeaderMap) -> Reply {
    let data = backend.data();
    authorized(&data, &headers)?;
    Ok(Json(json!({
        "totalGarages": data.garages.len(),
        "totalBookings": data.bookings.len(),
        "totalUsers": data.users.len(),
        "totalReviews": data.reviews.len(),
    }))
    .into_response())
}

// =============================================================================
// Storefront under test
// =============================================================================

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A running storefront wired to a running fake backend.
pub struct TestApp {
    pub address: String,
    pub backend: FakeBackend,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Start a storefront against a freshly seeded backend.
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeBackend::seeded()).await
    }

    /// Start a storefront against `backend`.
    pub async fn spawn_with(backend: FakeBackend) -> Self {
        let backend_addr = serve(backend.router()).await;

        let config = StorefrontConfig {
            // Never connected to: sessions live in memory and nothing else
            // touches the pool in these tests.
            database_url: SecretString::from("postgres://localhost/garagehub_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            backend: BackendConfig {
                base_url: parse_base_url(&format!("http://{backend_addr}/api")).unwrap(),
                timeout: Duration::from_secs(5),
                cache_ttl: Duration::from_secs(60),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/garagehub_test")
            .unwrap();
        let state = AppState::new(config, pool).unwrap();
        let storefront_addr = serve(garagehub_storefront::app(state, MemoryStore::default())).await;

        // The rate limiters key on the proxy header
        let mut headers = ClientHeaders::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()
            .unwrap();

        Self {
            address: format!("http://{storefront_addr}"),
            backend,
            client,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// POST a form the way an `hx-post` element does.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn htmx_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .unwrap()
    }

    pub async fn htmx_delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .unwrap()
    }

    /// Sign in as a seeded user and return the redirect target.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), 303, "login as {email} failed");
        location(&response)
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// A response header as a string, empty when absent.
#[must_use]
pub fn header(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
