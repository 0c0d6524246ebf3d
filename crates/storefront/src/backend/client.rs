//! Backend REST client.

use std::sync::Arc;

use garagehub_core::booking::{
    AdminStats, Booking, BookingRequest, Garage, GarageInput, GarageService, OwnerStats,
    ServiceInput, StatusUpdate,
};
use garagehub_core::catalog::{Category, Product};
use garagehub_core::checkout::OrderRequest;
use garagehub_core::review::{Review, ReviewDraft};
use garagehub_core::{
    BookingId, CategoryId, GarageId, ReviewId, ServiceId, SubcategoryId,
};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::{AuthResponse, ErrorBody, LoginRequest, OrderConfirmation, RegisterRequest};
use super::{Access, BackendError};
use crate::config::BackendConfig;

/// How much of an unexpected response body is logged.
const LOGGED_BODY_CHARS: usize = 500;

/// Client for the GarageHub backend.
///
/// Cheap to clone; all clones share one connection pool and one catalog
/// cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("garagehub-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, access: Access<'_>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match access {
            Access::Public => builder,
            Access::Bearer(token) => builder.bearer_auth(token),
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_owned();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = ErrorBody::message_from(&body);
        match status {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(path)),
            StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
            StatusCode::FORBIDDEN => Err(BackendError::Forbidden(
                message.unwrap_or_else(|| path.clone()),
            )),
            _ => {
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        path = %path,
                        body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                        "Backend returned server error"
                    );
                } else {
                    debug!(status = %status, path = %path, "Backend rejected request");
                }
                Err(BackendError::Api {
                    status: status.as_u16(),
                    message: message.unwrap_or_else(|| {
                        status.canonical_reason().unwrap_or("Request failed").to_owned()
                    }),
                })
            }
        }
    }

    /// Send a request and parse the JSON response.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        access: Access<'_>,
    ) -> Result<T, BackendError> {
        self.fetch(self.request(Method::GET, url, access)).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        access: Access<'_>,
        body: &B,
    ) -> Result<T, BackendError> {
        self.fetch(self.request(method, url, access).json(body))
            .await
    }

    async fn delete(&self, url: Url, access: Access<'_>) -> Result<(), BackendError> {
        self.execute(self.request(Method::DELETE, url, access))
            .await
            .map(drop)
    }

    // =========================================================================
    // Catalog (cached, public)
    // =========================================================================

    /// All categories with their subcategories.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, BackendError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.get(self.url(&["categories"])?, Access::Public).await?;
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    /// Products in a category, optionally narrowed to one subcategory.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn products(
        &self,
        category: &CategoryId,
        subcategory: Option<&SubcategoryId>,
    ) -> Result<Vec<Product>, BackendError> {
        let key = CacheKey::Products {
            category: category.clone(),
            subcategory: subcategory.cloned(),
        };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.url(&["categories", category.as_str(), "products"])?;
        if let Some(subcategory) = subcategory {
            url.query_pairs_mut()
                .append_pair("subcategory", subcategory.as_str());
        }

        let products: Vec<Product> = self.get(url, Access::Public).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Auth (public)
    // =========================================================================

    /// Exchange credentials for a token.
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["auth", "login"])?,
            Access::Public,
            request,
        )
        .await
    }

    /// Create an account and sign in.
    #[instrument(skip_all, fields(role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["auth", "register"])?,
            Access::Public,
            request,
        )
        .await
    }

    // =========================================================================
    // Orders (token sent when signed in)
    // =========================================================================

    /// Place an order for the cart contents.
    #[instrument(skip_all, fields(items = order.items.len(), signed_in = token.is_some()))]
    pub async fn place_order(
        &self,
        token: Option<&str>,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["orders"])?,
            Access::optional(token),
            order,
        )
        .await
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Every review, as the backend orders them.
    #[instrument(skip(self))]
    pub async fn reviews(&self) -> Result<Vec<Review>, BackendError> {
        self.get(self.url(&["feedback"])?, Access::Public).await
    }

    #[instrument(skip_all)]
    pub async fn create_review(
        &self,
        token: &str,
        draft: &ReviewDraft,
    ) -> Result<Review, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["feedback"])?,
            Access::Bearer(token),
            draft,
        )
        .await
    }

    #[instrument(skip(self, token, draft), fields(review_id = %id))]
    pub async fn update_review(
        &self,
        token: &str,
        id: &ReviewId,
        draft: &ReviewDraft,
    ) -> Result<Review, BackendError> {
        self.send_json(
            Method::PUT,
            self.url(&["feedback", id.as_str()])?,
            Access::Bearer(token),
            draft,
        )
        .await
    }

    #[instrument(skip(self, token), fields(review_id = %id))]
    pub async fn delete_review(&self, token: &str, id: &ReviewId) -> Result<(), BackendError> {
        self.delete(self.url(&["feedback", id.as_str()])?, Access::Bearer(token))
            .await
    }

    // =========================================================================
    // Garages
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn garages(&self) -> Result<Vec<Garage>, BackendError> {
        self.get(self.url(&["garages"])?, Access::Public).await
    }

    #[instrument(skip(self), fields(garage_id = %id))]
    pub async fn garage(&self, id: &GarageId) -> Result<Garage, BackendError> {
        self.get(self.url(&["garages", id.as_str()])?, Access::Public)
            .await
    }

    #[instrument(skip_all)]
    pub async fn create_garage(
        &self,
        token: &str,
        input: &GarageInput,
    ) -> Result<Garage, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["garages"])?,
            Access::Bearer(token),
            input,
        )
        .await
    }

    #[instrument(skip(self, token, input), fields(garage_id = %id))]
    pub async fn update_garage(
        &self,
        token: &str,
        id: &GarageId,
        input: &GarageInput,
    ) -> Result<Garage, BackendError> {
        self.send_json(
            Method::PUT,
            self.url(&["garages", id.as_str()])?,
            Access::Bearer(token),
            input,
        )
        .await
    }

    #[instrument(skip(self, token), fields(garage_id = %id))]
    pub async fn delete_garage(&self, token: &str, id: &GarageId) -> Result<(), BackendError> {
        self.delete(self.url(&["garages", id.as_str()])?, Access::Bearer(token))
            .await
    }

    // =========================================================================
    // Services
    // =========================================================================

    #[instrument(skip(self), fields(garage_id = %garage_id))]
    pub async fn garage_services(
        &self,
        garage_id: &GarageId,
    ) -> Result<Vec<GarageService>, BackendError> {
        self.get(
            self.url(&["garages", garage_id.as_str(), "services"])?,
            Access::Public,
        )
        .await
    }

    #[instrument(skip_all, fields(garage_id = %input.garage_id))]
    pub async fn create_service(
        &self,
        token: &str,
        input: &ServiceInput,
    ) -> Result<GarageService, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["services"])?,
            Access::Bearer(token),
            input,
        )
        .await
    }

    #[instrument(skip(self, token, input), fields(service_id = %id))]
    pub async fn update_service(
        &self,
        token: &str,
        id: &ServiceId,
        input: &ServiceInput,
    ) -> Result<GarageService, BackendError> {
        self.send_json(
            Method::PUT,
            self.url(&["services", id.as_str()])?,
            Access::Bearer(token),
            input,
        )
        .await
    }

    #[instrument(skip(self, token), fields(service_id = %id))]
    pub async fn delete_service(&self, token: &str, id: &ServiceId) -> Result<(), BackendError> {
        self.delete(self.url(&["services", id.as_str()])?, Access::Bearer(token))
            .await
    }

    // =========================================================================
    // Bookings (token required)
    // =========================================================================

    #[instrument(skip_all, fields(garage_id = %request.garage_id))]
    pub async fn create_booking(
        &self,
        token: &str,
        request: &BookingRequest,
    ) -> Result<Booking, BackendError> {
        self.send_json(
            Method::POST,
            self.url(&["bookings"])?,
            Access::Bearer(token),
            request,
        )
        .await
    }

    /// Bookings made by the signed-in customer.
    #[instrument(skip_all)]
    pub async fn my_bookings(&self, token: &str) -> Result<Vec<Booking>, BackendError> {
        self.get(self.url(&["bookings", "mine"])?, Access::Bearer(token))
            .await
    }

    /// Bookings received by a garage.
    #[instrument(skip(self, token), fields(garage_id = %garage_id))]
    pub async fn garage_bookings(
        &self,
        token: &str,
        garage_id: &GarageId,
    ) -> Result<Vec<Booking>, BackendError> {
        self.get(
            self.url(&["garages", garage_id.as_str(), "bookings"])?,
            Access::Bearer(token),
        )
        .await
    }

    /// Move a booking to a new status. Returns the updated booking.
    #[instrument(skip(self, token), fields(booking_id = %id, status = %update.status))]
    pub async fn update_booking_status(
        &self,
        token: &str,
        id: &BookingId,
        update: StatusUpdate,
    ) -> Result<Booking, BackendError> {
        self.send_json(
            Method::PUT,
            self.url(&["bookings", id.as_str(), "status"])?,
            Access::Bearer(token),
            &update,
        )
        .await
    }

    #[instrument(skip(self, token), fields(booking_id = %id))]
    pub async fn delete_booking(&self, token: &str, id: &BookingId) -> Result<(), BackendError> {
        self.delete(self.url(&["bookings", id.as_str()])?, Access::Bearer(token))
            .await
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    #[instrument(skip(self), fields(garage_id = %garage_id))]
    pub async fn owner_stats(&self, garage_id: &GarageId) -> Result<OwnerStats, BackendError> {
        self.get(
            self.url(&["dashboard", "garage-owner", garage_id.as_str()])?,
            Access::Public,
        )
        .await
    }

    #[instrument(skip_all)]
    pub async fn admin_stats(&self, token: &str) -> Result<AdminStats, BackendError> {
        self.get(
            self.url(&["dashboard", "garage-admin"])?,
            Access::Bearer(token),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::parse_base_url;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: parse_base_url(base).unwrap(),
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = client("https://api.garagehub.lk/v1");
        assert_eq!(
            client.url(&["garages", "g1", "services"]).unwrap().as_str(),
            "https://api.garagehub.lk/v1/garages/g1/services"
        );
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = client("http://localhost:8080/");
        assert_eq!(
            client.url(&["feedback", "a/b c"]).unwrap().as_str(),
            "http://localhost:8080/feedback/a%2Fb%20c"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let client = client("http://127.0.0.1:9/");
        let err = client.garages().await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
        assert!(!err.is_client_error());
    }
}
