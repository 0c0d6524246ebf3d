//! Review route handlers.
//!
//! Anyone can read reviews. Customers write them and may edit or delete only
//! their own; the ownership check runs here before anything is sent to the
//! backend.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use garagehub_core::booking::Garage;
use garagehub_core::ReviewId;
use garagehub_core::review::{
    MAX_RECOMMEND_SCORE, MIN_RECOMMEND_SCORE, Rating, Review, ReviewForm, ensure_owner,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireCustomer};
use crate::models::CurrentUser;
use crate::routes::account::ReviewView;
use crate::routes::{Layout, flash_error};
use crate::state::AppState;

/// Rating choice on the review form.
#[derive(Clone)]
pub struct RatingOption {
    pub value: &'static str,
    pub selected: bool,
}

/// Garage choice on the review form.
#[derive(Clone)]
pub struct GarageOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// Review form state for templates.
#[derive(Clone)]
pub struct ReviewFormView {
    pub ratings: Vec<RatingOption>,
    pub garages: Vec<GarageOption>,
    pub feedback: String,
    pub recommend: String,
    pub min_recommend: u8,
    pub max_recommend: u8,
    pub error: Option<String>,
}

impl ReviewFormView {
    fn new(form: &ReviewForm, garages: &[Garage], error: Option<String>) -> Self {
        Self {
            ratings: Rating::ALL
                .into_iter()
                .map(|rating| RatingOption {
                    value: rating.as_str(),
                    selected: form.rating == rating.as_str(),
                })
                .collect(),
            garages: garages
                .iter()
                .map(|garage| GarageOption {
                    id: garage.id.to_string(),
                    name: garage.name.clone(),
                    selected: form.garage_id == garage.id.as_str(),
                })
                .collect(),
            feedback: form.feedback.clone(),
            recommend: form.recommend.clone(),
            min_recommend: MIN_RECOMMEND_SCORE,
            max_recommend: MAX_RECOMMEND_SCORE,
            error,
        }
    }
}

/// Review list page template.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsTemplate {
    pub layout: Layout,
    pub reviews: Vec<ReviewView>,
    pub form: Option<ReviewFormView>,
    pub error: Option<String>,
}

/// Review edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/edit.html")]
pub struct EditReviewTemplate {
    pub layout: Layout,
    pub id: String,
    pub form: ReviewFormView,
}

async fn render_index(
    state: &AppState,
    session: &Session,
    user: Option<CurrentUser>,
    form: &ReviewForm,
    form_error: Option<String>,
) -> ReviewsTemplate {
    let (reviews, garages) = tokio::join!(state.backend().reviews(), state.backend().garages());

    let mut error = None;
    let reviews = reviews.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load reviews");
        error = Some(e.user_message());
        Vec::new()
    });
    // The garage picker is optional; a failure only hides it
    let garages = garages.unwrap_or_default();

    let customer = user.as_ref().filter(|u| u.is_customer());
    let views = reviews
        .iter()
        .map(|review| {
            let mine = customer.is_some_and(|u| review.is_owned_by(&u.email));
            ReviewView::new(review, mine)
        })
        .collect();
    let form = customer.map(|_| ReviewFormView::new(form, &garages, form_error));

    ReviewsTemplate {
        layout: Layout::load(session, user).await,
        reviews: views,
        form,
        error,
    }
}

/// List every review.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> ReviewsTemplate {
    render_index(&state, &session, user, &ReviewForm::default(), None).await
}

/// Create a review.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(user): RequireCustomer,
    Form(form): Form<ReviewForm>,
) -> Response {
    let draft = match form.validate(&user.name, &user.email) {
        Ok(draft) => draft,
        Err(e) => {
            let page = render_index(&state, &session, Some(user), &form, Some(e.to_string())).await;
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
    };

    match state.backend().create_review(&user.token, &draft).await {
        Ok(review) => {
            add_breadcrumb("review", "Created review", Some(&[("review_id", review.id.as_str())]));
            Redirect::to("/reviews").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create review");
            let message = e.user_message();
            let page = render_index(&state, &session, Some(user), &form, Some(message)).await;
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

/// Fetch a review and check that `user` wrote it.
async fn owned_review(
    state: &AppState,
    user: &CurrentUser,
    id: &ReviewId,
) -> Result<Review, AppError> {
    let review = state
        .backend()
        .reviews()
        .await?
        .into_iter()
        .find(|review| &review.id == id)
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))?;

    ensure_owner(&review, &user.email).map_err(|e| {
        tracing::warn!(review_id = %id, "Refused change to someone else's review");
        AppError::Forbidden(e.to_string())
    })?;
    Ok(review)
}

/// Display the edit form for an own review.
#[instrument(skip(state, session, user), fields(review_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<String>,
) -> Result<EditReviewTemplate, AppError> {
    let id = ReviewId::new(id);
    let review = owned_review(&state, &user, &id).await?;
    let garages = state.backend().garages().await.unwrap_or_default();

    Ok(EditReviewTemplate {
        layout: Layout::load(&session, Some(user)).await,
        id: id.to_string(),
        form: ReviewFormView::new(&ReviewForm::from_review(&review), &garages, None),
    })
}

/// Update an own review.
#[instrument(skip(state, session, user, form), fields(review_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let id = ReviewId::new(id);
    owned_review(&state, &user, &id).await?;

    let result = match form.validate(&user.name, &user.email) {
        Ok(draft) => state
            .backend()
            .update_review(&user.token, &id, &draft)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to update review");
                (StatusCode::BAD_GATEWAY, e.user_message())
            }),
        Err(e) => Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string())),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/reviews").into_response()),
        Err((status, message)) => {
            let garages = state.backend().garages().await.unwrap_or_default();
            let page = EditReviewTemplate {
                layout: Layout::load(&session, Some(user)).await,
                id: id.to_string(),
                form: ReviewFormView::new(&form, &garages, Some(message)),
            };
            Ok((status, page).into_response())
        }
    }
}

/// Delete an own review (HTMX). Returns an empty body so the card is removed.
#[instrument(skip(state, user), fields(review_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = ReviewId::new(id);
    owned_review(&state, &user, &id).await?;

    match state.backend().delete_review(&user.token, &id).await {
        Ok(()) => Ok(().into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete review");
            Ok(flash_error(e.user_message()))
        }
    }
}
