//! Catalog route handlers.
//!
//! The whole browsing state lives in the query string: category,
//! subcategory, facet selections (repeated keys), and page. Every link that
//! changes the filtered set omits `page`, so it starts again at page 1.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Response},
};
use garagehub_core::catalog::{Category, ExpandedCategories, Product};
use garagehub_core::facets::{Facet, FacetOptions, FacetSelection};
use garagehub_core::pagination::{PRODUCTS_PER_PAGE, Pagination};
use garagehub_core::{CategoryId, SubcategoryId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::session_keys;
use crate::routes::Layout;
use crate::state::AppState;

// =============================================================================
// Query state
// =============================================================================

/// Browsing state parsed from the catalog query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category: Option<CategoryId>,
    pub subcategory: Option<SubcategoryId>,
    pub selection: FacetSelection,
    /// Requested page, 0 when absent (clamped to 1 later).
    pub page: usize,
}

impl CatalogQuery {
    /// Parse a raw query string. Unknown keys are ignored.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

        let single = |key: &str| {
            pairs
                .iter()
                .find(|(k, v)| k == key && !v.trim().is_empty())
                .map(|(_, v)| v.trim().to_owned())
        };

        Self {
            category: single("category").map(CategoryId::new),
            subcategory: single("subcategory").map(SubcategoryId::new),
            page: single("page").and_then(|p| p.parse().ok()).unwrap_or(0),
            selection: FacetSelection::from_query_pairs(pairs.iter().map(|(k, v)| (k, v))),
        }
    }

    /// Link to this category/subcategory with `selection` applied.
    ///
    /// `page` is only written when given; filter links pass `None`.
    #[must_use]
    pub fn href(&self, selection: &FacetSelection, page: Option<usize>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(category) = &self.category {
            query.append_pair("category", category.as_str());
        }
        if let Some(subcategory) = &self.subcategory {
            query.append_pair("subcategory", subcategory.as_str());
        }
        for (key, value) in selection.to_query_pairs() {
            query.append_pair(key, &value);
        }
        if let Some(page) = page {
            query.append_pair("page", &page.to_string());
        }

        let query = query.finish();
        if query.is_empty() {
            "/catalog".to_string()
        } else {
            format!("/catalog?{query}")
        }
    }
}

fn category_href(category: &CategoryId, subcategory: Option<&SubcategoryId>) -> String {
    CatalogQuery {
        category: Some(category.clone()),
        subcategory: subcategory.cloned(),
        ..CatalogQuery::default()
    }
    .href(&FacetSelection::new(), None)
}

// =============================================================================
// View types
// =============================================================================

/// Subcategory link in the sidebar.
#[derive(Clone)]
pub struct SubcategoryView {
    pub name: String,
    pub count: u32,
    pub href: String,
    pub active: bool,
}

/// Category entry in the sidebar.
#[derive(Clone)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub href: String,
    pub active: bool,
    pub expanded: bool,
    pub subcategories: Vec<SubcategoryView>,
}

impl CategoryView {
    fn build(
        category: &Category,
        expanded: &ExpandedCategories,
        active: Option<&CategoryId>,
        active_sub: Option<&SubcategoryId>,
    ) -> Self {
        let is_active = active == Some(&category.id);
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            icon: category.icon.clone(),
            href: category_href(&category.id, None),
            active: is_active,
            expanded: expanded.is_expanded(&category.id),
            subcategories: category
                .subcategories
                .iter()
                .map(|sub| SubcategoryView {
                    name: sub.name.clone(),
                    count: sub.count,
                    href: category_href(&category.id, Some(&sub.id)),
                    active: is_active && active_sub == Some(&sub.id),
                })
                .collect(),
        }
    }

    fn build_all(
        categories: &[Category],
        expanded: &ExpandedCategories,
        active: Option<&CategoryId>,
        active_sub: Option<&SubcategoryId>,
    ) -> Vec<Self> {
        categories
            .iter()
            .map(|category| Self::build(category, expanded, active, active_sub))
            .collect()
    }
}

/// One value of a facet with its toggle link.
#[derive(Clone)]
pub struct FacetOptionView {
    pub value: String,
    pub count: usize,
    pub selected: bool,
    pub href: String,
}

/// A facet and its values.
#[derive(Clone)]
pub struct FacetGroupView {
    pub label: &'static str,
    pub options: Vec<FacetOptionView>,
}

/// Product card data.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub grade: String,
    pub fitment: String,
    pub brand: String,
    pub availability: String,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product
                .price
                .map_or_else(|| "Price on request".to_string(), |p| p.to_string()),
            grade: product.product_grade.clone(),
            fitment: product.fitment.clone(),
            brand: product.specifications.brand.clone(),
            availability: product.availability.clone(),
            image_url: product.image_url.clone(),
            in_stock: product.quantity > 0,
        }
    }
}

/// Pager link.
#[derive(Clone)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryView>,
    pub category_id: String,
    pub subcategory_id: String,
    pub heading: String,
    pub has_category: bool,
    pub facets: Vec<FacetGroupView>,
    pub has_filters: bool,
    pub clear_href: String,
    pub products: Vec<ProductView>,
    pub summary: String,
    pub pages: Vec<PageLink>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub error: Option<String>,
}

/// Category sidebar fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/category_sidebar.html")]
pub struct CategorySidebarTemplate {
    pub categories: Vec<CategoryView>,
    pub category_id: String,
    pub subcategory_id: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn expanded_categories(session: &Session) -> ExpandedCategories {
    session
        .get::<ExpandedCategories>(session_keys::EXPANDED_CATEGORIES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

fn facet_groups(query: &CatalogQuery, options: &FacetOptions) -> Vec<FacetGroupView> {
    Facet::ALL
        .into_iter()
        .filter(|facet| !options.get(*facet).is_empty())
        .map(|facet| FacetGroupView {
            label: facet.label(),
            options: options
                .get(facet)
                .iter()
                .map(|option| FacetOptionView {
                    value: option.value.clone(),
                    count: option.count,
                    selected: query.selection.is_selected(facet, &option.value),
                    href: query.href(&query.selection.toggled(facet, &option.value), None),
                })
                .collect(),
        })
        .collect()
}

fn page_summary(pagination: &Pagination) -> String {
    if pagination.total_items() == 0 {
        return "No parts match these filters".to_string();
    }
    let range = pagination.range();
    format!(
        "Showing {}\u{2013}{} of {}",
        range.start + 1,
        range.end,
        pagination.total_items()
    )
}

/// Display the catalog.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    RawQuery(raw): RawQuery,
) -> CatalogTemplate {
    let query = CatalogQuery::parse(raw.as_deref());
    let expanded = expanded_categories(&session).await;
    let mut error = None;

    let categories = state.backend().categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        error = Some(e.user_message());
        Vec::new()
    });

    let products = match &query.category {
        Some(category) => state
            .backend()
            .products(category, query.subcategory.as_ref())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, category = %category, "Failed to load products");
                error = Some(e.user_message());
                Vec::new()
            }),
        None => Vec::new(),
    };

    let active_category = query
        .category
        .as_ref()
        .and_then(|id| categories.iter().find(|c| &c.id == id));
    let heading = match active_category {
        Some(category) => query
            .subcategory
            .as_ref()
            .and_then(|sub| category.subcategory(sub))
            .map_or_else(
                || category.name.clone(),
                |sub| format!("{} / {}", category.name, sub.name),
            ),
        None => "Spare parts".to_string(),
    };

    let options = FacetOptions::from_products(&products);
    let filtered = query.selection.apply(&products);
    let pagination = Pagination::new(filtered.len(), PRODUCTS_PER_PAGE, query.page);

    let pages = if pagination.total_pages() > 1 {
        pagination
            .pages()
            .map(|number| PageLink {
                number,
                href: query.href(&query.selection, Some(number)),
                current: number == pagination.current_page(),
            })
            .collect()
    } else {
        Vec::new()
    };

    CatalogTemplate {
        layout: Layout::load(&session, user).await,
        categories: CategoryView::build_all(
            &categories,
            &expanded,
            query.category.as_ref(),
            query.subcategory.as_ref(),
        ),
        category_id: query
            .category
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        subcategory_id: query
            .subcategory
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        heading,
        has_category: query.category.is_some(),
        facets: facet_groups(&query, &options),
        has_filters: !query.selection.is_empty(),
        clear_href: query.href(&FacetSelection::new(), None),
        products: pagination
            .slice(&filtered)
            .iter()
            .map(|product| ProductView::from(*product))
            .collect(),
        summary: page_summary(&pagination),
        previous_href: pagination
            .has_previous()
            .then(|| query.href(&query.selection, Some(pagination.current_page() - 1))),
        next_href: pagination
            .has_next()
            .then(|| query.href(&query.selection, Some(pagination.current_page() + 1))),
        pages,
        error,
    }
}

/// Which category and subcategory the page is showing, so the re-rendered
/// sidebar keeps its highlight.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToggleForm {
    pub category_id: String,
    pub subcategory_id: String,
}

/// Expand or collapse a category in the sidebar (HTMX).
#[instrument(skip(state, session, form), fields(category = %id))]
pub async fn toggle_category(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ToggleForm>,
) -> Result<Response, AppError> {
    let mut expanded = expanded_categories(&session).await;
    expanded.toggle(&CategoryId::new(id));
    session
        .insert(session_keys::EXPANDED_CATEGORIES, &expanded)
        .await?;

    let categories = state.backend().categories().await?;
    let active = (!form.category_id.is_empty()).then(|| CategoryId::new(form.category_id.clone()));
    let active_sub =
        (!form.subcategory_id.is_empty()).then(|| SubcategoryId::new(form.subcategory_id.clone()));

    Ok(CategorySidebarTemplate {
        categories: CategoryView::build_all(
            &categories,
            &expanded,
            active.as_ref(),
            active_sub.as_ref(),
        ),
        category_id: form.category_id,
        subcategory_id: form.subcategory_id,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_repeated_facet_keys() {
        let query = CatalogQuery::parse(Some(
            "category=c1&brand=Bosch&brand=Denso&grade=OEM&page=2&utm_source=x",
        ));
        assert_eq!(query.category, Some(CategoryId::new("c1")));
        assert_eq!(query.subcategory, None);
        assert_eq!(query.page, 2);
        assert_eq!(query.selection.selected(Facet::Brand), ["Bosch", "Denso"]);
        assert!(query.selection.is_selected(Facet::ProductGrade, "OEM"));
    }

    #[test]
    fn test_parse_tolerates_missing_and_garbage_values() {
        let query = CatalogQuery::parse(Some("category=&page=abc"));
        assert_eq!(query, CatalogQuery::default());
        assert_eq!(CatalogQuery::parse(None), CatalogQuery::default());
    }

    #[test]
    fn test_filter_links_drop_the_page() {
        let query = CatalogQuery::parse(Some("category=c1&brand=Bosch&page=3"));
        let toggled = query.selection.toggled(Facet::Fitment, "Direct Fit");
        let href = query.href(&toggled, None);
        assert!(!href.contains("page="));
        assert!(href.contains("fitment=Direct+Fit"));
        assert!(href.contains("brand=Bosch"));
    }

    #[test]
    fn test_href_round_trips_through_parse() {
        let query = CatalogQuery::parse(Some(
            "category=c%26d&subcategory=s1&price=101-200&availability=In+Stock",
        ));
        let href = query.href(&query.selection, Some(2));
        let reparsed = CatalogQuery::parse(href.strip_prefix("/catalog?"));
        assert_eq!(reparsed.category, query.category);
        assert_eq!(reparsed.subcategory, query.subcategory);
        assert_eq!(reparsed.selection, query.selection);
        assert_eq!(reparsed.page, 2);
    }

    #[test]
    fn test_empty_query_links_to_bare_catalog() {
        assert_eq!(
            CatalogQuery::default().href(&FacetSelection::new(), None),
            "/catalog"
        );
    }
}
