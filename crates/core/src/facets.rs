//! Facet filtering for the product browser.
//!
//! A facet is a named dimension of a product (grade, fitment, brand, price
//! range, availability). For a product list we derive the selectable values
//! of each facet with their occurrence counts, and a [`FacetSelection`]
//! narrows the list down:
//!
//! - within one facet, selected values are OR-ed;
//! - across facets, constraints are AND-ed;
//! - a facet with nothing selected places no constraint.
//!
//! Filtering is order preserving and never mutates the source list.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::Money;

/// A filterable product dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    ProductGrade,
    Fitment,
    Brand,
    PriceRange,
    Availability,
}

impl Facet {
    /// Every facet, in sidebar order.
    pub const ALL: [Self; 5] = [
        Self::ProductGrade,
        Self::Fitment,
        Self::Brand,
        Self::PriceRange,
        Self::Availability,
    ];

    /// Query-string key carrying this facet's selected values.
    #[must_use]
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::ProductGrade => "grade",
            Self::Fitment => "fitment",
            Self::Brand => "brand",
            Self::PriceRange => "price",
            Self::Availability => "availability",
        }
    }

    /// Inverse of [`Facet::query_key`].
    #[must_use]
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|facet| facet.query_key() == key)
    }

    /// Sidebar heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProductGrade => "Product grade",
            Self::Fitment => "Fitment",
            Self::Brand => "Brand",
            Self::PriceRange => "Price range",
            Self::Availability => "Availability",
        }
    }

    /// The value a product carries for this facet.
    #[must_use]
    pub fn value_of(self, product: &Product) -> Cow<'_, str> {
        match self {
            Self::ProductGrade => Cow::Borrowed(product.product_grade.as_str()),
            Self::Fitment => Cow::Borrowed(product.fitment.as_str()),
            Self::Brand => Cow::Borrowed(product.specifications.brand.as_str()),
            Self::PriceRange => Cow::Borrowed(PriceBucket::for_price(product.price_or_zero()).label()),
            Self::Availability => Cow::Borrowed(product.availability.as_str()),
        }
    }
}

/// Fixed price ranges for the price facet.
///
/// A price falls in the first bucket whose inclusive upper bound it does not
/// exceed, so 50 is in `0-50` and 50.01 is in `51-100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriceBucket {
    UpTo50,
    UpTo100,
    UpTo200,
    UpTo500,
    Over500,
}

impl PriceBucket {
    /// Every bucket, cheapest first.
    pub const ALL: [Self; 5] = [
        Self::UpTo50,
        Self::UpTo100,
        Self::UpTo200,
        Self::UpTo500,
        Self::Over500,
    ];

    /// Bucket containing `price`.
    #[must_use]
    pub fn for_price(price: Money) -> Self {
        let amount = price.amount();
        if amount <= Decimal::from(50) {
            Self::UpTo50
        } else if amount <= Decimal::from(100) {
            Self::UpTo100
        } else if amount <= Decimal::from(200) {
            Self::UpTo200
        } else if amount <= Decimal::from(500) {
            Self::UpTo500
        } else {
            Self::Over500
        }
    }

    /// Value shown in the sidebar and carried in the query string.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpTo50 => "0-50",
            Self::UpTo100 => "51-100",
            Self::UpTo200 => "101-200",
            Self::UpTo500 => "201-500",
            Self::Over500 => "500+",
        }
    }
}

/// One selectable value of a facet and how many products carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    pub count: usize,
}

/// Derive the selectable values of `facet` from `products`.
///
/// Values with zero occurrences are omitted, as are blank values. Text facets
/// list values in order of first appearance; the price facet lists buckets
/// cheapest first.
#[must_use]
pub fn facet_options(products: &[Product], facet: Facet) -> Vec<FacetOption> {
    let mut options: Vec<FacetOption> = Vec::new();

    for product in products {
        let value = facet.value_of(product);
        if value.trim().is_empty() {
            continue;
        }
        match options.iter_mut().find(|option| option.value == value) {
            Some(option) => option.count += 1,
            None => options.push(FacetOption {
                value: value.into_owned(),
                count: 1,
            }),
        }
    }

    if facet == Facet::PriceRange {
        options.sort_by_key(|option| {
            PriceBucket::ALL
                .iter()
                .position(|bucket| bucket.label() == option.value)
        });
    }

    options
}

/// Option lists for every facet, derived from one product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetOptions {
    lists: BTreeMap<Facet, Vec<FacetOption>>,
}

impl FacetOptions {
    /// Derive all five option lists.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let lists = Facet::ALL
            .into_iter()
            .map(|facet| (facet, facet_options(products, facet)))
            .collect();
        Self { lists }
    }

    /// Options of one facet (empty when none were derived).
    #[must_use]
    pub fn get(&self, facet: Facet) -> &[FacetOption] {
        self.lists.get(&facet).map_or(&[], Vec::as_slice)
    }

    /// Whether no facet has any option, e.g. for an empty category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}

/// Selected values per facet.
///
/// Values are kept as sets and facets with no selected values are not
/// stored, so toggling a value on and off again yields a selection equal to
/// the original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSelection {
    selected: BTreeMap<Facet, BTreeSet<String>>,
}

impl FacetSelection {
    /// A selection with no constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the presence of `value` in `facet`'s selection.
    ///
    /// Returns `true` when the value is selected afterwards.
    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        let values = self.selected.entry(facet).or_default();
        let now_selected = !values.remove(value) && values.insert(value.to_owned());

        if values.is_empty() {
            self.selected.remove(&facet);
        }
        now_selected
    }

    /// A copy of this selection with `value` toggled, for building links.
    #[must_use]
    pub fn toggled(&self, facet: Facet, value: &str) -> Self {
        let mut next = self.clone();
        next.toggle(facet, value);
        next
    }

    /// Whether `value` is selected in `facet`.
    #[must_use]
    pub fn is_selected(&self, facet: Facet, value: &str) -> bool {
        self.selected
            .get(&facet)
            .is_some_and(|values| values.contains(value))
    }

    /// Selected values of one facet, in sorted order.
    #[must_use]
    pub fn selected(&self, facet: Facet) -> Vec<&str> {
        self.selected
            .get(&facet)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether nothing is selected in any facet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether `product` passes every constrained facet.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.selected.iter().all(|(facet, values)| {
            let value = facet.value_of(product);
            values.contains(&*value)
        })
    }

    /// Products passing the selection, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    /// The same selection limited to `facets`.
    #[must_use]
    pub fn restricted_to(&self, facets: &[Facet]) -> Self {
        let selected = self
            .selected
            .iter()
            .filter(|(facet, _)| facets.contains(facet))
            .map(|(facet, values)| (*facet, values.clone()))
            .collect();
        Self { selected }
    }

    /// Read a selection from query-string pairs.
    ///
    /// Keys that are not facet keys are ignored; repeated keys select
    /// several values; duplicates and blank values are dropped.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selection = Self::new();
        for (key, value) in pairs {
            let Some(facet) = Facet::from_query_key(key.as_ref()) else {
                continue;
            };
            let value = value.as_ref().trim();
            if !value.is_empty() && !selection.is_selected(facet, value) {
                selection.toggle(facet, value);
            }
        }
        selection
    }

    /// Query-string pairs encoding this selection.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        self.selected
            .iter()
            .flat_map(|(facet, values)| {
                values
                    .iter()
                    .map(move |value| (facet.query_key(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Specifications;
    use crate::types::ProductId;

    fn product(id: &str, grade: &str, brand: &str, price: i64, availability: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            price: Some(Money::from_units(price)),
            quantity: 1,
            product_grade: grade.to_string(),
            fitment: "Direct Fit".to_string(),
            availability: availability.to_string(),
            specifications: Specifications {
                brand: brand.to_string(),
                ..Specifications::default()
            },
            image_url: None,
        }
    }

    fn sample() -> Vec<Product> {
        vec![
            product("1", "OEM", "Bosch", 45, "In Stock"),
            product("2", "Aftermarket", "Denso", 120, "In Stock"),
            product("3", "OEM", "Denso", 650, "Out of Stock"),
            product("4", "OEM", "Bosch", 100, "In Stock"),
            product("5", "Refurbished", "NGK", 300, "Pre-order"),
        ]
    }

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_price_buckets_use_inclusive_upper_bounds() {
        let cases = [
            (Decimal::ZERO, PriceBucket::UpTo50),
            (Decimal::from(50), PriceBucket::UpTo50),
            (Decimal::new(5001, 2), PriceBucket::UpTo100),
            (Decimal::from(100), PriceBucket::UpTo100),
            (Decimal::from(200), PriceBucket::UpTo200),
            (Decimal::from(500), PriceBucket::UpTo500),
            (Decimal::from(501), PriceBucket::Over500),
        ];
        for (amount, bucket) in cases {
            assert_eq!(PriceBucket::for_price(Money::new(amount)), bucket, "{amount}");
        }
    }

    #[test]
    fn test_facet_options_count_and_order() {
        let products = sample();

        let grades = facet_options(&products, Facet::ProductGrade);
        assert_eq!(
            grades,
            vec![
                FacetOption { value: "OEM".into(), count: 3 },
                FacetOption { value: "Aftermarket".into(), count: 1 },
                FacetOption { value: "Refurbished".into(), count: 1 },
            ]
        );

        let prices = facet_options(&products, Facet::PriceRange);
        let labels: Vec<_> = prices.iter().map(|o| (o.value.as_str(), o.count)).collect();
        assert_eq!(
            labels,
            [("0-50", 1), ("51-100", 1), ("101-200", 1), ("201-500", 1), ("500+", 1)]
        );
    }

    #[test]
    fn test_facet_options_omit_blank_values() {
        let mut products = sample();
        products[0].specifications.brand = String::new();
        let brands = facet_options(&products, Facet::Brand);
        assert!(brands.iter().all(|o| !o.value.is_empty()));
        assert_eq!(brands.iter().map(|o| o.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_facet_options_empty_list() {
        let options = FacetOptions::from_products(&[]);
        assert!(options.is_empty());
        assert!(options.get(Facet::Brand).is_empty());
    }

    #[test]
    fn test_empty_selection_matches_everything() {
        let products = sample();
        let selection = FacetSelection::new();
        assert_eq!(selection.apply(&products).len(), products.len());
    }

    #[test]
    fn test_or_within_and_across() {
        let products = sample();
        let mut selection = FacetSelection::new();
        selection.toggle(Facet::Brand, "Bosch");
        selection.toggle(Facet::Brand, "Denso");
        assert_eq!(ids(&selection.apply(&products)), ["1", "2", "3", "4"]);

        selection.toggle(Facet::Availability, "In Stock");
        assert_eq!(ids(&selection.apply(&products)), ["1", "2", "4"]);

        selection.toggle(Facet::PriceRange, "51-100");
        assert_eq!(ids(&selection.apply(&products)), ["4"]);
    }

    #[test]
    fn test_filtering_is_associative_across_facets() {
        let products = sample();
        let mut both = FacetSelection::new();
        both.toggle(Facet::ProductGrade, "OEM");
        both.toggle(Facet::Brand, "Denso");
        both.toggle(Facet::Brand, "Bosch");

        let together = both.apply(&products);

        let grade_only = both.restricted_to(&[Facet::ProductGrade]);
        let brand_only = both.restricted_to(&[Facet::Brand]);
        let first_pass: Vec<Product> = grade_only.apply(&products).into_iter().cloned().collect();
        let stepwise = brand_only.apply(&first_pass);

        assert_eq!(ids(&together), ids(&stepwise));
        assert_eq!(ids(&together), ["1", "3", "4"]);
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut selection = FacetSelection::new();
        selection.toggle(Facet::Fitment, "Universal");
        let original = selection.clone();

        assert!(selection.toggle(Facet::Brand, "NGK"));
        assert!(!selection.toggle(Facet::Brand, "NGK"));
        assert_eq!(selection, original);

        assert!(!selection.toggle(Facet::Fitment, "Universal"));
        assert!(selection.toggle(Facet::Fitment, "Universal"));
        assert_eq!(selection, original);
    }

    #[test]
    fn test_toggle_twice_with_several_values_selected() {
        let mut selection = FacetSelection::new();
        selection.toggle(Facet::Brand, "Bosch");
        selection.toggle(Facet::Brand, "Denso");
        let original = selection.clone();

        assert!(!selection.toggle(Facet::Brand, "Bosch"));
        assert_eq!(selection.selected(Facet::Brand), ["Denso"]);
        assert!(selection.toggle(Facet::Brand, "Bosch"));
        assert_eq!(selection, original);
        assert_eq!(selection.to_query_pairs(), original.to_query_pairs());
    }

    #[test]
    fn test_query_pairs_round_trip() {
        let pairs = [
            ("brand", "Bosch"),
            ("page", "3"),
            ("brand", "Denso"),
            ("brand", "Bosch"),
            ("price", "500+"),
            ("grade", "  "),
        ];
        let selection = FacetSelection::from_query_pairs(pairs);
        assert_eq!(selection.selected(Facet::Brand), ["Bosch", "Denso"]);
        assert_eq!(selection.selected(Facet::PriceRange), ["500+"]);
        assert!(selection.selected(Facet::ProductGrade).is_empty());

        let encoded = selection.to_query_pairs();
        assert_eq!(
            encoded,
            vec![
                ("brand", "Bosch".to_string()),
                ("brand", "Denso".to_string()),
                ("price", "500+".to_string()),
            ]
        );
        assert_eq!(FacetSelection::from_query_pairs(encoded), selection);
    }
}
