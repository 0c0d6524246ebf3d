//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Highest star count a rating renders.
const MAX_STARS: usize = 5;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders a star count as filled and empty stars.
///
/// Usage in templates: `{{ review.rating.stars()|stars }}`
#[askama::filter_fn]
pub fn stars(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let filled = count
        .to_string()
        .parse::<usize>()
        .unwrap_or(0)
        .min(MAX_STARS);
    Ok(format!(
        "{}{}",
        "\u{2605}".repeat(filled),
        "\u{2606}".repeat(MAX_STARS - filled)
    ))
}

/// Formats an ISO date (`2026-11-02`) as `Mon, 2 Nov 2026`.
///
/// Values that are not ISO dates are rendered unchanged.
///
/// Usage in templates: `{{ booking.date|long_date }}`
#[askama::filter_fn]
pub fn long_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_or(raw, |date| date.format("%a, %-d %b %Y").to_string()))
}
