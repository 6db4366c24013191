//! Featured-item selection.
//!
//! Picks the records worth showing on a landing page: only items whose display
//! fields are all filled in and that are linked to at least one other record
//! qualify. Qualifying items are ranked by the mean of every rating reachable
//! from them, most recently created first among equal means.
//!
//! The selector is a pure function over a materialized snapshot. Loading the
//! snapshot is the job of the catalog services.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Number of items returned when the caller does not ask for a specific count.
pub const DEFAULT_FEATURED_LIMIT: i64 = 6;

#[derive(Debug, Error, PartialEq)]
pub enum FeaturedError {
    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),
}

/// The value of one field a card needs in order to be rendered.
#[derive(Debug, Clone, Copy)]
pub enum DisplayField<'a> {
    Text(Option<&'a str>),
    Number(Option<i64>),
}

impl DisplayField<'_> {
    /// Text counts as populated when it has at least one non-whitespace character.
    pub fn is_populated(&self) -> bool {
        match self {
            DisplayField::Text(v) => v.is_some_and(|s| !s.trim().is_empty()),
            DisplayField::Number(v) => v.is_some(),
        }
    }
}

/// A record that can be offered to [`select_featured`].
pub trait Featurable {
    /// Every field that must be populated for the item to be shown.
    fn display_fields(&self) -> Vec<DisplayField<'_>>;

    /// Number of linked secondary records (actors of a movie, movies of an actor).
    fn linked_count(&self) -> usize;

    /// All rating scores reachable from this item.
    fn rating_scores(&self) -> Vec<f64>;

    fn created_at(&self) -> DateTime<Utc>;
}

pub fn is_eligible<T: Featurable + ?Sized>(item: &T) -> bool {
    item.linked_count() > 0 && item.display_fields().iter().all(DisplayField::is_populated)
}

/// Arithmetic mean of `scores`; an item without ratings scores `0.0`.
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Selects up to `limit` eligible items ordered by descending mean score, then by
/// descending creation time.
///
/// Items that tie on both keys keep their input order. Fewer than `limit`
/// eligible items yields all of them; no eligible items yields an empty list.
pub fn select_featured<T, I>(items: I, limit: i64) -> Result<Vec<T>, FeaturedError>
where
    T: Featurable,
    I: IntoIterator<Item = T>,
{
    if limit <= 0 {
        return Err(FeaturedError::InvalidLimit(limit));
    }
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    let mut ranked: Vec<(f64, DateTime<Utc>, T)> = items
        .into_iter()
        .filter(|item| is_eligible(item))
        .map(|item| (mean_score(&item.rating_scores()), item.created_at(), item))
        .collect();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    ranked.truncate(limit);

    tracing::debug!(selected = ranked.len(), limit, "featured selection ranked");
    Ok(ranked.into_iter().map(|(_, _, item)| item).collect())
}
