use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::types::SearchAllResponse;

use super::{actors, movies};

/// Trims the term, strips control characters and bounds its length.
pub fn sanitize_search_term(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Search query cannot be empty".to_string()));
    }
    if trimmed.chars().count() > 200 {
        return Err(AppError::InvalidInput("Search query too long".to_string()));
    }
    let sanitized: String =
        trimmed.chars().filter(|ch| !ch.is_control() || ch.is_whitespace()).collect();
    if sanitized.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query contains only special characters".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Pattern for `column REGEXP ?` matching `term` as a literal substring, ignoring
/// case with full Unicode folding ("élan" finds "Élan Vital").
pub(crate) fn contains_pattern(term: &str) -> String {
    format!("(?i){}", regex::escape(term))
}

/// First page of matching movies plus every matching actor.
pub async fn search_all(
    db: &SqlitePool,
    raw: &str,
    page_size: i64,
) -> AppResult<SearchAllResponse> {
    let term = sanitize_search_term(raw)?;
    let movies = movies::list(db, 1, page_size, Some(term.as_str())).await?;
    let actors = actors::list(db, Some(term.as_str())).await?;
    Ok(SearchAllResponse { movies: movies.items, actors })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("Heat"), "(?i)Heat");
        assert_eq!(contains_pattern("50% (off)"), r"(?i)50% \(off\)");

        let re = regex::Regex::new(&contains_pattern("a.b")).unwrap();
        assert!(re.is_match("xA.Bx"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn test_contains_pattern_folds_unicode_case() {
        let re = regex::Regex::new(&contains_pattern("élan")).unwrap();
        assert!(re.is_match("Élan Vital"));
        let re = regex::Regex::new(&contains_pattern("STRASSE")).unwrap();
        assert!(re.is_match("Hauptstrasse"));
    }

    #[test]
    fn test_sanitize_search_term() {
        assert_eq!(sanitize_search_term("  matrix ").unwrap(), "matrix");
        assert!(sanitize_search_term("   ").is_err());
        assert!(sanitize_search_term(&"x".repeat(201)).is_err());
        assert_eq!(sanitize_search_term("a\u{0}b").unwrap(), "ab");
    }
}
