//! Key and fetch-size derivation for suggest requests.

/// Upper bound on raw records requested from the upstream per query.
pub const MAX_FETCH_LIMIT: usize = 300;

/// Grouping folds synonyms into their accepted taxon, so each query over-fetches
/// by this factor before truncating to the requested size.
pub const FETCH_MULTIPLIER: usize = 3;

/// Cache key for a normalized query and its effective limit.
pub fn cache_key(query: &str, limit: usize) -> String {
    format!("{}:{}", query, limit)
}

/// Number of raw records to request from the upstream for `limit` suggestions.
pub fn fetch_limit(limit: usize) -> usize {
    limit.saturating_mul(FETCH_MULTIPLIER).min(MAX_FETCH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_includes_limit() {
        assert_eq!(cache_key("quercus", 20), "quercus:20");
        assert_ne!(cache_key("quercus", 10), cache_key("quercus", 20));
    }

    #[test]
    fn test_cache_key_keeps_inner_whitespace() {
        assert_eq!(cache_key("quercus robur", 5), "quercus robur:5");
    }

    #[test]
    fn test_fetch_limit_overfetches() {
        assert_eq!(fetch_limit(1), 3);
        assert_eq!(fetch_limit(20), 60);
        assert_eq!(fetch_limit(100), 300);
    }

    #[test]
    fn test_fetch_limit_is_capped() {
        assert_eq!(fetch_limit(101), MAX_FETCH_LIMIT);
        assert_eq!(fetch_limit(usize::MAX), MAX_FETCH_LIMIT);
    }
}
