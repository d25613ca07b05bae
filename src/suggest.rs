//! The suggest pipeline behind admission control: cache, upstream search,
//! shedder bookkeeping, grouping and truncation.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::cache_key::{cache_key, fetch_limit};
use crate::error::{ApiError, UpstreamError};
use crate::gbif::{SearchParams, TaxonSearch};
use crate::load_shedder::LoadShedder;
use crate::metrics::Metrics;
use crate::taxonomy::{map_and_group, TaxonSuggestion};
use crate::validation::SuggestQuery;

#[derive(Clone)]
pub struct SuggestService {
    search: Arc<dyn TaxonSearch>,
    cache: Arc<ResponseCache>,
    shedder: Arc<LoadShedder>,
    metrics: Arc<Metrics>,
    upstream_timeout: Duration,
}

impl SuggestService {
    pub fn new(
        search: Arc<dyn TaxonSearch>,
        cache: Arc<ResponseCache>,
        shedder: Arc<LoadShedder>,
        metrics: Arc<Metrics>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            search,
            cache,
            shedder,
            metrics,
            upstream_timeout,
        }
    }

    /// Resolve a validated query to at most `request.limit` grouped suggestions.
    ///
    /// Concurrent misses for the same key each call the upstream; the last write wins.
    pub async fn suggest(&self, request: &SuggestQuery) -> Result<Vec<TaxonSuggestion>, ApiError> {
        let key = cache_key(&request.query, request.limit);

        if let Some(cached) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            tracing::debug!(cache_key = %key, results = cached.len(), "cache hit");
            return Ok(cached);
        }
        self.metrics.record_cache_miss();

        let params = SearchParams::new(request.query.as_str(), fetch_limit(request.limit));
        // An elapsed deadline is reported exactly like a client-side timeout.
        let outcome = tokio::time::timeout(self.upstream_timeout, self.search.search(&params))
            .await
            .unwrap_or(Err(UpstreamError::Timeout));
        let records = match outcome {
            Ok(records) => records,
            Err(err) => return Err(self.upstream_failed(&request.query, err)),
        };

        self.shedder.record_success();
        self.metrics.set_load_shedding(false);

        let mut suggestions = map_and_group(&records);
        suggestions.truncate(request.limit);

        tracing::debug!(
            query = %request.query,
            fetched = records.len(),
            grouped = suggestions.len(),
            "suggestions computed"
        );

        self.cache.set(key, suggestions.clone());
        Ok(suggestions)
    }

    fn upstream_failed(&self, query: &str, err: UpstreamError) -> ApiError {
        let shedding = self.shedder.record_error();
        self.metrics.record_gbif_error();
        self.metrics.set_load_shedding(shedding);

        match &err {
            UpstreamError::Timeout => {
                tracing::warn!(query = %query, "gbif request timed out");
            }
            UpstreamError::Unavailable(detail) => {
                tracing::error!(query = %query, error = %detail, "gbif request failed");
            }
        }
        err.into()
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn shedder(&self) -> &Arc<LoadShedder> {
        &self.shedder
    }
}
