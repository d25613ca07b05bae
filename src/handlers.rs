use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::ApiError;
use crate::gbif::TaxonSearch;
use crate::health::HealthChecker;
use crate::load_shedder::LoadShedder;
use crate::metrics::Metrics;
use crate::rate_limiter::RateLimiter;
use crate::suggest::SuggestService;
use crate::taxonomy::TaxonSuggestion;
use crate::validation::{RequestValidator, SuggestParams};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Process-lifetime components handed to every request. Each guards its own state.
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub load_shedder: Arc<LoadShedder>,
    pub metrics: Arc<Metrics>,
    pub suggest: SuggestService,
    pub health: HealthChecker,
}

impl AppState {
    pub fn new(config: &Config, search: Arc<dyn TaxonSearch>) -> SharedState {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        let load_shedder = Arc::new(LoadShedder::new(
            config.upstream_error_threshold,
            config.upstream_backoff(),
        ));
        let cache = Arc::new(ResponseCache::new(config.cache_ttl()));
        let metrics = Arc::new(Metrics::new());

        Arc::new(AppState {
            suggest: SuggestService::new(
                search,
                Arc::clone(&cache),
                Arc::clone(&load_shedder),
                Arc::clone(&metrics),
                config.gbif_timeout(),
            ),
            health: HealthChecker::new(Arc::clone(&load_shedder), cache),
            rate_limiter,
            load_shedder,
            metrics,
        })
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        self.suggest.cache()
    }
}

/// Search taxa for autosuggest, grouped by accepted name with synonyms
pub async fn suggest(
    State(state): State<SharedState>,
    params: Result<Query<SuggestParams>, QueryRejection>,
) -> Result<Json<Vec<TaxonSuggestion>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;
    let request = RequestValidator::validate_suggest(&params)?;

    let suggestions = state.suggest.suggest(&request).await?;
    Ok(Json(suggestions))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.health.check_health())
}

/// Counter snapshot for scraping
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.metrics.snapshot().await)
}
