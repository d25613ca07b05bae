use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Counters and gauges updated along the request path.
#[derive(Debug, Default)]
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    rate_limit_rejects: AtomicU64,
    load_shed_rejects: AtomicU64,
    gbif_errors: AtomicU64,
    load_shedding_active: AtomicBool,
    http_requests: RwLock<BTreeMap<RequestLabels, u64>>,
    http_durations: RwLock<BTreeMap<RouteLabels, DurationStats>>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RequestLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Labels of a duration series: route only, no status.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RouteLabels {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: u64,
    pub sum_seconds: f64,
    pub max_seconds: f64,
}

impl DurationStats {
    fn observe(&mut self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        self.count += 1;
        self.sum_seconds += seconds;
        self.max_seconds = self.max_seconds.max(seconds);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDuration {
    #[serde(flatten)]
    pub labels: RouteLabels,
    #[serde(flatten)]
    pub stats: DurationStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCount {
    #[serde(flatten)]
    pub labels: RequestLabels,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub rate_limit_rejects_total: u64,
    pub load_shed_rejects_total: u64,
    pub gbif_errors_total: u64,
    pub load_shedding_active: u8,
    pub http_requests_total: Vec<RequestCount>,
    pub http_request_duration_seconds: Vec<RequestDuration>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_reject(&self) {
        self.rate_limit_rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_shed_reject(&self) {
        self.load_shed_rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gbif_error(&self) {
        self.gbif_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_load_shedding(&self, active: bool) {
        self.load_shedding_active.store(active, Ordering::Relaxed);
    }

    pub async fn record_request(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let labels = RequestLabels {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };
        *self.http_requests.write().await.entry(labels).or_insert(0) += 1;

        let route = RouteLabels {
            method: method.to_string(),
            path: path.to_string(),
        };
        self.http_durations
            .write()
            .await
            .entry(route)
            .or_default()
            .observe(elapsed);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.http_requests.read().await;
        let durations = self.http_durations.read().await;
        MetricsSnapshot {
            cache_hits_total: self.cache_hits.load(Ordering::Relaxed),
            cache_misses_total: self.cache_misses.load(Ordering::Relaxed),
            rate_limit_rejects_total: self.rate_limit_rejects.load(Ordering::Relaxed),
            load_shed_rejects_total: self.load_shed_rejects.load(Ordering::Relaxed),
            gbif_errors_total: self.gbif_errors.load(Ordering::Relaxed),
            load_shedding_active: self.load_shedding_active.load(Ordering::Relaxed) as u8,
            http_requests_total: requests
                .iter()
                .map(|(labels, count)| RequestCount {
                    labels: labels.clone(),
                    count: *count,
                })
                .collect(),
            http_request_duration_seconds: durations
                .iter()
                .map(|(labels, stats)| RequestDuration {
                    labels: labels.clone(),
                    stats: *stats,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_miss();
        metrics.record_rate_limit_reject();
        metrics.record_gbif_error();
        metrics.set_load_shedding(true);

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.cache_hits_total, 1);
        assert_eq!(snapshot.cache_misses_total, 2);
        assert_eq!(snapshot.rate_limit_rejects_total, 1);
        assert_eq!(snapshot.load_shed_rejects_total, 0);
        assert_eq!(snapshot.gbif_errors_total, 1);
        assert_eq!(snapshot.load_shedding_active, 1);
    }

    #[tokio::test]
    async fn test_request_counts_by_labels() {
        let metrics = Metrics::new();
        metrics.record_request("GET", "/health", 200, Duration::ZERO).await;
        metrics.record_request("GET", "/health", 200, Duration::ZERO).await;
        metrics
            .record_request("GET", "/api/v1/taxa/suggest", 429, Duration::ZERO)
            .await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.http_requests_total.len(), 2);
        let health = snapshot
            .http_requests_total
            .iter()
            .find(|c| c.labels.path == "/health")
            .unwrap();
        assert_eq!(health.count, 2);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["http_requests_total"][0]["method"], "GET");
    }

    #[tokio::test]
    async fn test_request_durations_by_route() {
        let metrics = Metrics::new();
        let suggest = "/api/v1/taxa/suggest";
        metrics
            .record_request("GET", suggest, 200, Duration::from_millis(100))
            .await;
        metrics
            .record_request("GET", suggest, 504, Duration::from_millis(300))
            .await;
        metrics
            .record_request("GET", "/health", 200, Duration::from_millis(2))
            .await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.http_request_duration_seconds.len(), 2);
        let route = snapshot
            .http_request_duration_seconds
            .iter()
            .find(|d| d.labels.path == suggest)
            .unwrap();
        assert_eq!(route.stats.count, 2);
        assert!((route.stats.sum_seconds - 0.4).abs() < 1e-9);
        assert!((route.stats.max_seconds - 0.3).abs() < 1e-9);

        let json = serde_json::to_value(&snapshot).unwrap();
        let health = &json["http_request_duration_seconds"][1];
        assert_eq!(health["path"], "/health");
        assert_eq!(health["count"], 1);
        assert!(health.get("status").is_none());
    }
}
