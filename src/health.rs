use std::sync::Arc;
use std::time::{Instant, SystemTime};
use serde::{Deserialize, Serialize};

use crate::cache::ResponseCache;
use crate::load_shedder::LoadShedder;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub gbif: UpstreamStatus,
    pub cache: CacheStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub status: String,
    pub shedding: bool,
    pub consecutive_errors: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct HealthChecker {
    started_at: Instant,
    shedder: Arc<LoadShedder>,
    cache: Arc<ResponseCache>,
}

impl HealthChecker {
    pub fn new(shedder: Arc<LoadShedder>, cache: Arc<ResponseCache>) -> Self {
        Self {
            started_at: Instant::now(),
            shedder,
            cache,
        }
    }

    pub fn check_health(&self) -> HealthStatus {
        let gbif = self.check_upstream();

        // Still serving cached results while the upstream is being shed.
        let overall_status = if gbif.shedding { "degraded" } else { "healthy" };
        let (hits, misses) = self.cache.stats();

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            dependencies: DependencyStatus {
                gbif,
                cache: CacheStatus {
                    entries: self.cache.len(),
                    hits,
                    misses,
                },
            },
        }
    }

    fn check_upstream(&self) -> UpstreamStatus {
        let shedding = self.shedder.is_shedding();
        UpstreamStatus {
            status: if shedding { "shedding" } else { "available" }.to_string(),
            shedding,
            consecutive_errors: self.shedder.consecutive_errors(),
        }
    }
}
