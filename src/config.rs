use clap::Parser;
use std::time::Duration;

/// Service configuration. Flags take precedence over environment variables,
/// which take precedence over the defaults below.
#[derive(Debug, Clone, Parser)]
#[command(name = "hostus", version, about = "Taxon autosuggest gateway in front of GBIF")]
pub struct Config {
    /// Server port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Public host name, used in log output
    #[arg(long, env = "HOST_NAME", default_value = "localhost")]
    pub host_name: String,

    /// Allowed CORS origins, comma separated; "*" allows any origin
    #[arg(long, env = "CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Requests per second admitted by the global rate limiter
    #[arg(long, env = "RATE_LIMIT", default_value_t = 100)]
    pub rate_limit: u32,

    /// Consecutive upstream errors before load shedding starts
    #[arg(long, env = "UPSTREAM_ERROR_THRESHOLD", default_value_t = 5)]
    pub upstream_error_threshold: u32,

    /// Seconds to shed load after the last upstream error
    #[arg(long, env = "UPSTREAM_BACKOFF_SECONDS", default_value_t = 30)]
    pub upstream_backoff_seconds: u64,

    /// Lifetime of cached responses, also the sweep interval
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 300)]
    pub cache_ttl_seconds: u64,

    /// Log level (debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// GBIF API base URL
    #[arg(long, env = "GBIF_BASE_URL", default_value = "https://api.gbif.org/v1")]
    pub gbif_base_url: String,

    /// Timeout for a single GBIF request in seconds
    #[arg(long, env = "GBIF_TIMEOUT_SECONDS", default_value_t = 10)]
    pub gbif_timeout_seconds: u64,

    /// Overall request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 30)]
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from command line flags and environment variables
    pub fn from_env() -> Self {
        Config::parse()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn upstream_backoff(&self) -> Duration {
        Duration::from_secs(self.upstream_backoff_seconds)
    }

    pub fn gbif_timeout(&self) -> Duration {
        Duration::from_secs(self.gbif_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.len() == 1 && self.cors_origins[0] == "*"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host_name: "localhost".to_string(),
            cors_origins: vec!["*".to_string()],
            rate_limit: 100,
            upstream_error_threshold: 5,
            upstream_backoff_seconds: 30,
            cache_ttl_seconds: 300,
            log_level: "info".to_string(),
            gbif_base_url: "https://api.gbif.org/v1".to_string(),
            gbif_timeout_seconds: 10,
            request_timeout_seconds: 30,
        }
    }
}
