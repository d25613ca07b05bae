pub mod cache;
pub mod cache_key;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod gbif;
pub mod handlers;
pub mod health;
pub mod load_shedder;
pub mod metrics;
pub mod middleware;
pub mod rate_limiter;
pub mod server;
pub mod suggest;
pub mod taxonomy;
pub mod token_bucket;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, Result, UpstreamError};
pub use server::{create_app, Server};
pub use taxonomy::{map_and_group, Synonym, TaxonSuggestion};
