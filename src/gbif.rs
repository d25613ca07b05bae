//! GBIF species search client and the upstream record types it returns.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, UpstreamError};

const SEARCH_PATH: &str = "/species/search";
const SEARCH_RANKS: [&str; 4] = ["FAMILY", "GENUS", "SPECIES", "SUBSPECIES"];
const SYNONYM_STATUSES: [&str; 4] = [
    "SYNONYM",
    "HETEROTYPIC_SYNONYM",
    "HOMOTYPIC_SYNONYM",
    "PROPARTE_SYNONYM",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub results: Vec<Taxon>,
}

/// One record from the species search, trimmed to the fields the gateway reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Taxon {
    pub key: i64,
    pub scientific_name: String,
    pub canonical_name: String,
    pub rank: String,
    pub family: String,
    pub taxonomic_status: String,
    pub accepted_key: i64,
    /// Scientific name of the accepted taxon, set on synonyms.
    pub accepted: String,
}

impl Taxon {
    pub fn is_accepted(&self) -> bool {
        self.taxonomic_status == "ACCEPTED"
    }

    pub fn is_synonym(&self) -> bool {
        SYNONYM_STATUSES.contains(&self.taxonomic_status.as_str())
    }

    /// Own key for accepted records, the declared accepted key otherwise.
    pub fn effective_accepted_key(&self) -> i64 {
        if self.is_accepted() {
            self.key
        } else {
            self.accepted_key
        }
    }

    pub fn display_name(&self) -> &str {
        if self.canonical_name.is_empty() {
            &self.scientific_name
        } else {
            &self.canonical_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            offset: 0,
        }
    }

    fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("kingdom", "Plantae".to_string()),
            ("phylum", "Tracheophyta".to_string()),
        ];
        pairs.extend(SEARCH_RANKS.iter().map(|rank| ("rank", rank.to_string())));
        pairs.push(("limit", self.limit.to_string()));
        if self.offset > 0 {
            pairs.push(("offset", self.offset.to_string()));
        }
        pairs
    }
}

/// Upstream taxon search. Implementations own their timeouts and report them as
/// [`UpstreamError::Timeout`].
#[async_trait]
pub trait TaxonSearch: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<Vec<Taxon>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct GbifClient {
    base_url: String,
    http: reqwest::Client,
}

impl GbifClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl TaxonSearch for GbifClient {
    async fn search(&self, params: &SearchParams) -> Result<Vec<Taxon>, UpstreamError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);

        let response = self
            .http
            .get(&url)
            .query(&params.to_query_pairs())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Unavailable(format!(
                "unexpected status: {}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response.json().await.map_err(classify)?;
        tracing::debug!(
            query = %params.query,
            limit = params.limit,
            returned = body.results.len(),
            total = body.count,
            "gbif search completed"
        );
        Ok(body.results)
    }
}
