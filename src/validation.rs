use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

/// Raw query string parameters of the suggest endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

/// A normalized, validated suggest request.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SuggestQuery {
    #[validate(length(min = 3, message = "Query must be at least 3 characters"))]
    pub query: String,
    #[validate(range(min = 1, max = 100, message = "Invalid limit parameter"))]
    pub limit: usize,
}

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Trims the query, parses the limit (default 20, clamped to 100) and validates both.
    pub fn validate_suggest(params: &SuggestParams) -> Result<SuggestQuery, ApiError> {
        let query = params.q.as_deref().unwrap_or_default().trim().to_string();
        let limit = Self::parse_limit(params.limit.as_deref())?;

        let suggest = SuggestQuery { query, limit };
        suggest
            .validate()
            .map_err(|errors| ApiError::InvalidQuery(first_message(&errors)))?;
        Ok(suggest)
    }

    fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
        let raw = match raw {
            None | Some("") => return Ok(DEFAULT_LIMIT),
            Some(raw) => raw,
        };

        match raw.parse::<i64>() {
            Ok(limit) if limit >= 1 => Ok((limit as u64).min(MAX_LIMIT as u64) as usize),
            _ => Err(ApiError::InvalidQuery("Invalid limit parameter".to_string())),
        }
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let message = fields
        .values()
        .flat_map(|field| field.iter())
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()));
    message.unwrap_or_else(|| "Invalid query".to_string())
}
