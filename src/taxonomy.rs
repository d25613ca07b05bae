//! Grouping of raw upstream taxa into accepted-name suggestions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::gbif::Taxon;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonSuggestion {
    pub accepted_key: i64,
    pub accepted_name: String,
    pub rank: String,
    pub family: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<Synonym>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub key: i64,
    pub name: String,
    pub status: String,
}

/// Head of one accepted group: either a real accepted record or a placeholder
/// synthesized from a synonym's view of its accepted taxon.
struct AcceptedHead<'a> {
    key: i64,
    name: &'a str,
    rank: &'a str,
    family: &'a str,
}

/// Group `results` by accepted taxon, attaching synonyms to their accepted name.
///
/// Output order is the order in which accepted groups are first seen: accepted
/// records in input order, followed by placeholders for synonyms whose accepted
/// record was not part of the page. Records that are neither accepted nor a
/// synonym (e.g. DOUBTFUL) are dropped.
pub fn map_and_group(results: &[Taxon]) -> Vec<TaxonSuggestion> {
    if results.is_empty() {
        return Vec::new();
    }

    let mut heads: Vec<AcceptedHead<'_>> = Vec::new();
    let mut head_index: HashMap<i64, usize> = HashMap::new();
    let mut synonyms_by_accepted: HashMap<i64, Vec<Synonym>> = HashMap::new();

    for taxon in results {
        let accepted_key = taxon.effective_accepted_key();
        if taxon.is_accepted() {
            // First accepted record for a key wins.
            head_index.entry(accepted_key).or_insert_with(|| {
                heads.push(AcceptedHead {
                    key: accepted_key,
                    name: taxon.display_name(),
                    rank: &taxon.rank,
                    family: &taxon.family,
                });
                heads.len() - 1
            });
        } else if taxon.is_synonym() {
            synonyms_by_accepted
                .entry(accepted_key)
                .or_default()
                .push(Synonym {
                    key: taxon.key,
                    name: taxon.display_name().to_string(),
                    status: taxon.taxonomic_status.clone(),
                });
        }
    }

    for taxon in results {
        if taxon.is_synonym() && taxon.accepted_key > 0 {
            head_index.entry(taxon.accepted_key).or_insert_with(|| {
                heads.push(AcceptedHead {
                    key: taxon.accepted_key,
                    name: &taxon.accepted,
                    rank: &taxon.rank,
                    family: &taxon.family,
                });
                heads.len() - 1
            });
        }
    }

    heads
        .into_iter()
        .map(|head| TaxonSuggestion {
            accepted_key: head.key,
            accepted_name: head.name.to_string(),
            rank: head.rank.to_string(),
            family: head.family.to_string(),
            synonyms: synonyms_by_accepted.remove(&head.key).unwrap_or_default(),
        })
        .collect()
}
