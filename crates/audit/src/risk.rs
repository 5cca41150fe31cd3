//! Risk-pair detection over catalog item names.
//!
//! A risk pair is two items whose names overlap enough that listings
//! could plausibly cross-match. Detection here deliberately trades
//! precision for recall; acting on a pair is a separate, explicit step.

use serde::{Deserialize, Serialize};

use market_core::config::AuditConfig;
use market_core::{CatalogItem, ItemId};
use market_matching::tokens::{jaccard, token_set};

/// Two catalog items whose names could claim each other's listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPair {
    pub item_a_id: ItemId,
    pub item_b_id: ItemId,
    pub shared_tokens: usize,
    pub jaccard: f64,
    /// One name's token set contains the other's.
    pub subset: bool,
}

/// All unordered item pairs meeting the risk criteria: at least
/// `min_shared_tokens` shared tokens, and either a jaccard overlap
/// strictly above `jaccard_threshold` or one name contained in the
/// other (when `flag_subset_names` is set).
pub fn find_risk_pairs(items: &[CatalogItem], config: &AuditConfig) -> Vec<RiskPair> {
    let tokens: Vec<_> = items.iter().map(|item| token_set(&item.name)).collect();
    let mut pairs = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let shared = tokens[i].intersection(&tokens[j]).count();
            if shared < config.min_shared_tokens.max(1) {
                continue;
            }
            let ratio = jaccard(&tokens[i], &tokens[j]);
            let subset = tokens[i].is_subset(&tokens[j]) || tokens[j].is_subset(&tokens[i]);
            if ratio > config.jaccard_threshold || (config.flag_subset_names && subset) {
                pairs.push(RiskPair {
                    item_a_id: items[i].id,
                    item_b_id: items[j].id,
                    shared_tokens: shared,
                    jaccard: ratio,
                    subset,
                });
            }
        }
    }
    pairs
}
