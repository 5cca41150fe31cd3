//! Listing-to-item matching.
//!
//! Decides whether a scraped title belongs to a target catalog item, given
//! the names of the target's siblings. The decision is pure: same inputs,
//! same outcome, no interior state, safe to call from parallel workers.
//!
//! Pipeline, in order: tokenize, require a shared token, let a more
//! specific sibling name claim the listing away, then accept on exact
//! phrase, token subset, or overlap ratio.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use market_core::config::MatcherConfig;

use crate::tokens::{contains_phrase, contains_word, is_stop_word, token_set, words};

/// Why a title was accepted for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptBasis {
    /// Normalized target name appears verbatim in the title.
    ExactPhrase,
    /// Every target token appears somewhere in the title.
    TokenSubset,
    /// Token overlap ratio reached the configured threshold.
    Overlap,
}

/// Why a title was rejected for the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Blank title or blank target name.
    EmptyInput,
    /// Not enough shared tokens between title and target.
    NoSharedTokens,
    /// A sibling's unique tokens all appear in the title.
    SiblingClaim { sibling: String, token: String },
    /// Target and a sibling claim the title with equal specificity.
    SpecificityTie { sibling: String },
    /// Shared tokens exist but the overlap ratio is too low.
    BelowOverlap { ratio: f64 },
}

/// Outcome of one match decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Accepted(AcceptBasis),
    Rejected(RejectReason),
}

impl MatchOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, MatchOutcome::Accepted(_))
    }
}

/// Title matcher with named, configurable thresholds.
#[derive(Debug, Clone, Default)]
pub struct ListingMatcher {
    config: MatcherConfig,
}

impl ListingMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Convenience wrapper over [`evaluate`](Self::evaluate).
    pub fn is_match(&self, title: &str, target_name: &str, siblings: &[String]) -> bool {
        self.evaluate(title, target_name, siblings).is_accepted()
    }

    /// Decide whether `title` belongs to `target_name`, disambiguating
    /// against `siblings` (names of the other catalog items).
    pub fn evaluate(&self, title: &str, target_name: &str, siblings: &[String]) -> MatchOutcome {
        let title_words = words(title);
        let target_words = words(target_name);
        if title_words.is_empty() || target_words.is_empty() {
            return MatchOutcome::Rejected(RejectReason::EmptyInput);
        }

        let title_tokens: BTreeSet<String> =
            title_words.iter().filter(|w| !is_stop_word(w)).cloned().collect();
        let target_tokens: BTreeSet<String> =
            target_words.iter().filter(|w| !is_stop_word(w)).cloned().collect();

        let shared = target_tokens.intersection(&title_tokens).count();
        if shared < self.config.min_shared_tokens.max(1) {
            debug!(title, target = target_name, "rejected: no shared tokens");
            return MatchOutcome::Rejected(RejectReason::NoSharedTokens);
        }

        if let Some(reason) = self.sibling_objection(&title_words, &target_tokens, siblings) {
            return MatchOutcome::Rejected(reason);
        }

        if contains_phrase(&title_words, &target_words) {
            return MatchOutcome::Accepted(AcceptBasis::ExactPhrase);
        }
        if self.config.accept_token_subset && target_tokens.is_subset(&title_tokens) {
            return MatchOutcome::Accepted(AcceptBasis::TokenSubset);
        }

        let union = target_tokens.union(&title_tokens).count();
        let ratio = shared as f64 / union as f64;
        if ratio >= self.config.overlap_threshold {
            MatchOutcome::Accepted(AcceptBasis::Overlap)
        } else {
            debug!(title, target = target_name, ratio, "rejected: overlap below threshold");
            MatchOutcome::Rejected(RejectReason::BelowOverlap { ratio })
        }
    }

    /// Sibling disambiguation. A sibling whose unique tokens (sibling minus
    /// target) all appear as whole words in the title claims the listing,
    /// unless the target counter-claims with a strictly larger unique-token
    /// set of its own. Equal specificity is a genuine tie and rejects.
    fn sibling_objection(
        &self,
        title_words: &[String],
        target_tokens: &BTreeSet<String>,
        siblings: &[String],
    ) -> Option<RejectReason> {
        for sibling in siblings {
            let sibling_tokens = token_set(sibling);
            if sibling_tokens.intersection(target_tokens).next().is_none() {
                continue;
            }
            let unique_sibling: Vec<&String> =
                sibling_tokens.difference(target_tokens).collect();
            if unique_sibling.is_empty() {
                // Sibling's name lies inside the target's; it can never
                // disambiguate and must not veto.
                continue;
            }
            if !unique_sibling.iter().all(|t| contains_word(title_words, t)) {
                continue;
            }

            let unique_target: Vec<&String> =
                target_tokens.difference(&sibling_tokens).collect();
            let target_claims = !unique_target.is_empty()
                && unique_target.iter().all(|t| contains_word(title_words, t));
            if target_claims {
                if unique_target.len() > unique_sibling.len() {
                    // Target is the more specific name; the claim is overridden.
                    continue;
                }
                if unique_target.len() == unique_sibling.len() {
                    debug!(sibling = %sibling, "rejected: specificity tie with sibling");
                    return Some(RejectReason::SpecificityTie { sibling: sibling.clone() });
                }
            }

            let token = unique_sibling
                .first()
                .map(|t| t.to_string())
                .unwrap_or_default();
            debug!(sibling = %sibling, token = %token, "rejected: claimed by sibling");
            return Some(RejectReason::SiblingClaim { sibling: sibling.clone(), token });
        }
        None
    }
}
