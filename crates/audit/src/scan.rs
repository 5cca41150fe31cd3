//! Cross-contamination scan over stored observations.
//!
//! For every risk pair, looks through each item's observations for the
//! other item's distinguishing tokens. Detection is read-only; acting on
//! a report happens in [`crate::maintenance`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use market_core::config::AuditConfig;
use market_core::{CatalogItem, ItemId, ObservationId, Period, Result};
use market_matching::tokens::{contains_word, token_set, words};
use market_store::{CatalogRepo, ObservationQuery, ObservationRepo};

use crate::risk::find_risk_pairs;

/// One observation suspected of belonging to the other item of a risk
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    /// Item the observation is currently assigned to.
    pub item_a_id: ItemId,
    /// Item whose distinguishing tokens appear in the title.
    pub item_b_id: ItemId,
    pub observation_id: ObservationId,
    /// First of the claiming item's unique tokens found in the title.
    pub suspect_token: String,
    pub title: String,
}

/// Outcome of one detection scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
    pub pairs_checked: usize,
    /// Observation rows examined, summed over all pair directions.
    pub observations_scanned: usize,
}

/// Finds stored observations that look mis-assigned.
///
/// The scan is looser than the matcher on purpose: a single foreign
/// token flags a row, where the matcher demands every unique token. A
/// human (or an explicit corrective pass) decides what happens next.
pub struct ConflictAuditor {
    config: AuditConfig,
}

impl ConflictAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Scan both directions of every risk pair. Read-only.
    pub fn scan(
        &self,
        catalog: &dyn CatalogRepo,
        observations: &dyn ObservationRepo,
    ) -> Result<AuditReport> {
        let items = catalog.all()?;
        let pairs = find_risk_pairs(&items, &self.config);
        let mut report = AuditReport { pairs_checked: pairs.len(), ..AuditReport::default() };
        for pair in &pairs {
            scan_direction(pair.item_a_id, pair.item_b_id, &items, observations, &mut report)?;
            scan_direction(pair.item_b_id, pair.item_a_id, &items, observations, &mut report)?;
        }
        info!(
            pairs = report.pairs_checked,
            findings = report.findings.len(),
            "conflict scan finished"
        );
        Ok(report)
    }
}

/// Scan `owner`'s observations for tokens unique to `claimer`. At most
/// one finding per observation; the first foreign token wins.
fn scan_direction(
    owner_id: ItemId,
    claimer_id: ItemId,
    items: &[CatalogItem],
    observations: &dyn ObservationRepo,
    report: &mut AuditReport,
) -> Result<()> {
    let (Some(owner), Some(claimer)) = (
        items.iter().find(|i| i.id == owner_id),
        items.iter().find(|i| i.id == claimer_id),
    ) else {
        return Ok(());
    };
    let owner_tokens = token_set(&owner.name);
    let unique: Vec<String> =
        token_set(&claimer.name).difference(&owner_tokens).cloned().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let rows = observations.query(&ObservationQuery::for_item(owner_id, Period::All))?;
    report.observations_scanned += rows.len();
    for obs in rows {
        let title_words = words(&obs.title);
        if let Some(token) = unique.iter().find(|t| contains_word(&title_words, t)) {
            debug!(
                observation = obs.id,
                owner = %owner.name,
                claimer = %claimer.name,
                token = %token,
                "suspect observation"
            );
            report.findings.push(AuditFinding {
                item_a_id: owner_id,
                item_b_id: claimer_id,
                observation_id: obs.id,
                suspect_token: token.clone(),
                title: obs.title,
            });
        }
    }
    Ok(())
}
