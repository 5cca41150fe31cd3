//! Corrective passes over stored observations.
//!
//! Both passes are explicit: an audit report never mutates anything by
//! itself, and the relabel sweep supports a dry run for the same reason.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use market_core::{ObservationId, Period, Result};
use market_matching::TreatmentClassifier;
use market_store::{CatalogRepo, ObservationQuery, ObservationRepo};

use crate::scan::AuditReport;

/// What to do with the observations an audit scan flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectiveAction {
    /// Remove the flagged observations outright.
    Delete,
    /// Re-point each flagged observation at the item that claimed it.
    Reassign,
}

/// Tally of one corrective pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSummary {
    pub findings: usize,
    pub applied: usize,
    /// Rows that disappeared between detection and action.
    pub missing: usize,
}

/// Apply `action` to every finding in `report`. An observation flagged
/// by several pairs is acted on once, for its first finding.
pub fn apply(
    report: &AuditReport,
    action: CorrectiveAction,
    observations: &dyn ObservationRepo,
) -> Result<AppliedSummary> {
    let mut summary = AppliedSummary { findings: report.findings.len(), ..Default::default() };
    let mut seen: BTreeSet<ObservationId> = BTreeSet::new();
    for finding in &report.findings {
        if !seen.insert(finding.observation_id) {
            continue;
        }
        let applied = match action {
            CorrectiveAction::Delete => observations.delete(finding.observation_id)?,
            CorrectiveAction::Reassign => {
                observations.reassign(finding.observation_id, finding.item_b_id)?
            }
        };
        if applied {
            summary.applied += 1;
        } else {
            summary.missing += 1;
        }
    }
    info!(action = ?action, applied = summary.applied, missing = summary.missing, "corrective pass finished");
    Ok(summary)
}

/// Tally of a treatment relabel sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelabelSummary {
    pub checked: usize,
    /// Rows relabeled, or that would be under `dry_run`.
    pub updated: usize,
    pub dry_run: bool,
}

/// Re-run the classifier over every stored observation using its item's
/// current product kind, and relabel rows whose stored treatment drifted.
/// Platform coercions are re-applied so a digital-marketplace row keeps
/// its label.
pub fn relabel_treatments(
    catalog: &dyn CatalogRepo,
    observations: &dyn ObservationRepo,
    classifier: &TreatmentClassifier,
    dry_run: bool,
) -> Result<RelabelSummary> {
    let mut summary = RelabelSummary { dry_run, ..Default::default() };
    for item in catalog.all()? {
        let rows = observations.query(&ObservationQuery::for_item(item.id, Period::All))?;
        for obs in rows {
            summary.checked += 1;
            let detected =
                classifier.detect_for_platform(&obs.title, item.product, &obs.platform);
            if detected == obs.treatment {
                continue;
            }
            debug!(
                observation = obs.id,
                from = obs.treatment.label(),
                to = detected.label(),
                "treatment drift"
            );
            if dry_run {
                summary.updated += 1;
            } else if observations.relabel(obs.id, detected)? {
                summary.updated += 1;
            }
        }
    }
    info!(
        checked = summary.checked,
        updated = summary.updated,
        dry_run, "relabel sweep finished"
    );
    Ok(summary)
}
