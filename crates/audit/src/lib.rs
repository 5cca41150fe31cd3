//! Catalog hygiene: risk-pair detection, cross-contamination scans, and
//! explicit corrective passes.
//!
//! Everything here is two-phase. [`scan::ConflictAuditor`] only reports;
//! [`maintenance::apply`] and [`maintenance::relabel_treatments`] change
//! stored rows, and only when asked.

pub mod maintenance;
pub mod risk;
pub mod scan;

pub use maintenance::{apply, relabel_treatments, AppliedSummary, CorrectiveAction, RelabelSummary};
pub use risk::{find_risk_pairs, RiskPair};
pub use scan::{AuditFinding, AuditReport, ConflictAuditor};
