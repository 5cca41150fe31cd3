//! Configuration structures for the listing-market engine.
//!
//! Every threshold the matching, audit, ingest, and metrics code relies on
//! lives here as a named field with an explicit default, so nothing is a
//! magic number at the call site.

use serde::{Deserialize, Serialize};

/// Main configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listing matcher configuration.
    pub matcher: MatcherConfig,
    /// Conflict auditor configuration.
    pub audit: AuditConfig,
    /// Scrape/ingest pipeline configuration.
    pub ingest: IngestConfig,
    /// Metrics engine configuration.
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            audit: AuditConfig::default(),
            ingest: IngestConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Listing matcher thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum shared tokens between title and target name.
    pub min_shared_tokens: usize,
    /// Accept when |intersection| / |union| reaches this ratio.
    pub overlap_threshold: f64,
    /// Accept when every target token appears in the title.
    pub accept_token_subset: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_shared_tokens: 1,
            overlap_threshold: 0.5,
            accept_token_subset: true,
        }
    }
}

/// Conflict auditor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Minimum shared tokens for a pair to be considered at all.
    pub min_shared_tokens: usize,
    /// Jaccard ratio above which a pair is a risk pair.
    pub jaccard_threshold: f64,
    /// Treat one name's token set being a subset of the other as risky.
    pub flag_subset_names: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            min_shared_tokens: 1,
            jaccard_threshold: 0.5,
            flag_subset_names: true,
        }
    }
}

/// Scrape/ingest pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Parallel scrape workers.
    pub workers: usize,
    /// Per-item scrape timeout in seconds.
    pub task_timeout_secs: u64,
    /// Skip items whose latest snapshot is younger than this.
    pub snapshot_max_age_hours: i64,
    /// Maximum items per run (0 = unlimited).
    pub batch_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            task_timeout_secs: 120,
            snapshot_max_age_hours: 24,
            batch_limit: 0,
        }
    }
}

/// Metrics engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Default minimum sales per group in floor breakdowns.
    pub default_min_sales: u32,
    /// Dispersion report configuration.
    pub dispersion: DispersionConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { default_min_sales: 3, dispersion: DispersionConfig::default() }
    }
}

/// Pricing dispersion report thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispersionConfig {
    /// Minimum sold observations per (item, treatment) group.
    pub min_sales: u32,
    /// |price - median| / median at or above this flags an outlier sale.
    pub outlier_deviation: f64,
    /// Spread percentage counted as a wide group.
    pub wide_spread_pct: f64,
    /// Spread percentage counted as an extreme group.
    pub extreme_spread_pct: f64,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            min_sales: 3,
            outlier_deviation: 0.5,
            wide_spread_pct: 50.0,
            extreme_spread_pct: 100.0,
        }
    }
}
