//! Market metrics over stored listing observations.
//!
//! Pure math lives in [`trend`], [`floors`], [`series`], and
//! [`dispersion`]; [`engine::MetricsEngine`] wires those to the
//! repository traits and is the surface callers use.

pub mod dispersion;
pub mod engine;
pub mod floors;
pub mod series;
pub mod trend;

pub use dispersion::{DispersionCalculator, DispersionReport, GroupDispersion, OutlierSale};
pub use engine::{
    ActivityRow, ItemMetrics, MetricsEngine, OverviewRow, SeriesScope, SpreadQuote,
    TreatmentRollup,
};
pub use floors::{FloorGrouping, FloorStats};
pub use series::{Interval, SeriesPoint, TimeSeriesBuilder};
