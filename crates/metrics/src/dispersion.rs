//! Price-dispersion analysis: how scattered sold prices are within one
//! item-and-treatment group, and which individual sales sit far from
//! the group median.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

use market_core::config::DispersionConfig;
use market_core::{CatalogItem, ItemId, Observation, ObservationId, Treatment};

/// Which side of the group median an outlier sale landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierDirection {
    Overpaid,
    Underpaid,
}

/// One sale whose price deviates from the group median by at least the
/// configured fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSale {
    pub observation_id: ObservationId,
    pub price: f64,
    /// `|price - median| / median`.
    pub deviation: f64,
    pub direction: OutlierDirection,
}

/// Dispersion statistics for one item-and-treatment group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDispersion {
    pub item_id: ItemId,
    pub item_name: String,
    pub treatment: Treatment,
    pub count: u32,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub std_dev: f64,
    /// `(max - min) / avg * 100`.
    pub spread_pct: f64,
    pub outliers: Vec<OutlierSale>,
}

/// Aggregate dispersion report, groups sorted widest spread first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispersionReport {
    pub groups: Vec<GroupDispersion>,
    pub groups_analyzed: u32,
    /// Groups whose spread exceeds the wide threshold, extreme included.
    pub wide_groups: u32,
    pub extreme_groups: u32,
    pub avg_spread_pct: f64,
    pub max_spread_pct: f64,
    /// Total outlier sales across all groups.
    pub outlier_sales: u32,
}

#[derive(Debug)]
struct GroupAcc {
    item_id: ItemId,
    item_name: String,
    treatment: Treatment,
    sales: Vec<(ObservationId, f64)>,
}

/// Computes dispersion over sold observations grouped by item and
/// classified treatment.
#[derive(Debug, Clone)]
pub struct DispersionCalculator {
    config: DispersionConfig,
}

impl DispersionCalculator {
    pub fn new(config: DispersionConfig) -> Self {
        Self { config }
    }

    pub fn calculate(
        &self,
        observations: &[Observation],
        items: &BTreeMap<ItemId, CatalogItem>,
    ) -> DispersionReport {
        let mut groups: BTreeMap<(ItemId, &'static str), GroupAcc> = BTreeMap::new();
        for obs in observations {
            if !obs.is_sold() || obs.price <= 0.0 || !obs.treatment.is_classified() {
                continue;
            }
            let Some(item) = items.get(&obs.item_id) else {
                continue;
            };
            groups
                .entry((obs.item_id, obs.treatment.label()))
                .or_insert_with(|| GroupAcc {
                    item_id: obs.item_id,
                    item_name: item.name.clone(),
                    treatment: obs.treatment,
                    sales: Vec::new(),
                })
                .sales
                .push((obs.id, obs.price));
        }

        let min_sales = self.config.min_sales.max(1) as usize;
        let mut analyzed: Vec<GroupDispersion> = groups
            .into_values()
            .filter(|acc| acc.sales.len() >= min_sales)
            .map(|acc| self.analyze_group(acc))
            .collect();
        analyzed.sort_by(|a, b| {
            b.spread_pct
                .partial_cmp(&a.spread_pct)
                .unwrap_or(Ordering::Equal)
        });

        let mut report = DispersionReport {
            groups_analyzed: analyzed.len() as u32,
            ..DispersionReport::default()
        };
        for group in &analyzed {
            if group.spread_pct >= self.config.wide_spread_pct {
                report.wide_groups += 1;
            }
            if group.spread_pct >= self.config.extreme_spread_pct {
                report.extreme_groups += 1;
            }
            report.avg_spread_pct += group.spread_pct;
            report.max_spread_pct = report.max_spread_pct.max(group.spread_pct);
            report.outlier_sales += group.outliers.len() as u32;
        }
        if !analyzed.is_empty() {
            report.avg_spread_pct /= analyzed.len() as f64;
        }
        report.groups = analyzed;
        report
    }

    fn analyze_group(&self, acc: GroupAcc) -> GroupDispersion {
        let prices: Vec<f64> = acc.sales.iter().map(|(_, p)| *p).collect();
        let count = prices.len() as u32;
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        let median = Data::new(prices.clone()).median();
        let std_dev = if prices.len() > 1 {
            prices.iter().std_dev()
        } else {
            0.0
        };
        let spread_pct = if avg > 0.0 { (max - min) / avg * 100.0 } else { 0.0 };

        let mut outliers = Vec::new();
        if median > 0.0 {
            for (id, price) in &acc.sales {
                let deviation = (price - median).abs() / median;
                if deviation >= self.config.outlier_deviation {
                    outliers.push(OutlierSale {
                        observation_id: *id,
                        price: *price,
                        deviation,
                        direction: if *price > median {
                            OutlierDirection::Overpaid
                        } else {
                            OutlierDirection::Underpaid
                        },
                    });
                }
            }
        }

        GroupDispersion {
            item_id: acc.item_id,
            item_name: acc.item_name,
            treatment: acc.treatment,
            count,
            min,
            max,
            avg,
            median,
            std_dev,
            spread_pct,
            outliers,
        }
    }
}
