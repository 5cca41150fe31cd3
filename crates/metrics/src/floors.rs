//! Floor-price breakdowns over grouped sold observations.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use market_core::{CatalogItem, ItemId, Observation, Price};

/// How sold observations are grouped for a floor breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorGrouping {
    Rarity,
    Treatment,
    /// Rarity and treatment combined, keyed `"{Rarity}_{Treatment}"`.
    Combination,
}

/// Floor statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorStats {
    /// Minimum sold price in the group.
    pub floor: f64,
    pub count: u32,
    pub avg: f64,
}

#[derive(Debug)]
struct GroupAcc {
    min: Price,
    sum: f64,
    count: u32,
}

impl GroupAcc {
    fn new(price: f64) -> Self {
        Self { min: OrderedFloat(price), sum: price, count: 1 }
    }

    fn add(&mut self, price: f64) {
        self.min = self.min.min(OrderedFloat(price));
        self.sum += price;
        self.count += 1;
    }

    fn to_stats(&self) -> FloorStats {
        FloorStats { floor: self.min.into_inner(), count: self.count, avg: self.sum / self.count as f64 }
    }
}

/// Group key for one observation, `None` when the observation cannot
/// participate in the grouping (unknown rarity, unclassified treatment).
fn group_key(
    obs: &Observation,
    item: &CatalogItem,
    grouping: FloorGrouping,
) -> Option<String> {
    match grouping {
        FloorGrouping::Rarity => item.rarity.map(|r| r.label().to_string()),
        FloorGrouping::Treatment => obs
            .treatment
            .is_classified()
            .then(|| obs.treatment.label().to_string()),
        FloorGrouping::Combination => {
            let rarity = item.rarity?;
            if !obs.treatment.is_classified() {
                return None;
            }
            Some(format!("{}_{}", rarity.label(), obs.treatment.label()))
        }
    }
}

/// Build a floor breakdown from sold observations.
///
/// Groups with fewer than `min_sales` observations are dropped. Callers
/// pass sold rows only; non-positive prices are skipped here as well.
pub fn floor_breakdown(
    observations: &[Observation],
    items: &BTreeMap<ItemId, CatalogItem>,
    grouping: FloorGrouping,
    min_sales: u32,
) -> BTreeMap<String, FloorStats> {
    let mut groups: BTreeMap<String, GroupAcc> = BTreeMap::new();
    for obs in observations {
        if !obs.is_sold() || obs.price <= 0.0 {
            continue;
        }
        let Some(item) = items.get(&obs.item_id) else {
            continue;
        };
        let Some(key) = group_key(obs, item, grouping) else {
            continue;
        };
        groups
            .entry(key)
            .and_modify(|acc| acc.add(obs.price))
            .or_insert_with(|| GroupAcc::new(obs.price));
    }

    let threshold = min_sales.max(1);
    groups
        .into_iter()
        .filter(|(_, acc)| acc.count >= threshold)
        .map(|(key, acc)| (key, acc.to_stats()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_core::{ListingKind, ProductKind, Rarity, Treatment};

    fn make_item(id: ItemId, rarity: Option<Rarity>) -> CatalogItem {
        CatalogItem {
            id,
            name: format!("card {id}"),
            product: ProductKind::Single,
            rarity,
            set_name: None,
        }
    }

    fn make_sold(id: u64, item_id: ItemId, price: f64, treatment: Treatment) -> Observation {
        Observation {
            id,
            item_id,
            title: format!("card {item_id} sale"),
            price,
            kind: ListingKind::Sold,
            observed_at: Utc::now(),
            treatment,
            platform: "ebay".to_string(),
            url: None,
        }
    }

    fn scenario() -> (Vec<Observation>, BTreeMap<ItemId, CatalogItem>) {
        let mut items = BTreeMap::new();
        items.insert(1, make_item(1, Some(Rarity::Common)));

        let mut obs = Vec::new();
        let mut id = 0;
        for price in [1.0, 1.5, 2.0, 2.5, 3.0] {
            id += 1;
            obs.push(make_sold(id, 1, price, Treatment::ClassicPaper));
        }
        for price in [5.0, 6.0, 7.0] {
            id += 1;
            obs.push(make_sold(id, 1, price, Treatment::ClassicFoil));
        }
        // An active ask below every sold price must never set a floor.
        let mut ask = make_sold(id + 1, 1, 0.99, Treatment::ClassicPaper);
        ask.kind = ListingKind::ActiveAsk;
        obs.push(ask);

        (obs, items)
    }

    #[test]
    fn test_treatment_floors() {
        let (obs, items) = scenario();
        let floors = floor_breakdown(&obs, &items, FloorGrouping::Treatment, 3);
        assert_eq!(floors.len(), 2);

        let paper = &floors["Classic Paper"];
        assert!((paper.floor - 1.0).abs() < 1e-10);
        assert_eq!(paper.count, 5);
        assert!((paper.avg - 2.0).abs() < 1e-10);

        let foil = &floors["Classic Foil"];
        assert!((foil.floor - 5.0).abs() < 1e-10);
        assert_eq!(foil.count, 3);
        assert!((foil.avg - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_min_sales_drops_thin_groups() {
        let (obs, items) = scenario();
        let floors = floor_breakdown(&obs, &items, FloorGrouping::Treatment, 4);
        assert!(floors.contains_key("Classic Paper"));
        assert!(!floors.contains_key("Classic Foil"));
    }

    #[test]
    fn test_rarity_grouping_pools_treatments() {
        let (obs, items) = scenario();
        let floors = floor_breakdown(&obs, &items, FloorGrouping::Rarity, 1);
        let common = &floors["Common"];
        assert_eq!(common.count, 8);
        assert!((common.floor - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_combination_key_format() {
        let (obs, items) = scenario();
        let floors = floor_breakdown(&obs, &items, FloorGrouping::Combination, 1);
        assert!(floors.contains_key("Common_Classic Paper"));
        assert!(floors.contains_key("Common_Classic Foil"));
    }

    #[test]
    fn test_unclassified_and_unknown_rows_are_skipped() {
        let mut items = BTreeMap::new();
        items.insert(1, make_item(1, None));
        let obs = vec![
            make_sold(1, 1, 2.0, Treatment::Unclassified),
            make_sold(2, 1, 3.0, Treatment::ClassicPaper),
            make_sold(3, 99, 4.0, Treatment::ClassicPaper), // not in catalog
        ];

        let by_treatment = floor_breakdown(&obs, &items, FloorGrouping::Treatment, 1);
        assert_eq!(by_treatment["Classic Paper"].count, 1);
        assert!(!by_treatment.contains_key("Unclassified"));

        // Item 1 has no rarity, item 99 is unknown: nothing groups.
        let by_rarity = floor_breakdown(&obs, &items, FloorGrouping::Rarity, 1);
        assert!(by_rarity.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let floors = floor_breakdown(&[], &BTreeMap::new(), FloorGrouping::Treatment, 3);
        assert!(floors.is_empty());
    }
}
