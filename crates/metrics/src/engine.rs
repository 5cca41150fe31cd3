//! Read-side metrics facade over the repository traits.
//!
//! Every query here answers `None` or an empty collection when the data
//! is missing; `Err` is reserved for repository failures. Sold
//! observations arrive sorted ascending by timestamp from the store,
//! which is what the trend math expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use market_core::config::MetricsConfig;
use market_core::{
    CatalogItem, ItemId, Period, ProductKind, Result, Snapshot, TimestampUtc, Treatment,
};
use market_store::{CatalogRepo, ObservationQuery, ObservationRepo, SnapshotRepo};

use crate::dispersion::{DispersionCalculator, DispersionReport};
use crate::floors::{floor_breakdown, FloorGrouping, FloorStats};
use crate::series::{Interval, SeriesPoint, TimeSeriesBuilder};
use crate::trend::{delta_of, ema_of, vwap_of, EMA_WINDOWS};

/// Live bid/ask quote derived from an item's latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadQuote {
    pub lowest_ask: f64,
    /// Quoted as 0 when the snapshot carries no bid.
    pub highest_bid: f64,
    pub spread_amount: f64,
    pub spread_percent: f64,
}

/// Per-item metric bundle. Each field degrades to `None` on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetrics {
    pub item_id: ItemId,
    pub vwap: Option<f64>,
    pub ema_7d: Option<f64>,
    pub ema_14d: Option<f64>,
    pub ema_30d: Option<f64>,
    pub price_delta_1d: Option<f64>,
    pub price_delta_7d: Option<f64>,
    pub price_delta_30d: Option<f64>,
    pub bid_ask_spread: Option<SpreadQuote>,
    pub price_to_sale: Option<f64>,
}

/// One row of the catalog overview, sorted most-traded first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    pub item_id: ItemId,
    pub name: String,
    pub vwap: f64,
    pub volume: u32,
}

/// One recently sold observation with its catalog context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub item_id: ItemId,
    pub item_name: String,
    pub price: f64,
    pub treatment: Treatment,
    pub observed_at: TimestampUtc,
}

/// Sold-price rollup for one classified treatment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRollup {
    pub min_price: f64,
    pub count: u32,
}

/// What a time series ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesScope {
    Item(ItemId),
    Product(ProductKind),
}

/// Quote from one snapshot. An ask is required; a missing bid quotes as 0.
fn spread_from_snapshot(snapshot: &Snapshot) -> Option<SpreadQuote> {
    let ask = snapshot.lowest_ask.filter(|a| *a > 0.0)?;
    let bid = snapshot.highest_bid.unwrap_or(0.0);
    let amount = ask - bid;
    Some(SpreadQuote {
        lowest_ask: ask,
        highest_bid: bid,
        spread_amount: amount,
        spread_percent: amount / ask * 100.0,
    })
}

pub struct MetricsEngine<'a> {
    catalog: &'a dyn CatalogRepo,
    observations: &'a dyn ObservationRepo,
    snapshots: &'a dyn SnapshotRepo,
    config: MetricsConfig,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(
        catalog: &'a dyn CatalogRepo,
        observations: &'a dyn ObservationRepo,
        snapshots: &'a dyn SnapshotRepo,
        config: MetricsConfig,
    ) -> Self {
        Self { catalog, observations, snapshots, config }
    }

    /// Positive sold prices for one item, ascending by timestamp.
    fn sold_prices(&self, item_id: ItemId, period: Period) -> Result<Vec<f64>> {
        let rows = self.observations.query(&ObservationQuery::sold(item_id, period))?;
        Ok(rows.iter().filter(|o| o.price > 0.0).map(|o| o.price).collect())
    }

    /// Catalog items keyed by id, optionally narrowed to one product kind.
    fn items_by_id(&self, product: Option<ProductKind>) -> Result<BTreeMap<ItemId, CatalogItem>> {
        Ok(self
            .catalog
            .all()?
            .into_iter()
            .filter(|item| product.map_or(true, |p| item.product == p))
            .map(|item| (item.id, item))
            .collect())
    }

    pub fn vwap(&self, item_id: ItemId, period: Period) -> Result<Option<f64>> {
        Ok(vwap_of(&self.sold_prices(item_id, period)?))
    }

    pub fn ema(&self, item_id: ItemId, period: Period, window: u32) -> Result<Option<f64>> {
        Ok(ema_of(&self.sold_prices(item_id, period)?, window))
    }

    /// Percentage change earliest to latest sale within the period.
    pub fn price_delta(&self, item_id: ItemId, period: Period) -> Result<Option<f64>> {
        Ok(delta_of(&self.sold_prices(item_id, period)?))
    }

    pub fn bid_ask_spread(&self, item_id: ItemId) -> Result<Option<SpreadQuote>> {
        Ok(self.snapshots.latest(item_id)?.as_ref().and_then(spread_from_snapshot))
    }

    /// Latest ask divided by period VWAP. Above 1 means asks sit over
    /// recent realized prices.
    pub fn price_to_sale(&self, item_id: ItemId, period: Period) -> Result<Option<f64>> {
        let Some(snapshot) = self.snapshots.latest(item_id)? else {
            return Ok(None);
        };
        let Some(ask) = snapshot.lowest_ask.filter(|a| *a > 0.0) else {
            return Ok(None);
        };
        match self.vwap(item_id, period)? {
            Some(vwap) if vwap > 0.0 => Ok(Some(ask / vwap)),
            _ => Ok(None),
        }
    }

    /// Floor breakdown over the whole catalog, optionally narrowed to one
    /// product kind. `min_sales` defaults from the config.
    pub fn floor_by(
        &self,
        grouping: FloorGrouping,
        period: Period,
        product: Option<ProductKind>,
        min_sales: Option<u32>,
    ) -> Result<BTreeMap<String, FloorStats>> {
        let items = self.items_by_id(product)?;
        let sold = self.observations.query(&ObservationQuery::sold_anywhere(period))?;
        let min_sales = min_sales.unwrap_or(self.config.default_min_sales);
        debug!(
            groups = items.len(),
            observations = sold.len(),
            min_sales,
            "building floor breakdown"
        );
        Ok(floor_breakdown(&sold, &items, grouping, min_sales))
    }

    pub fn time_series(
        &self,
        scope: SeriesScope,
        interval: Interval,
        period: Period,
    ) -> Result<Vec<SeriesPoint>> {
        let sold = match scope {
            SeriesScope::Item(item_id) => {
                self.observations.query(&ObservationQuery::sold(item_id, period))?
            }
            SeriesScope::Product(product) => {
                let items = self.items_by_id(Some(product))?;
                self.observations
                    .query(&ObservationQuery::sold_anywhere(period))?
                    .into_iter()
                    .filter(|o| items.contains_key(&o.item_id))
                    .collect()
            }
        };
        let mut builder = TimeSeriesBuilder::new(interval);
        for obs in &sold {
            builder.add(obs.observed_at, obs.price);
        }
        Ok(builder.build())
    }

    /// The full bundle for one item. Deltas always use the fixed 1d/7d/30d
    /// windows; VWAP, EMAs, and price-to-sale honor the requested period.
    pub fn comprehensive(&self, item_id: ItemId, period: Period) -> Result<ItemMetrics> {
        debug!(item_id, period = period.as_str(), "computing metric bundle");
        let prices = self.sold_prices(item_id, period)?;
        Ok(ItemMetrics {
            item_id,
            vwap: vwap_of(&prices),
            ema_7d: ema_of(&prices, EMA_WINDOWS[0]),
            ema_14d: ema_of(&prices, EMA_WINDOWS[1]),
            ema_30d: ema_of(&prices, EMA_WINDOWS[2]),
            price_delta_1d: self.price_delta(item_id, Period::D1)?,
            price_delta_7d: self.price_delta(item_id, Period::D7)?,
            price_delta_30d: self.price_delta(item_id, Period::D30)?,
            bid_ask_spread: self.bid_ask_spread(item_id)?,
            price_to_sale: self.price_to_sale(item_id, period)?,
        })
    }

    /// Items with sold activity in the period, most volume first, ties by
    /// name.
    pub fn overview(&self, period: Period) -> Result<Vec<OverviewRow>> {
        let items = self.items_by_id(None)?;
        let sold = self.observations.query(&ObservationQuery::sold_anywhere(period))?;
        let mut acc: BTreeMap<ItemId, (f64, u32)> = BTreeMap::new();
        for obs in &sold {
            if obs.price <= 0.0 {
                continue;
            }
            let entry = acc.entry(obs.item_id).or_insert((0.0, 0));
            entry.0 += obs.price;
            entry.1 += 1;
        }
        let mut rows: Vec<OverviewRow> = acc
            .into_iter()
            .filter_map(|(item_id, (sum, volume))| {
                items.get(&item_id).map(|item| OverviewRow {
                    item_id,
                    name: item.name.clone(),
                    vwap: sum / f64::from(volume),
                    volume,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.volume.cmp(&a.volume).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    /// Latest sales across the catalog, newest first.
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityRow>> {
        let items = self.items_by_id(None)?;
        let mut sold = self.observations.query(&ObservationQuery::sold_anywhere(Period::All))?;
        sold.reverse();
        Ok(sold
            .into_iter()
            .filter_map(|obs| {
                items.get(&obs.item_id).map(|item| ActivityRow {
                    item_id: obs.item_id,
                    item_name: item.name.clone(),
                    price: obs.price,
                    treatment: obs.treatment,
                    observed_at: obs.observed_at,
                })
            })
            .take(limit)
            .collect())
    }

    /// Min sold price and count per classified treatment, keyed by label.
    pub fn treatment_rollup(&self, period: Period) -> Result<BTreeMap<String, TreatmentRollup>> {
        let sold = self.observations.query(&ObservationQuery::sold_anywhere(period))?;
        let mut rollup: BTreeMap<String, TreatmentRollup> = BTreeMap::new();
        for obs in &sold {
            if obs.price <= 0.0 || !obs.treatment.is_classified() {
                continue;
            }
            rollup
                .entry(obs.treatment.label().to_string())
                .and_modify(|r| {
                    r.min_price = r.min_price.min(obs.price);
                    r.count += 1;
                })
                .or_insert(TreatmentRollup { min_price: obs.price, count: 1 });
        }
        Ok(rollup)
    }

    pub fn dispersion(&self, period: Period) -> Result<DispersionReport> {
        let items = self.items_by_id(None)?;
        let sold = self.observations.query(&ObservationQuery::sold_anywhere(period))?;
        let calculator = DispersionCalculator::new(self.config.dispersion.clone());
        Ok(calculator.calculate(&sold, &items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use market_core::{ListingKind, NewObservation, Rarity};
    use market_store::MemoryStore;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_item(CatalogItem {
                id: 1,
                name: "Ethereal Grove".to_string(),
                product: ProductKind::Single,
                rarity: Some(Rarity::Common),
                set_name: None,
            })
            .unwrap();
        store
            .add_item(CatalogItem {
                id: 2,
                name: "Sandura of Heliosynth".to_string(),
                product: ProductKind::Single,
                rarity: Some(Rarity::Mythic),
                set_name: None,
            })
            .unwrap();
        store
            .add_item(CatalogItem {
                id: 3,
                name: "Wonders Booster Box".to_string(),
                product: ProductKind::Box,
                rarity: Some(Rarity::Sealed),
                set_name: None,
            })
            .unwrap();
        store
    }

    fn engine(store: &MemoryStore) -> MetricsEngine<'_> {
        MetricsEngine::new(store, store, store, MetricsConfig::default())
    }

    fn add_listing(
        store: &MemoryStore,
        item_id: ItemId,
        price: f64,
        kind: ListingKind,
        treatment: Treatment,
        hours_ago: i64,
    ) {
        store
            .append(NewObservation {
                item_id,
                title: format!("listing for item {item_id}"),
                price,
                kind,
                observed_at: Utc::now() - Duration::hours(hours_ago),
                treatment,
                platform: "ebay".to_string(),
                url: None,
            })
            .unwrap();
    }

    fn add_sold(store: &MemoryStore, item_id: ItemId, price: f64, days_ago: i64) {
        add_listing(
            store,
            item_id,
            price,
            ListingKind::Sold,
            Treatment::ClassicPaper,
            days_ago * 24,
        );
    }

    fn quote_snapshot(item_id: ItemId, ask: Option<f64>, bid: Option<f64>) -> Snapshot {
        Snapshot {
            item_id,
            min_price: 0.0,
            max_price: 0.0,
            avg_price: 0.0,
            volume: 0,
            lowest_ask: ask,
            highest_bid: bid,
            inventory: u32::from(ask.is_some()),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_vwap_single_sale_is_that_price() {
        let store = seeded();
        add_sold(&store, 1, 12.5, 1);
        let vwap = engine(&store).vwap(1, Period::All).unwrap();
        assert!((vwap.unwrap() - 12.5).abs() < 1e-10);
    }

    #[test]
    fn test_vwap_without_data_is_none() {
        let store = seeded();
        assert!(engine(&store).vwap(1, Period::All).unwrap().is_none());
        // Active listings never count toward VWAP.
        add_listing(&store, 1, 9.0, ListingKind::ActiveAsk, Treatment::ClassicPaper, 1);
        assert!(engine(&store).vwap(1, Period::All).unwrap().is_none());
    }

    #[test]
    fn test_unrecognized_period_token_behaves_as_all() {
        let store = seeded();
        add_sold(&store, 1, 10.0, 80);
        add_sold(&store, 1, 20.0, 1);
        let eng = engine(&store);
        let lenient = eng.vwap(1, Period::parse("bogus")).unwrap();
        let all = eng.vwap(1, Period::All).unwrap();
        assert_eq!(lenient, all);
        assert!((lenient.unwrap() - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_ema_requires_window_points() {
        let store = seeded();
        for day in 0..5 {
            add_sold(&store, 1, 10.0, day);
        }
        let eng = engine(&store);
        assert!(eng.ema(1, Period::All, 7).unwrap().is_none());
        assert!(eng.ema(1, Period::All, 5).unwrap().is_some());
    }

    #[test]
    fn test_delta_widens_with_period_for_monotone_prices() {
        let store = seeded();
        let days = [29, 22, 15, 6, 1];
        let prices = [10.0, 15.0, 20.0, 25.0, 30.0];
        for (days_ago, price) in days.iter().zip(prices) {
            add_sold(&store, 1, price, *days_ago);
        }
        let eng = engine(&store);
        let d7 = eng.price_delta(1, Period::D7).unwrap().unwrap();
        let d30 = eng.price_delta(1, Period::D30).unwrap().unwrap();
        assert!((d7 - 20.0).abs() < 1e-10);
        assert!((d30 - 200.0).abs() < 1e-10);
        assert!(d7.abs() <= d30.abs());
    }

    #[test]
    fn test_floor_breakdown_ignores_active_asks() {
        let store = seeded();
        for price in [1.0, 1.5, 2.0, 2.5, 3.0] {
            add_listing(&store, 1, price, ListingKind::Sold, Treatment::ClassicPaper, 2);
        }
        for price in [5.0, 6.0, 7.0] {
            add_listing(&store, 1, price, ListingKind::Sold, Treatment::ClassicFoil, 2);
        }
        add_listing(&store, 1, 0.99, ListingKind::ActiveAsk, Treatment::ClassicPaper, 1);

        let eng = engine(&store);
        let floors = eng
            .floor_by(FloorGrouping::Treatment, Period::All, None, None)
            .unwrap();
        assert!((floors["Classic Paper"].floor - 1.0).abs() < 1e-10);
        assert!((floors["Classic Foil"].floor - 5.0).abs() < 1e-10);

        // Raising min_sales to 4 drops the three-sale foil group.
        let floors = eng
            .floor_by(FloorGrouping::Treatment, Period::All, None, Some(4))
            .unwrap();
        assert!(floors.contains_key("Classic Paper"));
        assert!(!floors.contains_key("Classic Foil"));
    }

    #[test]
    fn test_floor_breakdown_product_filter() {
        let store = seeded();
        add_listing(&store, 1, 2.0, ListingKind::Sold, Treatment::ClassicPaper, 1);
        add_listing(&store, 3, 90.0, ListingKind::Sold, Treatment::Sealed, 1);

        let floors = engine(&store)
            .floor_by(FloorGrouping::Treatment, Period::All, Some(ProductKind::Box), Some(1))
            .unwrap();
        assert_eq!(floors.len(), 1);
        assert!(floors.contains_key("Sealed"));
    }

    #[test]
    fn test_bid_ask_spread_quote() {
        let store = seeded();
        store.record(quote_snapshot(1, Some(28.0), Some(24.0))).unwrap();
        let quote = engine(&store).bid_ask_spread(1).unwrap().unwrap();
        assert!((quote.spread_amount - 4.0).abs() < 1e-10);
        assert!((quote.spread_percent - 100.0 * 4.0 / 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_bid_ask_spread_missing_sides() {
        let store = seeded();
        let eng = engine(&store);
        // No snapshot at all.
        assert!(eng.bid_ask_spread(1).unwrap().is_none());

        // Ask but no bid: bid quotes as zero, spread equals the ask.
        store.record(quote_snapshot(1, Some(28.0), None)).unwrap();
        let quote = eng.bid_ask_spread(1).unwrap().unwrap();
        assert!((quote.highest_bid - 0.0).abs() < 1e-10);
        assert!((quote.spread_amount - 28.0).abs() < 1e-10);

        // Bid but no ask never quotes.
        store.record(quote_snapshot(2, None, Some(24.0))).unwrap();
        assert!(eng.bid_ask_spread(2).unwrap().is_none());
    }

    #[test]
    fn test_price_to_sale_ratio() {
        let store = seeded();
        add_sold(&store, 1, 10.0, 2);
        add_sold(&store, 1, 30.0, 1);
        store.record(quote_snapshot(1, Some(28.0), None)).unwrap();
        let ratio = engine(&store).price_to_sale(1, Period::All).unwrap().unwrap();
        assert!((ratio - 1.4).abs() < 1e-10);
    }

    #[test]
    fn test_comprehensive_bundle_fully_populated() {
        let store = seeded();
        // Two sales a day for 35 days, prices rising toward the present.
        for step in 0..70i64 {
            add_listing(
                &store,
                1,
                10.0 + 0.5 * (69 - step) as f64,
                ListingKind::Sold,
                Treatment::ClassicPaper,
                step * 12,
            );
        }
        store.record(quote_snapshot(1, Some(28.0), Some(24.0))).unwrap();

        let bundle = engine(&store).comprehensive(1, Period::All).unwrap();
        assert!(bundle.vwap.is_some());
        assert!(bundle.ema_7d.is_some());
        assert!(bundle.ema_14d.is_some());
        assert!(bundle.ema_30d.is_some());
        assert!(bundle.price_delta_1d.is_some());
        assert!(bundle.price_delta_7d.is_some());
        assert!(bundle.price_delta_30d.is_some());
        assert!(bundle.bid_ask_spread.is_some());
        assert!(bundle.price_to_sale.is_some());
        // Rising prices show positive deltas at every window.
        assert!(bundle.price_delta_1d.unwrap() > 0.0);
        assert!(bundle.price_delta_30d.unwrap() > bundle.price_delta_7d.unwrap());
    }

    #[test]
    fn test_comprehensive_bundle_degrades_field_by_field() {
        let store = seeded();
        add_sold(&store, 1, 10.0, 1);
        let bundle = engine(&store).comprehensive(1, Period::All).unwrap();
        assert!(bundle.vwap.is_some());
        assert!(bundle.ema_7d.is_none());
        assert!(bundle.price_delta_30d.is_none());
        assert!(bundle.bid_ask_spread.is_none());
        assert!(bundle.price_to_sale.is_none());
    }

    #[test]
    fn test_product_scoped_series_pools_items() {
        let store = seeded();
        add_sold(&store, 1, 2.0, 3);
        add_sold(&store, 2, 40.0, 3);
        add_sold(&store, 3, 90.0, 3);

        let points = engine(&store)
            .time_series(SeriesScope::Product(ProductKind::Single), Interval::Day, Period::All)
            .unwrap();
        let volume: u32 = points.iter().map(|p| p.volume).sum();
        // Items 1 and 2 are singles; the box sale stays out.
        assert_eq!(volume, 2);
    }

    #[test]
    fn test_overview_sorts_by_volume_then_name() {
        let store = seeded();
        add_sold(&store, 1, 2.0, 1);
        add_sold(&store, 1, 4.0, 1);
        for _ in 0..3 {
            add_sold(&store, 2, 40.0, 1);
        }
        let rows = engine(&store).overview(Period::All).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item_id, 2);
        assert_eq!(rows[0].volume, 3);
        assert!((rows[1].vwap - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_recent_activity_newest_first() {
        let store = seeded();
        add_sold(&store, 1, 2.0, 3);
        add_sold(&store, 2, 40.0, 2);
        add_sold(&store, 1, 3.0, 1);

        let rows = engine(&store).recent_activity(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].price - 3.0).abs() < 1e-10);
        assert_eq!(rows[1].item_name, "Sandura of Heliosynth");
    }

    #[test]
    fn test_treatment_rollup() {
        let store = seeded();
        add_listing(&store, 1, 2.0, ListingKind::Sold, Treatment::ClassicPaper, 1);
        add_listing(&store, 1, 1.5, ListingKind::Sold, Treatment::ClassicPaper, 1);
        add_listing(&store, 2, 40.0, ListingKind::Sold, Treatment::ClassicFoil, 1);
        add_listing(&store, 2, 5.0, ListingKind::Sold, Treatment::Unclassified, 1);

        let rollup = engine(&store).treatment_rollup(Period::All).unwrap();
        assert_eq!(rollup.len(), 2);
        assert!((rollup["Classic Paper"].min_price - 1.5).abs() < 1e-10);
        assert_eq!(rollup["Classic Paper"].count, 2);
        assert!(!rollup.contains_key("Unclassified"));
    }

    #[test]
    fn test_dispersion_through_engine() {
        let store = seeded();
        for price in [10.0, 10.0, 20.0] {
            add_listing(&store, 1, price, ListingKind::Sold, Treatment::ClassicPaper, 1);
        }
        let report = engine(&store).dispersion(Period::All).unwrap();
        assert_eq!(report.groups_analyzed, 1);
        assert_eq!(report.outlier_sales, 1);
        assert!((report.max_spread_pct - 75.0).abs() < 1e-9);
    }
}
