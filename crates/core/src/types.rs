//! Core data types shared across the workspace: catalog records, scraped
//! listings, stored observations, market snapshots, and query periods.

use chrono::{DateTime, Duration, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Catalog item identifier.
pub type ItemId = u64;

/// Stored observation identifier, assigned by the observation repository.
pub type ObservationId = u64;

/// Price with total ordering, usable as a map key.
pub type Price = OrderedFloat<f64>;

/// UTC timestamp carried on listings, observations, and snapshots.
pub type TimestampUtc = DateTime<Utc>;

/// What kind of product a catalog item is. Sealed products use a different
/// treatment vocabulary than single cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    Single,
    Box,
    Bundle,
    Pack,
}

impl ProductKind {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            ProductKind::Single => "Single",
            ProductKind::Box => "Box",
            ProductKind::Bundle => "Bundle",
            ProductKind::Pack => "Pack",
        }
    }

    /// True for kinds sold as sealed product rather than single cards.
    #[inline]
    pub fn is_sealed_product(&self) -> bool {
        !matches!(self, ProductKind::Single)
    }
}

/// Collectibility tier assigned in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
    Mythic,
    Sealed,
}

impl Rarity {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
            Rarity::Mythic => "Mythic",
            Rarity::Sealed => "Sealed",
        }
    }
}

/// Print treatment detected from a listing title.
///
/// `Unclassified` is a sentinel for titles no rule matched; it is stored
/// as-is and skipped by treatment-grouped metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Treatment {
    #[serde(rename = "Classic Paper")]
    ClassicPaper,
    #[serde(rename = "Classic Foil")]
    ClassicFoil,
    #[serde(rename = "Formless Foil")]
    FormlessFoil,
    #[serde(rename = "OCM Serialized")]
    OcmSerialized,
    Sealed,
    Digital,
    Unclassified,
}

impl Treatment {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Treatment::ClassicPaper => "Classic Paper",
            Treatment::ClassicFoil => "Classic Foil",
            Treatment::FormlessFoil => "Formless Foil",
            Treatment::OcmSerialized => "OCM Serialized",
            Treatment::Sealed => "Sealed",
            Treatment::Digital => "Digital",
            Treatment::Unclassified => "Unclassified",
        }
    }

    #[inline]
    pub fn is_classified(&self) -> bool {
        !matches!(self, Treatment::Unclassified)
    }
}

/// Whether a listing is a completed sale or a live ask/bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingKind {
    #[serde(rename = "sold")]
    Sold,
    #[serde(rename = "active-ask")]
    ActiveAsk,
    #[serde(rename = "active-bid")]
    ActiveBid,
}

impl ListingKind {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            ListingKind::Sold => "sold",
            ListingKind::ActiveAsk => "active-ask",
            ListingKind::ActiveBid => "active-bid",
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, ListingKind::Sold)
    }
}

/// Lookback window for metric queries.
///
/// Parsing is lenient: an unrecognized token behaves as `All` so that a
/// bad query parameter degrades to the widest window instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "3d")]
    D3,
    #[serde(rename = "7d")]
    D7,
    #[serde(rename = "14d")]
    D14,
    #[serde(rename = "30d")]
    D30,
    #[serde(rename = "90d")]
    D90,
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub fn parse(token: &str) -> Period {
        match token.trim().to_lowercase().as_str() {
            "24h" => Period::H24,
            "1d" => Period::D1,
            "3d" => Period::D3,
            "7d" => Period::D7,
            "14d" => Period::D14,
            "30d" => Period::D30,
            "90d" => Period::D90,
            _ => Period::All,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::H24 => "24h",
            Period::D1 => "1d",
            Period::D3 => "3d",
            Period::D7 => "7d",
            Period::D14 => "14d",
            Period::D30 => "30d",
            Period::D90 => "90d",
            Period::All => "all",
        }
    }

    /// Earliest timestamp included in the window, `None` for `All`.
    pub fn cutoff(&self, now: TimestampUtc) -> Option<TimestampUtc> {
        let span = match self {
            Period::H24 => Duration::hours(24),
            Period::D1 => Duration::days(1),
            Period::D3 => Duration::days(3),
            Period::D7 => Duration::days(7),
            Period::D14 => Duration::days(14),
            Period::D30 => Duration::days(30),
            Period::D90 => Duration::days(90),
            Period::All => return None,
        };
        Some(now - span)
    }

    /// True when `ts` falls inside the window ending at `now`.
    #[inline]
    pub fn contains(&self, ts: TimestampUtc, now: TimestampUtc) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => ts >= cutoff,
            None => true,
        }
    }
}

/// An item in the tracked catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    /// Canonical name, the anchor for all title matching.
    pub name: String,
    pub product: ProductKind,
    pub rarity: Option<Rarity>,
    /// Set the item belongs to, appended to search queries when present.
    pub set_name: Option<String>,
}

impl CatalogItem {
    /// Query string handed to the listing source for this item.
    pub fn search_query(&self) -> String {
        match &self.set_name {
            Some(set) if !set.trim().is_empty() => format!("{} {}", self.name, set),
            _ => self.name.clone(),
        }
    }
}

/// A single listing as delivered by a scraper, before matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub price: f64,
    pub timestamp: TimestampUtc,
    pub kind: ListingKind,
    /// Marketplace tag, e.g. "ebay" or "opensea".
    pub platform: String,
    pub url: Option<String>,
}

impl RawListing {
    /// Whether the listing is well-formed enough to run through matching.
    #[inline]
    pub fn is_processable(&self) -> bool {
        !self.title.trim().is_empty() && self.price.is_finite() && self.price > 0.0
    }
}

/// An accepted listing waiting for an id from the observation repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub item_id: ItemId,
    pub title: String,
    pub price: f64,
    pub kind: ListingKind,
    pub observed_at: TimestampUtc,
    pub treatment: Treatment,
    pub platform: String,
    pub url: Option<String>,
}

impl NewObservation {
    /// Boundary validation applied before an observation is stored.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::observation("empty title"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::observation(format!(
                "non-positive price {} for item {}",
                self.price, self.item_id
            )));
        }
        Ok(())
    }

    pub fn into_observation(self, id: ObservationId) -> Observation {
        Observation {
            id,
            item_id: self.item_id,
            title: self.title,
            price: self.price,
            kind: self.kind,
            observed_at: self.observed_at,
            treatment: self.treatment,
            platform: self.platform,
            url: self.url,
        }
    }
}

/// A stored listing observation. Immutable outside the audit and relabel
/// maintenance passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub item_id: ItemId,
    pub title: String,
    pub price: f64,
    pub kind: ListingKind,
    pub observed_at: TimestampUtc,
    pub treatment: Treatment,
    pub platform: String,
    pub url: Option<String>,
}

impl Observation {
    #[inline]
    pub fn is_sold(&self) -> bool {
        self.kind == ListingKind::Sold
    }

    #[inline]
    pub fn price_key(&self) -> Price {
        OrderedFloat(self.price)
    }
}

/// Per-item market state captured at scrape time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub item_id: ItemId,
    /// Sold-price stats over the scrape's lookback; zeroed when the scrape
    /// parsed no sold listings.
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub volume: u32,
    pub lowest_ask: Option<f64>,
    pub highest_bid: Option<f64>,
    /// Count of live asks seen for the item.
    pub inventory: u32,
    pub captured_at: TimestampUtc,
}

impl Snapshot {
    /// True when the snapshot is older than `max_age_hours` as of `now`.
    #[inline]
    pub fn is_stale(&self, max_age_hours: i64, now: TimestampUtc) -> bool {
        now - self.captured_at > Duration::hours(max_age_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_observation(price: f64) -> NewObservation {
        NewObservation {
            item_id: 1,
            title: "Ethereal Grove Mythic".to_string(),
            price,
            kind: ListingKind::Sold,
            observed_at: Utc::now(),
            treatment: Treatment::ClassicPaper,
            platform: "ebay".to_string(),
            url: None,
        }
    }

    #[test]
    fn test_period_parse_known_tokens() {
        assert_eq!(Period::parse("24h"), Period::H24);
        assert_eq!(Period::parse("7d"), Period::D7);
        assert_eq!(Period::parse("90d"), Period::D90);
        assert_eq!(Period::parse("all"), Period::All);
        assert_eq!(Period::parse(" 30D "), Period::D30);
    }

    #[test]
    fn test_period_parse_unrecognized_falls_back_to_all() {
        assert_eq!(Period::parse("fortnight"), Period::All);
        assert_eq!(Period::parse(""), Period::All);
        assert_eq!(Period::parse("7"), Period::All);
    }

    #[test]
    fn test_period_cutoff_ordering() {
        let now = Utc::now();
        let c7 = Period::D7.cutoff(now).unwrap();
        let c30 = Period::D30.cutoff(now).unwrap();
        assert!(c30 < c7);
        assert!(Period::All.cutoff(now).is_none());
    }

    #[test]
    fn test_period_contains() {
        let now = Utc::now();
        let recent = now - Duration::days(2);
        let old = now - Duration::days(40);
        assert!(Period::D7.contains(recent, now));
        assert!(!Period::D7.contains(old, now));
        assert!(Period::All.contains(old, now));
    }

    #[test]
    fn test_treatment_labels() {
        assert_eq!(Treatment::OcmSerialized.label(), "OCM Serialized");
        assert_eq!(Treatment::ClassicPaper.label(), "Classic Paper");
        assert!(Treatment::Digital.is_classified());
        assert!(!Treatment::Unclassified.is_classified());
    }

    #[test]
    fn test_listing_kind() {
        assert_eq!(ListingKind::ActiveAsk.label(), "active-ask");
        assert!(ListingKind::ActiveBid.is_active());
        assert!(!ListingKind::Sold.is_active());
    }

    #[test]
    fn test_sealed_product_kinds() {
        assert!(!ProductKind::Single.is_sealed_product());
        assert!(ProductKind::Box.is_sealed_product());
        assert!(ProductKind::Pack.is_sealed_product());
    }

    #[test]
    fn test_observation_validation() {
        assert!(make_observation(12.5).validate().is_ok());
        assert!(make_observation(0.0).validate().is_err());
        assert!(make_observation(-3.0).validate().is_err());
        assert!(make_observation(f64::NAN).validate().is_err());

        let mut blank = make_observation(5.0);
        blank.title = "   ".to_string();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_search_query_includes_set_name() {
        let item = CatalogItem {
            id: 1,
            name: "Ethereal Grove".to_string(),
            product: ProductKind::Single,
            rarity: Some(Rarity::Mythic),
            set_name: Some("Wonders of the First".to_string()),
        };
        assert_eq!(item.search_query(), "Ethereal Grove Wonders of the First");

        let bare = CatalogItem { set_name: None, ..item };
        assert_eq!(bare.search_query(), "Ethereal Grove");
    }

    #[test]
    fn test_snapshot_staleness() {
        let now = Utc::now();
        let snap = Snapshot {
            item_id: 1,
            min_price: 1.0,
            max_price: 3.0,
            avg_price: 2.0,
            volume: 5,
            lowest_ask: Some(4.0),
            highest_bid: Some(2.5),
            inventory: 3,
            captured_at: now - Duration::hours(30),
        };
        assert!(snap.is_stale(24, now));
        assert!(!snap.is_stale(48, now));
    }
}
