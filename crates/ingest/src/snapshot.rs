//! Folds one scrape's listings into a per-item market snapshot.

use chrono::Utc;

use market_core::{ItemId, ListingKind, RawListing, Snapshot};

/// Accumulates listings into a [`Snapshot`].
///
/// Sold stats are zeroed when the scrape parsed no sold listings; the
/// snapshot is still recorded because asks and inventory stay
/// meaningful.
#[derive(Debug)]
pub struct SnapshotBuilder {
    item_id: ItemId,
    sold_prices: Vec<f64>,
    total_hint: Option<u32>,
    lowest_ask: Option<f64>,
    highest_bid: Option<f64>,
    inventory: u32,
}

impl SnapshotBuilder {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            sold_prices: Vec::new(),
            total_hint: None,
            lowest_ask: None,
            highest_bid: None,
            inventory: 0,
        }
    }

    /// Marketplace-reported sold total. Scrapes paginate, so the hint can
    /// exceed the parsed count; volume takes the larger of the two.
    pub fn sold_total_hint(&mut self, hint: Option<u32>) {
        self.total_hint = hint;
    }

    pub fn add(&mut self, listing: &RawListing) {
        if !listing.is_processable() {
            return;
        }
        match listing.kind {
            ListingKind::Sold => self.sold_prices.push(listing.price),
            ListingKind::ActiveAsk => {
                self.inventory += 1;
                self.lowest_ask = Some(match self.lowest_ask {
                    Some(ask) => ask.min(listing.price),
                    None => listing.price,
                });
            }
            ListingKind::ActiveBid => {
                self.highest_bid = Some(match self.highest_bid {
                    Some(bid) => bid.max(listing.price),
                    None => listing.price,
                });
            }
        }
    }

    pub fn build(self) -> Snapshot {
        let parsed = self.sold_prices.len() as u32;
        let volume = self.total_hint.map_or(parsed, |hint| hint.max(parsed));
        let (min_price, max_price, avg_price) = if self.sold_prices.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = self.sold_prices.iter().copied().fold(f64::INFINITY, f64::min);
            let max = self.sold_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = self.sold_prices.iter().sum::<f64>() / self.sold_prices.len() as f64;
            (min, max, avg)
        };
        Snapshot {
            item_id: self.item_id,
            min_price,
            max_price,
            avg_price,
            volume,
            lowest_ask: self.lowest_ask,
            highest_bid: self.highest_bid,
            inventory: self.inventory,
            captured_at: Utc::now(),
        }
    }
}
