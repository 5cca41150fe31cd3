//! Calendar-bucketed price series built from sold observations.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use market_core::TimestampUtc;

/// Calendar bucket width for a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Day,
    Week,
    Month,
}

impl Interval {
    /// Parse a user-facing interval token. Unlike period parsing this is
    /// strict: an unrecognized token is a caller error, not a default.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "1d" | "day" | "daily" => Some(Interval::Day),
            "1w" | "7d" | "week" | "weekly" => Some(Interval::Week),
            "1m" | "30d" | "month" | "monthly" => Some(Interval::Month),
            _ => None,
        }
    }

    /// First calendar day of the bucket containing `ts`. Weeks start on
    /// Monday, months on the 1st.
    pub fn bucket_start(&self, ts: TimestampUtc) -> NaiveDate {
        let date = ts.date_naive();
        match self {
            Interval::Day => date,
            Interval::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Interval::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

/// One aggregated bucket of a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub vwap: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub volume: u32,
}

#[derive(Debug)]
struct SeriesBucket {
    sum: f64,
    min: f64,
    max: f64,
    volume: u32,
}

impl SeriesBucket {
    fn new(price: f64) -> Self {
        Self { sum: price, min: price, max: price, volume: 1 }
    }

    fn add(&mut self, price: f64) {
        self.sum += price;
        self.min = self.min.min(price);
        self.max = self.max.max(price);
        self.volume += 1;
    }

    fn to_point(&self, date: NaiveDate) -> SeriesPoint {
        SeriesPoint {
            date,
            vwap: self.sum / f64::from(self.volume),
            floor: self.min,
            ceiling: self.max,
            volume: self.volume,
        }
    }
}

/// Accumulates sold prices into calendar buckets. Only buckets that saw
/// at least one sale appear in the output.
#[derive(Debug)]
pub struct TimeSeriesBuilder {
    interval: Interval,
    buckets: BTreeMap<NaiveDate, SeriesBucket>,
}

impl TimeSeriesBuilder {
    pub fn new(interval: Interval) -> Self {
        Self { interval, buckets: BTreeMap::new() }
    }

    /// Add one sale. Non-positive prices are ignored.
    pub fn add(&mut self, ts: TimestampUtc, price: f64) {
        if price <= 0.0 {
            return;
        }
        let date = self.interval.bucket_start(ts);
        self.buckets
            .entry(date)
            .and_modify(|b| b.add(price))
            .or_insert_with(|| SeriesBucket::new(price));
    }

    /// Finish the series, ascending by bucket date.
    pub fn build(self) -> Vec<SeriesPoint> {
        self.buckets
            .into_iter()
            .map(|(date, bucket)| bucket.to_point(date))
            .collect()
    }
}
