//! Title matching and classification for the listing-market engine.
//!
//! This crate handles:
//! - Title normalization and stop-word token sets
//! - Print-treatment detection (ordered keyword rules)
//! - Listing-to-item matching with sibling disambiguation

pub mod tokens;
pub mod treatment;
pub mod matcher;

pub use matcher::{AcceptBasis, ListingMatcher, MatchOutcome, RejectReason};
pub use treatment::TreatmentClassifier;
