//! Core types and configuration for the listing-market engine.
//!
//! This crate provides shared types used across all other crates:
//! - Catalog, listing, observation, and snapshot records
//! - Query periods and treatment/rarity vocabularies
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
