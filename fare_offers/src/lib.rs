//! Turns scraped fare fragments into one canonical [`DailyEntry`] per route and date.
//!
//! Fragments go through the [`normalizer`] (prices and departure windows), the
//! [`band`] classifier and finally the [`aggregator`], which keeps the cheapest
//! offer per band.

pub mod aggregator;
pub mod band;
pub mod entities;
pub mod normalizer;

pub use aggregator::{aggregate, merge_time_ranges, OfferAggregator};
pub use band::{classify_band, BandClassifier};
pub use entities::{Band, DailyEntry, Offer, RawFragment, TimeRange};
pub use normalizer::{decode_lossy, parse_price, parse_time_range};
