//! Immutable pair of derived tables from one refresh cycle.

use super::price::PriceTable;
use super::volume::VolumeTable;
use chrono::{DateTime, Utc};

/// Price and volume tables built from the same fetch.
///
/// Once handed to the store a snapshot is never mutated, only superseded, so
/// any number of readers may hold it concurrently without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    cycle: u64,
    built_at: Option<DateTime<Utc>>,
    dataset_hash: String,
    prices: PriceTable,
    volumes: VolumeTable,
}

impl Snapshot {
    pub fn new(
        cycle: u64,
        built_at: DateTime<Utc>,
        dataset_hash: impl Into<String>,
        prices: PriceTable,
        volumes: VolumeTable,
    ) -> Self {
        Self {
            cycle,
            built_at: Some(built_at),
            dataset_hash: dataset_hash.into(),
            prices,
            volumes,
        }
    }

    /// The snapshot served before the first successful refresh.
    pub fn empty() -> Self {
        Self {
            cycle: 0,
            built_at: None,
            dataset_hash: String::new(),
            prices: PriceTable::empty(),
            volumes: VolumeTable::empty(),
        }
    }

    /// Refresh cycle that produced this snapshot; 0 for the initial empty one.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn dataset_hash(&self) -> &str {
        &self.dataset_hash
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn volumes(&self) -> &VolumeTable {
        &self.volumes
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
