//! Signal engine: pure queries over one snapshot.
//!
//! - Price-deviation breach: latest price strictly below `mean - k * std`
//! - Volume spike: latest day's volume strictly above the mean of the
//!   preceding `window` days
//! - Buzzing: union of the two
//!
//! A stock with zero spread has a band that collapses to its mean, so a
//! constant series can never breach.

use crate::tables::Snapshot;
use crate::tables::stats::mean_present;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Thresholds used by the signal queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Number of standard deviations below the mean that counts as a breach.
    pub deviation_sigmas: f64,
    /// Number of trailing volume-days averaged for the spike baseline.
    pub volume_window: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            deviation_sigmas: 2.0,
            volume_window: 7,
        }
    }
}

/// Set of stock identifiers, deduplicated and sorted.
pub type StockSet = BTreeSet<String>;

/// Stocks whose latest price is strictly below `mean - k * std`.
pub fn price_deviation_breaches(snapshot: &Snapshot, params: &SignalParams) -> StockSet {
    snapshot
        .prices()
        .rows()
        .iter()
        .filter(|row| match row.latest() {
            Some(latest) => latest < row.lower_band(params.deviation_sigmas),
            None => false,
        })
        .map(|row| row.stock.clone())
        .collect()
}

/// Stocks whose latest day's volume strictly exceeds the trailing average.
pub fn volume_spikes(snapshot: &Snapshot, params: &SignalParams) -> StockSet {
    snapshot
        .volumes()
        .rows()
        .iter()
        .filter(|row| {
            let Some(latest) = row.latest_day() else {
                return false;
            };
            match mean_present(row.trailing(params.volume_window)) {
                Some(baseline) => latest > baseline,
                None => false,
            }
        })
        .map(|row| row.stock.clone())
        .collect()
}

/// Union of price-deviation breaches and volume spikes.
pub fn buzzing_stocks(snapshot: &Snapshot, params: &SignalParams) -> StockSet {
    let mut buzzing = price_deviation_breaches(snapshot, params);
    buzzing.extend(volume_spikes(snapshot, params));
    buzzing
}

/// All three signal sets computed from the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalReport {
    pub cycle: u64,
    pub price_breaches: StockSet,
    pub volume_spikes: StockSet,
    pub buzzing: StockSet,
}

impl SignalReport {
    pub fn compute(snapshot: &Snapshot, params: &SignalParams) -> Self {
        let price_breaches = price_deviation_breaches(snapshot, params);
        let volume_spikes = volume_spikes(snapshot, params);
        let buzzing = price_breaches.union(&volume_spikes).cloned().collect();
        Self {
            cycle: snapshot.cycle(),
            price_breaches,
            volume_spikes,
            buzzing,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.buzzing.is_empty()
    }
}
