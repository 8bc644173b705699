//! Query interface for the display and alerting collaborators.
//!
//! Every method takes exactly one snapshot from the store and answers from it,
//! so a single call never mixes tables from two refresh cycles.

use crate::signals::{self, SignalParams, SignalReport, StockSet};
use crate::store::DatasetStore;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// The requested stock is absent from the current snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no such stock: '{stock}'")]
pub struct NotFoundError {
    pub stock: String,
}

/// One dated price observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: String,
    pub value: f64,
}

/// A stock's price history with its summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub stock: String,
    /// Present observations in date order; missing cells are omitted.
    pub points: Vec<PricePoint>,
    pub mean: f64,
    pub std: f64,
    pub cycle: u64,
}

/// Read-side handle over a shared [`DatasetStore`].
#[derive(Debug, Clone)]
pub struct StockQuery {
    store: Arc<DatasetStore>,
    params: SignalParams,
}

impl StockQuery {
    pub fn new(store: Arc<DatasetStore>, params: SignalParams) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Stock identifiers in dataset order.
    pub fn list_stocks(&self) -> Vec<String> {
        let snapshot = self.store.snapshot();
        snapshot.prices().stocks().map(str::to_string).collect()
    }

    pub fn price_series(&self, stock: &str) -> Result<PriceSeries, NotFoundError> {
        let snapshot = self.store.snapshot();
        let prices = snapshot.prices();
        let row = prices.get(stock).ok_or_else(|| NotFoundError {
            stock: stock.to_string(),
        })?;

        let points = prices
            .date_labels()
            .iter()
            .zip(&row.observations)
            .filter_map(|(date, value)| {
                value.map(|value| PricePoint {
                    date: date.clone(),
                    value,
                })
            })
            .collect();

        Ok(PriceSeries {
            stock: row.stock.clone(),
            points,
            mean: row.mean_price,
            std: row.price_std,
            cycle: snapshot.cycle(),
        })
    }

    pub fn price_deviation_breaches(&self) -> StockSet {
        signals::price_deviation_breaches(&self.store.snapshot(), &self.params)
    }

    pub fn volume_spikes(&self) -> StockSet {
        signals::volume_spikes(&self.store.snapshot(), &self.params)
    }

    pub fn buzzing_stocks(&self) -> StockSet {
        signals::buzzing_stocks(&self.store.snapshot(), &self.params)
    }

    /// All three signal sets from one snapshot.
    pub fn signal_report(&self) -> SignalReport {
        SignalReport::compute(&self.store.snapshot(), &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{PriceRow, PriceTable, Snapshot, VolumeRow, VolumeTable};
    use chrono::Utc;

    fn store_with_one_stock() -> Arc<DatasetStore> {
        let snapshot = Snapshot::new(
            3,
            Utc::now(),
            "h",
            PriceTable::new(
                vec!["d1".into(), "d2".into(), "d3".into()],
                vec![PriceRow {
                    stock: "AAA".into(),
                    observations: vec![Some(8.0), None, Some(12.0)],
                    mean_price: 10.0,
                    price_std: 2.0,
                }],
            ),
            VolumeTable::new(
                vec![],
                vec![VolumeRow {
                    stock: "AAA".into(),
                    summary: None,
                    days: vec![],
                }],
            ),
        );
        Arc::new(DatasetStore::with_snapshot(snapshot))
    }

    #[test]
    fn price_series_skips_missing_points() {
        let query = StockQuery::new(store_with_one_stock(), SignalParams::default());
        let series = query.price_series("AAA").unwrap();

        assert_eq!(series.cycle, 3);
        assert_eq!(series.mean, 10.0);
        assert_eq!(series.std, 2.0);
        assert_eq!(
            series.points,
            vec![
                PricePoint {
                    date: "d1".into(),
                    value: 8.0
                },
                PricePoint {
                    date: "d3".into(),
                    value: 12.0
                },
            ]
        );
    }

    #[test]
    fn unknown_stock_is_not_found() {
        let store = store_with_one_stock();
        let query = StockQuery::new(Arc::clone(&store), SignalParams::default());
        let before = store.snapshot();

        let err = query.price_series("UNKNOWN").unwrap_err();
        assert_eq!(
            err,
            NotFoundError {
                stock: "UNKNOWN".into()
            }
        );
        assert_eq!(err.to_string(), "no such stock: 'UNKNOWN'");
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn empty_store_answers_empty() {
        let query = StockQuery::new(Arc::new(DatasetStore::new()), SignalParams::default());
        assert!(query.list_stocks().is_empty());
        assert!(query.price_deviation_breaches().is_empty());
        assert!(query.volume_spikes().is_empty());
        assert!(query.buzzing_stocks().is_empty());
        assert_eq!(query.signal_report().cycle, 0);
    }
}
