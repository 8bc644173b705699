//! Derived table builder: canonical tables → [`Snapshot`].
//!
//! Splits the price dataset into a price table (date columns plus row
//! statistics) and a volume table (summary column plus the optional day
//! series), then cross-checks that both tables index the same stocks.

use super::price::{PriceRow, PriceTable};
use super::snapshot::Snapshot;
use super::stats::row_stats;
use super::volume::{VolumeRow, VolumeTable};
use crate::data::loader::LoadedDataset;
use crate::data::parse::CanonicalTable;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("price table is empty after validation ({input_rows} input rows)")]
    EmptyPriceTable { input_rows: usize },

    #[error("volume dataset is inconsistent: {0}")]
    InconsistentVolumeLayout(String),
}

/// Build a snapshot for `cycle` from one load.
pub fn build_snapshot(loaded: LoadedDataset, cycle: u64) -> Result<Snapshot, BuildError> {
    let LoadedDataset {
        prices,
        volumes,
        dataset_hash,
    } = loaded;

    let input_rows = prices.len();
    let (mut day_labels, mut day_series) = match volumes {
        Some(table) => split_volume_days(table)?,
        None => (Vec::new(), HashMap::new()),
    };

    let mut volume_rows = Vec::with_capacity(input_rows);
    let mut price_inputs = Vec::with_capacity(input_rows);
    for raw in prices.rows {
        volume_rows.push(VolumeRow {
            stock: raw.stock.clone(),
            summary: raw.summary,
            days: day_series.remove(&raw.stock).unwrap_or_default(),
        });
        price_inputs.push((raw.stock, raw.observations));
    }

    for stock in day_series.keys() {
        warn!(stock = %stock, "dropping volume-day row with no price row");
    }
    if volume_rows.iter().all(|r| r.days.is_empty()) {
        day_labels.clear();
    }

    let computed: Vec<(String, Option<PriceRow>)> = price_inputs
        .into_par_iter()
        .map(|(stock, observations)| {
            let row = row_stats(&observations).map(|stats| PriceRow {
                stock: stock.clone(),
                observations,
                mean_price: stats.mean,
                price_std: stats.std,
            });
            (stock, row)
        })
        .collect();

    let mut price_rows = Vec::with_capacity(computed.len());
    for (stock, row) in computed {
        match row {
            Some(row) => price_rows.push(row),
            None => warn!(stock = %stock, "dropping stock with no price observations"),
        }
    }

    let (price_rows, volume_rows) = reconcile(price_rows, volume_rows);

    if price_rows.is_empty() {
        return Err(BuildError::EmptyPriceTable { input_rows });
    }

    debug!(
        cycle,
        stocks = price_rows.len(),
        dropped = input_rows - price_rows.len(),
        "built derived tables"
    );

    Ok(Snapshot::new(
        cycle,
        Utc::now(),
        dataset_hash,
        PriceTable::new(prices.date_labels, price_rows),
        VolumeTable::new(day_labels, volume_rows),
    ))
}

/// Split the per-day volume dataset into its labels and a stock → series map.
fn split_volume_days(
    table: CanonicalTable,
) -> Result<(Vec<String>, HashMap<String, Vec<Option<f64>>>), BuildError> {
    if table.date_labels.is_empty() {
        return Err(BuildError::InconsistentVolumeLayout(
            "no volume-day columns".into(),
        ));
    }
    let series = table
        .rows
        .into_iter()
        .map(|r| (r.stock, r.observations))
        .collect();
    Ok((table.date_labels, series))
}

/// Drop any stock present in only one of the two tables.
fn reconcile(
    price_rows: Vec<PriceRow>,
    volume_rows: Vec<VolumeRow>,
) -> (Vec<PriceRow>, Vec<VolumeRow>) {
    let price_keys: HashSet<&str> = price_rows.iter().map(|r| r.stock.as_str()).collect();
    let volume_keys: HashSet<&str> = volume_rows.iter().map(|r| r.stock.as_str()).collect();

    let orphans: HashSet<String> = price_keys
        .symmetric_difference(&volume_keys)
        .map(|s| s.to_string())
        .collect();

    if orphans.is_empty() {
        return (price_rows, volume_rows);
    }

    for stock in &orphans {
        warn!(stock = %stock, "stock present in only one derived table, dropping from both");
    }

    let price_rows = price_rows
        .into_iter()
        .filter(|r| !orphans.contains(&r.stock))
        .collect();
    let volume_rows = volume_rows
        .into_iter()
        .filter(|r| !orphans.contains(&r.stock))
        .collect();
    (price_rows, volume_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse::RawRow;

    fn raw(stock: &str, observations: Vec<Option<f64>>, summary: Option<f64>) -> RawRow {
        RawRow {
            stock: stock.into(),
            observations,
            summary,
        }
    }

    fn table(labels: &[&str], rows: Vec<RawRow>, has_summary: bool) -> CanonicalTable {
        CanonicalTable {
            date_labels: labels.iter().map(|s| s.to_string()).collect(),
            has_summary,
            rows,
        }
    }

    fn loaded(prices: CanonicalTable, volumes: Option<CanonicalTable>) -> LoadedDataset {
        LoadedDataset {
            prices,
            volumes,
            dataset_hash: "hash".into(),
        }
    }

    #[test]
    fn computes_row_statistics() {
        let prices = table(
            &["d1", "d2", "d3"],
            vec![
                raw("FLAT", vec![Some(10.0), Some(10.0), Some(10.0)], Some(1.0)),
                raw("MOVE", vec![Some(8.0), Some(10.0), Some(12.0)], Some(2.0)),
            ],
            true,
        );
        let snap = build_snapshot(loaded(prices, None), 7).unwrap();

        assert_eq!(snap.cycle(), 7);
        assert_eq!(snap.dataset_hash(), "hash");
        let flat = snap.prices().get("FLAT").unwrap();
        assert_eq!(flat.mean_price, 10.0);
        assert_eq!(flat.price_std, 0.0);
        let moving = snap.prices().get("MOVE").unwrap();
        assert!((moving.mean_price - 10.0).abs() < 1e-12);
        assert!((moving.price_std - 2.0).abs() < 1e-12);
        assert_eq!(snap.prices().latest_label(), Some("d3"));
        assert_eq!(snap.volumes().get("MOVE").unwrap().summary, Some(2.0));
    }

    #[test]
    fn drops_rows_without_observations_from_both_tables() {
        let prices = table(
            &["d1", "d2"],
            vec![
                raw("AAA", vec![Some(1.0), Some(2.0)], Some(1.0)),
                raw("EMPTY", vec![None, None], Some(5.0)),
            ],
            true,
        );
        let snap = build_snapshot(loaded(prices, None), 1).unwrap();

        assert_eq!(snap.prices().len(), 1);
        assert!(!snap.prices().contains("EMPTY"));
        assert!(!snap.volumes().contains("EMPTY"));
        assert!(snap.volumes().contains("AAA"));
    }

    #[test]
    fn preserves_dataset_order() {
        let prices = table(
            &["d1"],
            vec![
                raw("ZZZ", vec![Some(1.0)], None),
                raw("AAA", vec![Some(1.0)], None),
                raw("MMM", vec![Some(1.0)], None),
            ],
            true,
        );
        let snap = build_snapshot(loaded(prices, None), 1).unwrap();
        assert_eq!(
            snap.prices().stocks().collect::<Vec<_>>(),
            vec!["ZZZ", "AAA", "MMM"]
        );
    }

    #[test]
    fn empty_price_table_is_build_error() {
        let prices = table(&["d1"], vec![raw("EMPTY", vec![None], None)], true);
        let err = build_snapshot(loaded(prices, None), 1).unwrap_err();
        assert_eq!(err, BuildError::EmptyPriceTable { input_rows: 1 });

        let prices = table(&["d1"], vec![], true);
        let err = build_snapshot(loaded(prices, None), 1).unwrap_err();
        assert_eq!(err, BuildError::EmptyPriceTable { input_rows: 0 });
    }

    #[test]
    fn attaches_volume_days_by_stock() {
        let prices = table(
            &["d1", "d2"],
            vec![
                raw("AAA", vec![Some(1.0), Some(2.0)], Some(9.0)),
                raw("BBB", vec![Some(3.0), Some(4.0)], Some(8.0)),
            ],
            true,
        );
        let volumes = table(
            &["v1", "v2"],
            vec![
                raw("BBB", vec![Some(100.0), Some(200.0)], None),
                raw("GHOST", vec![Some(1.0), Some(1.0)], None),
            ],
            false,
        );
        let snap = build_snapshot(loaded(prices, Some(volumes)), 1).unwrap();

        assert_eq!(snap.volumes().day_labels(), ["v1", "v2"]);
        assert_eq!(
            snap.volumes().get("BBB").unwrap().days,
            vec![Some(100.0), Some(200.0)]
        );
        assert!(snap.volumes().get("AAA").unwrap().days.is_empty());
        assert!(!snap.volumes().contains("GHOST"));
        assert!(!snap.prices().contains("GHOST"));
    }

    #[test]
    fn volume_dataset_without_day_columns_is_rejected() {
        let prices = table(&["d1"], vec![raw("AAA", vec![Some(1.0)], None)], true);
        let volumes = table(&[], vec![raw("AAA", vec![], Some(1.0))], true);
        let err = build_snapshot(loaded(prices, Some(volumes)), 1).unwrap_err();
        assert!(matches!(err, BuildError::InconsistentVolumeLayout(_)));
    }

    #[test]
    fn reconcile_drops_orphans_from_both_sides() {
        let price_rows = vec![
            PriceRow {
                stock: "AAA".into(),
                observations: vec![Some(1.0)],
                mean_price: 1.0,
                price_std: 0.0,
            },
            PriceRow {
                stock: "ONLY_PRICE".into(),
                observations: vec![Some(1.0)],
                mean_price: 1.0,
                price_std: 0.0,
            },
        ];
        let volume_rows = vec![
            VolumeRow {
                stock: "AAA".into(),
                summary: None,
                days: vec![],
            },
            VolumeRow {
                stock: "ONLY_VOLUME".into(),
                summary: None,
                days: vec![],
            },
        ];

        let (prices, volumes) = reconcile(price_rows, volume_rows);
        assert_eq!(prices.len(), 1);
        assert_eq!(volumes.len(), 1);
        assert_eq!(prices[0].stock, "AAA");
        assert_eq!(volumes[0].stock, "AAA");
    }
}
