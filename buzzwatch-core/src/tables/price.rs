//! Price table: per-stock date observations plus row mean and sample std.

use std::collections::HashMap;

/// One stock's prices and their summary statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub stock: String,
    /// One entry per date label of the owning table.
    pub observations: Vec<Option<f64>>,
    pub mean_price: f64,
    pub price_std: f64,
}

impl PriceRow {
    /// Observation in the latest date column, if present.
    pub fn latest(&self) -> Option<f64> {
        self.observations.last().copied().flatten()
    }

    /// Lower edge of the deviation band: `mean - sigmas * std`.
    pub fn lower_band(&self, sigmas: f64) -> f64 {
        self.mean_price - sigmas * self.price_std
    }
}

/// Read-optimized price table, indexed by stock identifier.
///
/// The latest date is named explicitly by `latest_label()`; computed statistics
/// live on the row, never as extra trailing columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    date_labels: Vec<String>,
    rows: Vec<PriceRow>,
    index: HashMap<String, usize>,
}

impl PriceTable {
    pub fn new(date_labels: Vec<String>, rows: Vec<PriceRow>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.stock.clone(), i))
            .collect();
        Self {
            date_labels,
            rows,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Ordered date labels (oldest first).
    pub fn date_labels(&self) -> &[String] {
        &self.date_labels
    }

    /// Label of the most recent date column.
    pub fn latest_label(&self) -> Option<&str> {
        self.date_labels.last().map(String::as_str)
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn get(&self, stock: &str) -> Option<&PriceRow> {
        self.index.get(stock).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, stock: &str) -> bool {
        self.index.contains_key(stock)
    }

    /// Stock identifiers in dataset order.
    pub fn stocks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.stock.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stock: &str, observations: Vec<Option<f64>>) -> PriceRow {
        PriceRow {
            stock: stock.into(),
            observations,
            mean_price: 100.0,
            price_std: 10.0,
        }
    }

    #[test]
    fn latest_is_last_date_column() {
        let r = row("AAA", vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(r.latest(), Some(3.0));

        let r = row("BBB", vec![Some(1.0), None]);
        assert_eq!(r.latest(), None);
    }

    #[test]
    fn lower_band_is_mean_minus_sigmas() {
        let r = row("AAA", vec![]);
        assert_eq!(r.lower_band(2.0), 80.0);
    }

    #[test]
    fn lookup_by_stock() {
        let table = PriceTable::new(
            vec!["d1".into(), "d2".into()],
            vec![row("AAA", vec![Some(1.0), Some(2.0)]), row("BBB", vec![None, Some(5.0)])],
        );
        assert_eq!(table.latest_label(), Some("d2"));
        assert_eq!(table.get("BBB").unwrap().latest(), Some(5.0));
        assert!(table.get("CCC").is_none());
        assert_eq!(table.stocks().collect::<Vec<_>>(), vec!["AAA", "BBB"]);
    }

    #[test]
    fn empty_table_has_no_latest_label() {
        let table = PriceTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.latest_label(), None);
    }
}
