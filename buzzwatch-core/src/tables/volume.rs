//! Volume table: the volume-summary value per stock and, when a per-day volume
//! dataset is configured, the ordered day series used for spike detection.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRow {
    pub stock: String,
    /// Value of the volume-summary column from the price dataset.
    pub summary: Option<f64>,
    /// One entry per day label of the owning table; empty when no day series exists.
    pub days: Vec<Option<f64>>,
}

impl VolumeRow {
    /// Volume on the most recent day, if present.
    pub fn latest_day(&self) -> Option<f64> {
        self.days.last().copied().flatten()
    }

    /// Up to `window` days immediately preceding the latest day.
    pub fn trailing(&self, window: usize) -> &[Option<f64>] {
        match self.days.len() {
            0 => &[],
            n => {
                let end = n - 1;
                &self.days[end.saturating_sub(window)..end]
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeTable {
    day_labels: Vec<String>,
    rows: Vec<VolumeRow>,
    index: HashMap<String, usize>,
}

impl VolumeTable {
    pub fn new(day_labels: Vec<String>, rows: Vec<VolumeRow>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.stock.clone(), i))
            .collect();
        Self {
            day_labels,
            rows,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn day_labels(&self) -> &[String] {
        &self.day_labels
    }

    pub fn rows(&self) -> &[VolumeRow] {
        &self.rows
    }

    pub fn get(&self, stock: &str) -> Option<&VolumeRow> {
        self.index.get(stock).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, stock: &str) -> bool {
        self.index.contains_key(stock)
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

    fn row(days: &[f64]) -> VolumeRow {
        VolumeRow {
            stock: "AAA".into(),
            summary: None,
            days: days.iter().copied().map(Some).collect(),
        }
    }

    #[test]
    fn trailing_excludes_latest_day() {
        let r = row(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(r.latest_day(), Some(9.0));
        let trailing: Vec<f64> = r.trailing(7).iter().flatten().copied().collect();
        assert_eq!(trailing, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn short_history_uses_what_is_available() {
        let r = row(&[1.0, 2.0, 3.0]);
        assert_eq!(r.trailing(7).len(), 2);

        let r = row(&[1.0]);
        assert!(r.trailing(7).is_empty());

        let r = row(&[]);
        assert!(r.trailing(7).is_empty());
        assert_eq!(r.latest_day(), None);
    }
}
