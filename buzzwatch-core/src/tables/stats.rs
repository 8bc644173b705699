//! Row statistics: mean and sample standard deviation.
//!
//! Missing observations are skipped. Degenerate inputs are explicit branches
//! rather than NaN propagation:
//! - N = 0: no statistics at all (`None`)
//! - N = 1: std is 0
//! - N >= 2: sample std, divide by N - 1

/// Mean and sample standard deviation of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStats {
    pub mean: f64,
    pub std: f64,
    /// Number of present observations the statistics were computed over.
    pub count: usize,
}

/// Compute [`RowStats`] over the present values, or `None` if there are none.
pub fn row_stats(values: &[Option<f64>]) -> Option<RowStats> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    if n == 0 {
        return None;
    }

    let mean = present.iter().sum::<f64>() / n as f64;

    let std = if n < 2 {
        0.0
    } else {
        let variance = present
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    };

    Some(RowStats {
        mean,
        std,
        count: n,
    })
}

/// Mean of the present values, `None` if there are none.
pub fn mean_present<'a>(values: impl IntoIterator<Item = &'a Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn constant_series_has_zero_std() {
        let stats = row_stats(&some(&[10.0, 10.0, 10.0])).unwrap();
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let stats = row_stats(&some(&[8.0, 10.0, 12.0])).unwrap();
        assert!((stats.mean - 10.0).abs() < 1e-12);
        assert!((stats.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_observation_has_zero_std() {
        let stats = row_stats(&some(&[42.0])).unwrap();
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn no_observations_has_no_stats() {
        assert_eq!(row_stats(&[]), None);
        assert_eq!(row_stats(&[None, None]), None);
    }

    #[test]
    fn missing_values_are_skipped() {
        let stats = row_stats(&[Some(8.0), None, Some(10.0), None, Some(12.0)]).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mean_present_skips_missing() {
        let values = [Some(1.0), None, Some(3.0)];
        assert_eq!(mean_present(&values), Some(2.0));
        assert_eq!(mean_present(&[None]), None);
    }
}
