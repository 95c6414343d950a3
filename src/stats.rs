//! Shared numeric routines for the Monte Carlo stages.

/// Empirical quantile with linear interpolation between order statistics,
/// positioned at `(n - 1) * q`.
///
/// Returns `NaN` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Count of entries in an ascending-sorted slice that are `<= x`.
pub fn count_leq(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&d| d <= x)
}

/// Column means of a row-major matrix. Rows must share one width.
pub fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut means = vec![0.0; first.len()];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    let n = rows.len() as f64;
    for m in &mut means {
        *m /= n;
    }
    means
}

/// Per-column quantile of a row-major matrix.
pub fn column_quantiles(rows: &[Vec<f64>], q: f64) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|j| {
            let column: Vec<f64> = rows.iter().map(|row| row[j]).collect();
            quantile(&column, q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let v: Vec<f64> = (1..=10).map(f64::from).collect();
        // (10 - 1) * 0.25 = 2.25 -> 3 + 0.25
        assert!((quantile(&v, 0.25) - 3.25).abs() < 1e-12);
        assert!((quantile(&v, 0.5) - 5.5).abs() < 1e-12);
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 10.0);
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let v = vec![3.0, 1.0, 2.0];
        assert_eq!(quantile(&v, 0.5), 2.0);
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(quantile(&[7.0], 0.975), 7.0);
    }

    #[test]
    fn test_quantile_empty_is_nan() {
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_count_leq_boundaries() {
        let sorted = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(count_leq(&sorted, 0.5), 0);
        assert_eq!(count_leq(&sorted, 2.0), 3);
        assert_eq!(count_leq(&sorted, 10.0), 4);
    }

    #[test]
    fn test_column_means() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 20.0]];
        let means = column_means(&rows);
        assert_eq!(means, vec![2.0, 15.0]);
    }

    #[test]
    fn test_column_quantiles() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let q = column_quantiles(&rows, 0.5);
        assert!((q[0] - 2.5).abs() < 1e-12);
    }
}
