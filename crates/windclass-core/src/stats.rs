//! Descriptive statistics over slices
//!
//! Measurement columns routinely contain NaN gaps, so the `nan_*` helpers
//! skip non-finite values the way pandas reductions skip missing data.

use num_traits::Float;

/// Calculate the mean of a slice
///
/// Returns 0.0 for empty slices.
///
/// # Examples
///
/// ```rust
/// use windclass_core::stats::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
/// assert_eq!(mean(&[]), 0.0);
/// ```
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean of the finite values, NaN if there are none
pub fn nan_mean<T: Float>(data: &[T]) -> T {
    let mut sum = T::zero();
    let mut count = 0usize;
    for &x in data {
        if x.is_finite() {
            sum = sum + x;
            count += 1;
        }
    }
    if count == 0 {
        T::nan()
    } else {
        sum / T::from(count).unwrap_or_else(T::one)
    }
}

/// Standard deviation with `ddof` delta degrees of freedom
///
/// Returns 0.0 when there are not more than `ddof` values.
pub fn std_dev(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    (ss / (data.len() - ddof) as f64).sqrt()
}

/// Finite values sorted ascending
pub fn sorted_finite(data: &[f64]) -> Vec<f64> {
    let mut values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Quantile of already sorted data with linear interpolation
///
/// Returns NaN for empty input.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Quantile of the finite values with linear interpolation
///
/// # Examples
///
/// ```rust
/// use windclass_core::stats::nan_quantile;
///
/// let data = [4.0, f64::NAN, 1.0, 3.0, 2.0];
/// assert_eq!(nan_quantile(&data, 0.5), 2.5);
/// ```
pub fn nan_quantile(data: &[f64], p: f64) -> f64 {
    quantile_sorted(&sorted_finite(data), p)
}

pub fn nan_median(data: &[f64]) -> f64 {
    nan_quantile(data, 0.5)
}

/// Fixed-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Count finite values of `data` into `bins` equal bins over `[lo, hi]`
    ///
    /// The last bin is closed on the right; values outside the range are
    /// dropped.
    pub fn new(data: &[f64], bins: usize, lo: f64, hi: f64) -> Self {
        let bins = bins.max(1);
        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();
        let mut counts = vec![0; bins];
        if width > 0.0 {
            for &x in data {
                if !x.is_finite() || x < lo || x > hi {
                    continue;
                }
                let idx = (((x - lo) / width) as usize).min(bins - 1);
                counts[idx] += 1;
            }
        }
        Self { edges, counts }
    }

    /// Counts normalised so the histogram integrates to one
    pub fn density(&self) -> Vec<f64> {
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(&c, e)| c as f64 / (total as f64 * (e[1] - e[0])))
            .collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_std_dev_ddof() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(std_dev(&data, 1), 1.58113883, epsilon = 1e-6);
        assert_relative_eq!(std_dev(&data, 0), 2.0f64.sqrt(), epsilon = 1e-12);
        assert_eq!(std_dev(&[1.0], 1), 0.0);
    }

    #[test]
    fn test_nan_mean_skips_gaps() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean::<f64>(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_quantiles() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(nan_quantile(&data, 0.25), 1.75);
        assert_relative_eq!(nan_median(&data), 2.5);
        assert!(nan_quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_histogram() {
        let hist = Histogram::new(&[0.0, 0.5, 1.0, 2.0, f64::NAN], 2, 0.0, 1.0);
        assert_eq!(hist.counts, vec![1, 2]);
        let density = hist.density();
        assert_relative_eq!(density.iter().sum::<f64>() * 0.5, 1.0);
        assert_eq!(hist.centers(), vec![0.25, 0.75]);
    }
}
