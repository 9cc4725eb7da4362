//! Statistical helpers for the bias monitor
//!
//! Chi-square goodness-of-fit against a uniform expectation, an asymptotic
//! tail approximation for its p-value, IQR outlier fencing and run-length
//! scanning. Only the ordering of p-values is relied on: a smaller p means
//! stronger evidence of non-uniformity.

use serde::{Deserialize, Serialize};

/// Chi-square goodness-of-fit result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub sample_size: usize,
    pub expected_per_category: f64,
}

impl ChiSquareResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value <= alpha
    }
}

/// Goodness-of-fit of `observed` against a uniform distribution
///
/// Returns `None` with fewer than two categories or no observations.
pub fn chi_square_uniform(observed: &[usize]) -> Option<ChiSquareResult> {
    let categories = observed.len();
    let total: usize = observed.iter().sum();
    if categories < 2 || total == 0 {
        return None;
    }

    let expected = total as f64 / categories as f64;
    let statistic = observed
        .iter()
        .map(|&o| {
            let diff = o as f64 - expected;
            diff * diff / expected
        })
        .sum::<f64>();
    let degrees_of_freedom = categories - 1;

    Some(ChiSquareResult {
        statistic,
        degrees_of_freedom,
        p_value: chi_square_p_value(statistic, degrees_of_freedom),
        sample_size: total,
        expected_per_category: expected,
    })
}

/// Upper-tail probability P(X >= statistic) for a chi-square variable
///
/// Wilson-Hilferty cube-root normal approximation.
pub fn chi_square_p_value(statistic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 || !statistic.is_finite() {
        return if statistic.is_finite() { 1.0 } else { 0.0 };
    }
    if statistic <= 0.0 {
        return 1.0;
    }

    let k = degrees_of_freedom as f64;
    let variance = 2.0 / (9.0 * k);
    let z = ((statistic / k).cbrt() - (1.0 - variance)) / variance.sqrt();
    (0.5 * erfc(z / std::f64::consts::SQRT_2)).clamp(0.0, 1.0)
}

/// Complementary error function (Abramowitz & Stegun 7.1.26, |error| < 1.5e-7)
pub fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736
                + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    poly * (-x * x).exp()
}

/// IQR fencing result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// False when fewer than 4 values were supplied
    pub sufficient_data: bool,
    pub sample_size: usize,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub lower_fence: Option<f64>,
    pub upper_fence: Option<f64>,
    /// Indices into the input slice
    pub outlier_indices: Vec<usize>,
    pub outliers: Vec<f64>,
}

impl OutlierReport {
    fn insufficient(sample_size: usize) -> Self {
        Self {
            sufficient_data: false,
            sample_size,
            q1: None,
            q3: None,
            iqr: None,
            lower_fence: None,
            upper_fence: None,
            outlier_indices: Vec::new(),
            outliers: Vec::new(),
        }
    }

    pub fn has_outliers(&self) -> bool {
        !self.outliers.is_empty()
    }
}

/// Minimum values needed for quartile fencing
pub const MIN_OUTLIER_SAMPLES: usize = 4;

/// Flag values outside [Q1 - 1.5 IQR, Q3 + 1.5 IQR]
///
/// Non-finite values are ignored for the quartiles and never reported.
pub fn detect_outliers(values: &[f64]) -> OutlierReport {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < MIN_OUTLIER_SAMPLES {
        return OutlierReport::insufficient(sorted.len());
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let (outlier_indices, outliers): (Vec<usize>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite() && (**v < lower || **v > upper))
        .map(|(i, v)| (i, *v))
        .unzip();

    OutlierReport {
        sufficient_data: true,
        sample_size: sorted.len(),
        q1: Some(q1),
        q3: Some(q3),
        iqr: Some(iqr),
        lower_fence: Some(lower),
        upper_fence: Some(upper),
        outlier_indices,
        outliers,
    }
}

/// Linear-interpolation quantile of sorted data
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Longest run of equal consecutive items: `(item, length)`
///
/// Ties keep the earliest run.
pub fn longest_run<T, I>(items: I) -> Option<(T, usize)>
where
    T: PartialEq + Copy,
    I: IntoIterator<Item = T>,
{
    let mut best: Option<(T, usize)> = None;
    let mut current: Option<(T, usize)> = None;

    for item in items {
        current = match current {
            Some((value, len)) if value == item => Some((value, len + 1)),
            _ => Some((item, 1)),
        };
        if let Some((value, len)) = current {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((value, len));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_value_near_critical_values() {
        // 5% critical values
        let p5 = chi_square_p_value(11.070, 5);
        assert!((p5 - 0.05).abs() < 0.005, "df=5 p={p5}");

        let p63 = chi_square_p_value(82.529, 63);
        assert!((p63 - 0.05).abs() < 0.005, "df=63 p={p63}");
    }

    #[test]
    fn test_p_value_is_monotone() {
        let mut last = 1.0;
        for x in 1..60 {
            let p = chi_square_p_value(x as f64, 5);
            assert!(p <= last);
            last = p;
        }
        assert_eq!(chi_square_p_value(0.0, 5), 1.0);
    }

    #[test]
    fn test_chi_square_uniform() {
        let flat = chi_square_uniform(&[10, 10, 10, 10, 10, 10]).unwrap();
        assert_eq!(flat.statistic, 0.0);
        assert_eq!(flat.degrees_of_freedom, 5);
        assert_eq!(flat.p_value, 1.0);

        let skewed = chi_square_uniform(&[40, 4, 4, 4, 4, 4]).unwrap();
        assert!(skewed.is_significant(0.05));
        assert!(skewed.p_value < flat.p_value);

        assert!(chi_square_uniform(&[]).is_none());
        assert!(chi_square_uniform(&[0, 0, 0]).is_none());
    }

    #[test]
    fn test_erfc_reference_points() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!((erfc(1.0) - 0.157_299).abs() < 1e-5);
        assert!((erfc(-1.0) - 1.842_701).abs() < 1e-5);
    }

    #[test]
    fn test_detect_outliers() {
        let report = detect_outliers(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!(report.sufficient_data);
        assert_eq!(report.q1, Some(2.0));
        assert_eq!(report.q3, Some(4.0));
        assert_eq!(report.outliers, vec![100.0]);
        assert_eq!(report.outlier_indices, vec![4]);

        let flat = detect_outliers(&[5.0; 8]);
        assert!(!flat.has_outliers());
    }

    #[test]
    fn test_detect_outliers_insufficient() {
        let report = detect_outliers(&[1.0, 2.0, 3.0]);
        assert!(!report.sufficient_data);
        assert_eq!(report.sample_size, 3);
        assert!(report.q1.is_none());
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(Vec::<u16>::new()), None);
        assert_eq!(longest_run([7, 7, 3, 3, 3, 7]), Some((3, 3)));
        assert_eq!(longest_run([1, 2, 3]), Some((1, 1)));
    }
}
