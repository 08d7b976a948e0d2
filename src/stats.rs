//! Descriptive statistics and Pearson correlation.
//!
//! Every summary of an empty series is `0.0`, never NaN.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::{Data, Distribution, Max, Min, OrderStatistics};

fn or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    /// Summary using the sample (n - 1) standard deviation.
    pub fn sample(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let data = Data::new(values.to_vec());
        Self {
            mean: or_zero(data.mean().unwrap_or(0.0)),
            std: or_zero(data.std_dev().unwrap_or(0.0)),
            min: data.min(),
            max: data.max(),
        }
    }

    /// Summary using the population (n) standard deviation.
    pub fn population(values: &[f64]) -> Self {
        Self {
            std: or_zero(statrs::statistics::Statistics::population_std_dev(values)),
            ..Self::sample(values)
        }
    }
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).median()
}

/// Quantile `q` in `[0, 1]`, interpolating linearly between closest ranks.
///
/// statrs' `quantile` uses the R-8 estimator; delay percentiles are reported
/// with the numpy/pandas linear (R-7) definition instead.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pearson {
    pub r: f64,
    /// Two-tailed p-value for the null hypothesis `r = 0`.
    pub p_value: f64,
    pub n: usize,
}

/// Pearson's r over the first `min(x.len(), y.len())` pairs.
///
/// `None` when fewer than three pairs exist or either series is constant,
/// because r is undefined there.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Pearson> {
    use statrs::statistics::Statistics;

    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let denom = Statistics::std_dev(x) * Statistics::std_dev(y);
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    let r = (Statistics::covariance(x, y) / denom).clamp(-1.0, 1.0);
    if r.is_nan() {
        return None;
    }
    Some(Pearson {
        r,
        p_value: correlation_p_value(r, n)?,
        n,
    })
}

/// Two-tailed p-value of Student's t with `n - 2` degrees of freedom.
fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return Some(0.0);
    }
    let t = r * (df / one_minus_r2).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}
