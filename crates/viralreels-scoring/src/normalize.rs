//! Outlier-robust min-max normalization.

/// Cohorts smaller than this use plain `[min, max]` bounds.
const PERCENTILE_MIN_SAMPLES: usize = 5;
const LOWER_PERCENTILE: f64 = 0.05;
const UPPER_PERCENTILE: f64 = 0.95;

/// Inclusive range that raw values are capped into before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    #[must_use]
    pub fn cap(&self, value: f64) -> f64 {
        finite_or_zero(value).max(self.lower).min(self.upper)
    }

    /// Caps `value` and maps it onto `[0, 1]`. Degenerate bounds yield `0.0`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.upper - self.lower;
        if !range.is_finite() || range <= 0.0 {
            return 0.0;
        }
        (self.cap(value) - self.lower) / range
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Linear-interpolated percentile over an ascending slice.
///
/// Uses index `(n - 1) * p`, interpolating between the floor and ceiling
/// neighbours. Returns `0.0` for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    let index = (sorted.len() - 1) as f64 * p;
    let lo = index.floor() as usize;
    let hi = index.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = index - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

/// Computes the capping bounds for one signal across a cohort.
///
/// Non-finite values count as `0.0`.
#[must_use]
pub fn outlier_bounds(values: &[f64]) -> Bounds {
    let mut sorted: Vec<f64> = values.iter().copied().map(finite_or_zero).collect();
    if sorted.is_empty() {
        return Bounds {
            lower: 0.0,
            upper: 0.0,
        };
    }
    sorted.sort_by(f64::total_cmp);

    if sorted.len() < PERCENTILE_MIN_SAMPLES {
        return Bounds {
            lower: sorted[0],
            upper: sorted[sorted.len() - 1],
        };
    }

    Bounds {
        lower: percentile(&sorted, LOWER_PERCENTILE),
        upper: percentile(&sorted, UPPER_PERCENTILE),
    }
}

/// Normalizes every value of one signal against the cohort's own bounds.
#[must_use]
pub fn normalize_batch(values: &[f64]) -> Vec<f64> {
    let bounds = outlier_bounds(values);
    values.iter().map(|v| bounds.normalize(*v)).collect()
}
