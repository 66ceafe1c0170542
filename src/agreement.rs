use num_traits::Float;

use crate::{BlandAltman, Error, Measurement};

/// Standard normal quantile bounding the limits of agreement (about 95% of differences)
pub const LIMIT_Z: f64 = 1.96;

/// Summary of the agreement between two measurement methods
///
/// Produced by [`bland_altman`] and [`BlandAltman::agreement`]. Every
/// statistic ignores missing entries; a statistic that cannot be computed
/// (no complete pair) is `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agreement<T> {
    /// Mean of the differences (bias)
    pub mean_diff: T,
    /// Standard deviation of the differences
    pub std_diff: T,
    /// Root mean square of the differences
    pub rmse: T,
    /// Upper limit of agreement, `mean_diff + 1.96 * std_diff`
    pub upper_limit: T,
    /// Lower limit of agreement, `mean_diff - 1.96 * std_diff`
    pub lower_limit: T,
    /// Larger of `|upper_limit|` and `|lower_limit|`
    pub max_abs_limit: T,
    /// Number of complete pairs the statistics were computed from
    pub count: usize,
    /// Fraction of complete differences within the limits of agreement
    pub coverage: T,
}

impl<T: Float> Agreement<T> {
    /// Returns `true` if the statistics could be computed
    pub fn is_defined(&self) -> bool {
        !self.mean_diff.is_nan() && !self.std_diff.is_nan()
    }

    /// Returns the six Bland-Altman statistics as a tuple
    ///
    /// # Returns
    ///
    /// * `(T, T, T, T, T, T)` - `(mean_diff, std_diff, rmse, upper_limit, lower_limit, max_abs_limit)`
    pub fn into_tuple(self) -> (T, T, T, T, T, T) {
        (
            self.mean_diff,
            self.std_diff,
            self.rmse,
            self.upper_limit,
            self.lower_limit,
            self.max_abs_limit,
        )
    }
}

/// Computes the Bland-Altman agreement statistics of two paired measurement series
///
/// Pairs with a missing entry (`NaN` or `None`) are ignored. The standard
/// deviation uses the population denominator; use [`BlandAltman::set_ddof`]
/// for the sample one.
///
/// # Arguments
///
/// * `data1` - The measurements of the first method
/// * `data2` - The measurements of the second method, paired by position
///
/// # Returns
///
/// * `Result<Agreement<T>, Error>` - The agreement summary, or
///   [`Error::LengthMismatch`] if the series differ in length
///
/// # Examples
///
/// ```
/// use bland_altman::bland_altman;
/// use assert_approx_eq::assert_approx_eq;
///
/// let agreement = bland_altman(&[10.0_f64, 12.0, 14.0], &[9.0, 13.0, 13.0]).unwrap();
///
/// assert_approx_eq!(agreement.mean_diff, 0.333333, 1e-6);
/// assert_approx_eq!(agreement.std_diff, 0.942809, 1e-6);
/// assert_approx_eq!(agreement.rmse, 1.0, 1e-12);
/// assert_approx_eq!(agreement.upper_limit, 2.181239, 1e-6);
/// assert_approx_eq!(agreement.lower_limit, -1.514572, 1e-6);
/// assert_approx_eq!(agreement.max_abs_limit, 2.181239, 1e-6);
/// ```
pub fn bland_altman<T, A, B>(data1: &[A], data2: &[B]) -> Result<Agreement<T>, Error>
where
    T: Default + Clone + Float,
    A: Measurement<Value = T>,
    B: Measurement<Value = T>,
{
    let mut stats = BlandAltman::new();
    stats.extend_from_slices(data1, data2)?;
    Ok(stats.agreement())
}
