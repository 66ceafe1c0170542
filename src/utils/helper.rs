use num_traits::Float;

use crate::Kbn;

/// Returns the mean of the present values of a pair, ignoring a missing side
///
/// # Arguments
///
/// * `a` - The first value of the pair
/// * `b` - The second value of the pair
///
/// # Returns
///
/// * `T` - The mean of the present values, `NaN` if both are missing
#[inline]
pub fn pair_mean<T: Float>(a: Option<T>, b: Option<T>) -> T {
    let _2 = T::one() + T::one();
    match (a, b) {
        (Some(a), Some(b)) => (a + b) / _2,
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => T::nan(),
    }
}

/// Returns the variance of the values about a known mean
///
/// The squared deviations are summed with Kahan-Babuska-Neumaier compensation.
///
/// # Arguments
///
/// * `values` - The values, already stripped of missing entries
/// * `mean` - The mean of the values
/// * `n` - The number of values
/// * `ddof` - Whether to use the sample (`n - 1`) denominator
///
/// # Returns
///
/// * `Option<T>` - The variance, or `None` if the denominator is zero
#[inline]
pub fn variance_about<T>(values: impl Iterator<Item = T>, mean: T, n: usize, ddof: bool) -> Option<T>
where
    T: Default + Float,
{
    let denom = if ddof { n.checked_sub(1)? } else { n };
    if denom == 0 {
        return None;
    }
    let mut sum_dev_sq = Kbn::default();
    values.for_each(|v| {
        let dev = v - mean;
        sum_dev_sq += dev * dev;
    });
    Some(sum_dev_sq.total() / T::from(denom)?)
}
