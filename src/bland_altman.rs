use alloc::vec::Vec;

use num_traits::Float;

use crate::{
    Agreement, Error, Kbn, LIMIT_Z, Measurement,
    helper::{pair_mean, variance_about},
};

/// Accumulates paired measurements and computes Bland-Altman agreement statistics.
///
/// `BlandAltman<T>` consumes pairs of measurements taken by two methods on the
/// same subjects. For every pair it records the mean of the pair and the
/// difference between the two methods, and keeps compensated running sums of
/// the differences so the bias, spread and RMSE are available at any point.
///
/// Missing entries (`NaN` or `None`) are ignored by every statistic: a pair
/// contributes to the statistics only when both measurements are present.
///
/// The sums use the Kahan-Babuska-Neumaier algorithm. The spread is taken in
/// a second pass over the stored differences about their mean, so a large
/// bias does not cancel it out. Feeding the pairs one by one or as whole
/// slices gives the same result.
#[derive(Debug, Clone)]
pub struct BlandAltman<T> {
    /// Delta Degrees of Freedom
    ddof: bool,
    /// Mean of every pair, `NaN` when both entries are missing
    mean_values: Vec<T>,
    /// Difference of every pair, `NaN` when either entry is missing
    differences: Vec<T>,
    /// Number of complete pairs
    count: usize,
    /// Sum of differences
    sum: Kbn<T>,
    /// Sum of squared differences
    sum_sq: Kbn<T>,
    /// Largest pair mean seen, including pairs with one missing entry
    max_mean: Option<T>,
}

impl<T> Default for BlandAltman<T>
where
    T: Default + Clone + Float,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlandAltman<T>
where
    T: Default + Clone + Float,
{
    /// Creates a new, empty `BlandAltman` instance
    ///
    /// # Returns
    ///
    /// * `Self` - The `BlandAltman` instance
    pub fn new() -> Self {
        Self {
            ddof: false,
            mean_values: Vec::new(),
            differences: Vec::new(),
            count: 0,
            sum: Kbn::default(),
            sum_sq: Kbn::default(),
            max_mean: None,
        }
    }

    /// Resets the statistics, keeping the Delta Degrees of Freedom setting
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The statistics object
    pub fn reset(&mut self) -> &mut Self {
        self.mean_values.clear();
        self.differences.clear();
        self.count = 0;
        self.sum = Kbn::default();
        self.sum_sq = Kbn::default();
        self.max_mean = None;
        self
    }

    /// Returns the Delta Degrees of Freedom
    ///
    /// # Returns
    ///
    /// * `bool` - `false` for the population standard deviation, `true` for the sample one
    pub const fn ddof(&self) -> bool {
        self.ddof
    }

    /// Sets the Delta Degrees of Freedom
    ///
    /// The default, `false`, divides the squared deviations by `n`. Setting it
    /// divides by `n - 1` instead.
    ///
    /// # Arguments
    ///
    /// * `ddof` - The Delta Degrees of Freedom
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The statistics object
    pub const fn set_ddof(&mut self, ddof: bool) -> &mut Self {
        self.ddof = ddof;
        self
    }

    /// Updates the statistics with a new measurement pair
    ///
    /// # Arguments
    ///
    /// * `value` - The pair `(a, b)` measured by the first and second method
    ///
    /// # Returns
    ///
    /// * `&mut Self` - The updated statistics object for method chaining
    ///
    /// # Examples
    ///
    /// ```
    /// use bland_altman::BlandAltman;
    ///
    /// let mut stats = BlandAltman::<f64>::new();
    /// stats.next((10.0, 9.0)).next((12.0, f64::NAN)).next((14.0, 13.0));
    ///
    /// assert_eq!(stats.len(), 3);
    /// assert_eq!(stats.count(), 2);
    /// assert_eq!(stats.mean_diff(), Some(1.0));
    /// ```
    pub fn next<A, B>(&mut self, (a, b): (A, B)) -> &mut Self
    where
        A: Measurement<Value = T>,
        B: Measurement<Value = T>,
    {
        let (a, b) = (a.value(), b.value());

        let mean = pair_mean(a, b);
        if !mean.is_nan() {
            self.max_mean = Some(self.max_mean.map_or(mean, |max| max.max(mean)));
        }
        self.mean_values.push(mean);

        match a.zip(b) {
            Some((a, b)) => {
                let diff = a - b;
                self.count += 1;
                self.sum += diff;
                self.sum_sq += diff * diff;
                self.differences.push(diff);
            }
            None => self.differences.push(T::nan()),
        }

        self
    }

    /// Updates the statistics with two whole measurement series
    ///
    /// The series are checked before any pair is consumed, so a length
    /// mismatch leaves the statistics untouched.
    ///
    /// # Arguments
    ///
    /// * `data1` - The measurements of the first method
    /// * `data2` - The measurements of the second method
    ///
    /// # Returns
    ///
    /// * `Result<&mut Self, Error>` - The updated statistics object, or
    ///   [`Error::LengthMismatch`] if the series differ in length
    pub fn extend_from_slices<A, B>(&mut self, data1: &[A], data2: &[B]) -> Result<&mut Self, Error>
    where
        A: Measurement<Value = T>,
        B: Measurement<Value = T>,
    {
        if data1.len() != data2.len() {
            return Err(Error::LengthMismatch {
                left: data1.len(),
                right: data2.len(),
            });
        }

        self.mean_values.reserve(data1.len());
        self.differences.reserve(data1.len());
        data1.iter().zip(data2).for_each(|pair| {
            self.next(pair);
        });

        Ok(self)
    }

    /// Returns the number of pairs consumed, complete or not
    ///
    /// # Returns
    ///
    /// * `usize` - The number of pairs
    pub fn len(&self) -> usize {
        self.mean_values.len()
    }

    /// Returns the number of complete pairs
    ///
    /// # Returns
    ///
    /// * `usize` - The number of pairs with both measurements present
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the mean of every pair
    ///
    /// # Returns
    ///
    /// * `&[T]` - The pair means in input order, `NaN` where both entries are missing
    pub fn mean_values(&self) -> &[T] {
        &self.mean_values
    }

    /// Returns the difference of every pair
    ///
    /// # Returns
    ///
    /// * `&[T]` - The differences `a - b` in input order, `NaN` where either entry is missing
    pub fn differences(&self) -> &[T] {
        &self.differences
    }

    /// Returns the `(mean, difference)` points of the complete pairs
    ///
    /// # Returns
    ///
    /// * `impl Iterator<Item = (T, T)>` - The points of the Bland-Altman scatter
    pub fn points(&self) -> impl Iterator<Item = (T, T)> + '_ {
        self.mean_values
            .iter()
            .zip(&self.differences)
            .filter(|(_, d)| !d.is_nan())
            .map(|(m, d)| (*m, *d))
    }

    /// Returns the largest pair mean
    ///
    /// Pairs with a single missing entry take the present value as their mean
    /// and are included.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The largest pair mean, or `None` if no pair has a present value
    pub fn max_mean(&self) -> Option<T> {
        self.max_mean
    }

    fn n(&self) -> Option<T> {
        (self.count > 0).then(|| T::from(self.count)).flatten()
    }

    fn mean_sq(&self) -> Option<T> {
        self.n().map(|n| self.sum_sq.total() / n)
    }

    fn z() -> Option<T> {
        T::from(LIMIT_Z)
    }

    /// Returns the mean difference (bias) between the two methods
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The mean difference, or `None` if there is no complete pair
    ///
    /// # Examples
    ///
    /// ```
    /// use bland_altman::BlandAltman;
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let mut stats = BlandAltman::<f64>::new();
    /// stats.extend_from_slices(&[10.0, 12.0, 14.0], &[9.0, 13.0, 13.0]).unwrap();
    ///
    /// assert_approx_eq!(stats.mean_diff().unwrap(), 1.0 / 3.0, 1e-12);
    /// ```
    pub fn mean_diff(&self) -> Option<T> {
        self.n().map(|n| self.sum.total() / n)
    }

    /// Returns the standard deviation of the differences
    ///
    /// Uses the population denominator `n` unless the Delta Degrees of
    /// Freedom is set.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The standard deviation, or `None` if there is no complete
    ///   pair (or only one with the Delta Degrees of Freedom set)
    ///
    /// # Examples
    ///
    /// ```
    /// use bland_altman::BlandAltman;
    /// use assert_approx_eq::assert_approx_eq;
    ///
    /// let mut stats = BlandAltman::<f64>::new();
    /// stats.extend_from_slices(&[10.0, 12.0, 14.0], &[9.0, 13.0, 13.0]).unwrap();
    /// assert_approx_eq!(stats.std_diff().unwrap(), 0.942809, 1e-6);
    ///
    /// stats.set_ddof(true);
    /// assert_approx_eq!(stats.std_diff().unwrap(), 1.154701, 1e-6);
    /// ```
    pub fn std_diff(&self) -> Option<T> {
        self.mean_diff().and_then(|mean| self.std_about(mean))
    }

    fn std_about(&self, mean: T) -> Option<T> {
        let complete = self.differences.iter().copied().filter(|d| !d.is_nan());
        variance_about(complete, mean, self.count, self.ddof).map(Float::sqrt)
    }

    /// Returns the `(lower, upper)` limits of agreement
    fn limits(&self) -> Option<(T, T)> {
        let mean = self.mean_diff()?;
        let margin = Self::z()? * self.std_about(mean)?;
        Some((mean - margin, mean + margin))
    }

    /// Returns the root mean square of the differences
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The RMSE, or `None` if there is no complete pair
    pub fn rmse(&self) -> Option<T> {
        self.mean_sq().map(Float::sqrt)
    }

    /// Returns the upper limit of agreement, `mean_diff + 1.96 * std_diff`
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The upper limit, or `None` if the spread is undefined
    pub fn upper_limit(&self) -> Option<T> {
        self.limits().map(|(_, upper)| upper)
    }

    /// Returns the lower limit of agreement, `mean_diff - 1.96 * std_diff`
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The lower limit, or `None` if the spread is undefined
    pub fn lower_limit(&self) -> Option<T> {
        self.limits().map(|(lower, _)| lower)
    }

    /// Returns the larger of the absolute limits of agreement
    ///
    /// # Returns
    ///
    /// * `Option<T>` - `max(|upper_limit|, |lower_limit|)`, or `None` if the limits are undefined
    pub fn max_abs_limit(&self) -> Option<T> {
        self.limits().map(|(lower, upper)| upper.abs().max(lower.abs()))
    }

    /// Returns the fraction of complete differences within the limits of agreement
    ///
    /// Under a normal distribution of the differences about 95% of them are
    /// expected to lie within the limits.
    ///
    /// # Returns
    ///
    /// * `Option<T>` - The covered fraction in `[0, 1]`, or `None` if the limits are undefined
    pub fn coverage(&self) -> Option<T> {
        self.limits()
            .and_then(|(lower, upper)| self.coverage_within(lower, upper))
    }

    fn coverage_within(&self, lower: T, upper: T) -> Option<T> {
        let within = self
            .points()
            .filter(|&(_, d)| d >= lower && d <= upper)
            .count();
        Some(T::from(within)? / self.n()?)
    }

    /// Returns the summary of the agreement between the two methods
    ///
    /// Statistics that cannot be computed are reported as `NaN`, and a
    /// warning is logged when there is no complete pair.
    ///
    /// # Returns
    ///
    /// * `Agreement<T>` - The six Bland-Altman statistics with the pair count and coverage
    pub fn agreement(&self) -> Agreement<T> {
        if self.count == 0 {
            log::warn!(
                "no complete pairs among {} measurement pairs, agreement statistics are undefined",
                self.len()
            );
        }

        let nan = T::nan();
        let mean_diff = self.mean_diff();
        let std_diff = mean_diff.and_then(|mean| self.std_about(mean));
        let limits = mean_diff
            .zip(std_diff)
            .zip(Self::z())
            .map(|((mean, std), z)| (mean - z * std, mean + z * std));

        let agreement = Agreement {
            mean_diff: mean_diff.unwrap_or(nan),
            std_diff: std_diff.unwrap_or(nan),
            rmse: self.rmse().unwrap_or(nan),
            upper_limit: limits.map_or(nan, |(_, upper)| upper),
            lower_limit: limits.map_or(nan, |(lower, _)| lower),
            max_abs_limit: limits.map_or(nan, |(lower, upper)| upper.abs().max(lower.abs())),
            count: self.count,
            coverage: limits
                .and_then(|(lower, upper)| self.coverage_within(lower, upper))
                .unwrap_or(nan),
        };
        log::debug!(
            "bland-altman agreement over {} of {} pairs: bias={} sd={} rmse={}",
            agreement.count,
            self.len(),
            agreement.mean_diff.to_f64().unwrap_or(f64::NAN),
            agreement.std_diff.to_f64().unwrap_or(f64::NAN),
            agreement.rmse.to_f64().unwrap_or(f64::NAN)
        );
        agreement
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alloc::{vec, vec::Vec};

    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn streaming_matches_batch() {
        let data1 = [1_000_000.1_f64, 1_000_000.2, 999_999.7, 1_000_000.4, 1_000_000.0];
        let data2 = [1_000_000.0, 1_000_000.3, 999_999.9, 1_000_000.1, 1_000_000.0];

        let mut batch = BlandAltman::<f64>::new();
        batch.extend_from_slices(&data1, &data2).unwrap();

        let mut streaming = BlandAltman::<f64>::new();
        data1.iter().zip(&data2).for_each(|pair| {
            streaming.next(pair);
        });

        assert_eq!(batch.mean_diff(), streaming.mean_diff());
        assert_eq!(batch.std_diff(), streaming.std_diff());
        assert_eq!(batch.rmse(), streaming.rmse());
        assert_approx_eq!(batch.mean_diff().unwrap(), 0.02, 1e-6);
    }

    #[test]
    fn large_bias_keeps_its_spread() {
        let mut stats = BlandAltman::<f64>::new();
        stats
            .extend_from_slices(&[1e8 + 1.0, 1e8 - 1.0, 1e8 + 1.0], &[0.0; 3])
            .unwrap();

        assert_approx_eq!(stats.std_diff().unwrap(), (8.0_f64 / 9.0).sqrt(), 1e-6);
        let (lower, upper) = (stats.lower_limit().unwrap(), stats.upper_limit().unwrap());
        assert!(upper - lower > 3.0);
        assert_approx_eq!(stats.coverage().unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn offset_data_matches_two_pass_reference() {
        let data1 = [
            250_000.125_f64,
            250_000.5,
            249_999.875,
            250_000.75,
            250_000.0,
            250_000.25,
        ];
        let data2 = [0.0_f64; 6];

        let mut stats = BlandAltman::<f64>::new();
        stats.extend_from_slices(&data1, &data2).unwrap();

        let n = data1.len() as f64;
        let mean = data1.iter().sum::<f64>() / n;
        let var = data1.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / n;

        assert_approx_eq!(stats.mean_diff().unwrap(), mean, 1e-9);
        assert_approx_eq!(stats.std_diff().unwrap(), var.sqrt(), 1e-9);

        stats.set_ddof(true);
        assert_approx_eq!(stats.std_diff().unwrap(), (var * n / (n - 1.0)).sqrt(), 1e-9);
    }

    #[test]
    fn f32_offset_data_matches_two_pass_reference() {
        let data1 = [1000.1_f32, 1000.3, 1000.2, 1000.4];
        let data2 = [0.0_f32; 4];

        let mut stats = BlandAltman::<f32>::new();
        stats.extend_from_slices(&data1, &data2).unwrap();

        let wide: Vec<f64> = data1.iter().map(|&d| f64::from(d)).collect();
        let n = wide.len() as f64;
        let mean = wide.iter().sum::<f64>() / n;
        let std = (wide.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / n).sqrt();

        let std_diff = stats.std_diff().unwrap();
        assert!(std_diff > 0.1);
        assert_approx_eq!(f64::from(std_diff), std, 1e-4);
        assert_approx_eq!(f64::from(std_diff), 0.1118, 1e-3);
    }

    #[test]
    fn missing_entries_are_ignored() {
        let data1 = [Some(10.0), None, Some(14.0), Some(f64::NAN), Some(20.0)];
        let data2 = [Some(9.0), Some(11.0), Some(13.0), Some(16.0), None];

        let mut stats = BlandAltman::<f64>::new();
        stats.extend_from_slices(&data1, &data2).unwrap();

        assert_eq!(stats.len(), 5);
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.mean_diff(), Some(1.0));
        assert_eq!(stats.std_diff(), Some(0.0));
        assert_eq!(stats.rmse(), Some(1.0));

        let means = stats.mean_values();
        assert_eq!(means, &[9.5, 11.0, 13.5, 16.0, 20.0]);
        let diffs = stats.differences();
        assert_eq!(diffs[0], 1.0);
        assert!(diffs[1].is_nan());
        assert_eq!(diffs[2], 1.0);
        assert!(diffs[3].is_nan());
        assert!(diffs[4].is_nan());

        assert_eq!(stats.max_mean(), Some(20.0));
        assert_eq!(stats.points().collect::<Vec<_>>(), vec![(9.5, 1.0), (13.5, 1.0)]);
    }

    #[test]
    fn fully_missing_pair_has_nan_mean() {
        let mut stats = BlandAltman::<f64>::new();
        stats.next((None::<f64>, f64::NAN));

        assert!(stats.mean_values()[0].is_nan());
        assert_eq!(stats.max_mean(), None);
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.mean_diff(), None);
        assert_eq!(stats.std_diff(), None);
        assert_eq!(stats.rmse(), None);
        assert_eq!(stats.upper_limit(), None);
        assert_eq!(stats.max_abs_limit(), None);
        assert_eq!(stats.coverage(), None);
    }

    #[test]
    fn length_mismatch_leaves_state_untouched() {
        let mut stats = BlandAltman::<f64>::new();
        stats.next((1.0, 2.0));

        let err = stats
            .extend_from_slices(&[1.0, 2.0, 3.0], &[1.0, 2.0])
            .unwrap_err();
        assert_eq!(err, Error::LengthMismatch { left: 3, right: 2 });
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.mean_diff(), Some(-1.0));
    }

    #[test]
    fn limits_are_symmetric_about_bias() {
        let mut stats = BlandAltman::<f64>::new();
        stats
            .extend_from_slices(&[4.1, 5.3, 6.0, 7.9, 3.2, 5.5], &[4.0, 5.9, 5.4, 7.1, 3.6, 5.0])
            .unwrap();

        let mean = stats.mean_diff().unwrap();
        let std = stats.std_diff().unwrap();
        let upper = stats.upper_limit().unwrap();
        let lower = stats.lower_limit().unwrap();

        assert_approx_eq!(upper - lower, 2.0 * 1.96 * std, 1e-12);
        assert_approx_eq!((upper + lower) / 2.0, mean, 1e-12);
        assert_eq!(stats.max_abs_limit().unwrap(), upper.abs().max(lower.abs()));
    }

    #[test]
    fn coverage_counts_differences_inside_limits() {
        let mut stats = BlandAltman::<f64>::new();
        let data2 = [0.0; 10];
        let data1 = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        stats.extend_from_slices(&data1, &data2).unwrap();

        // mean 1, std 3, limits [-4.88, 6.88]: the outlier falls outside
        assert_approx_eq!(stats.std_diff().unwrap(), 3.0, 1e-12);
        assert_approx_eq!(stats.coverage().unwrap(), 0.9, 1e-12);
    }

    #[test]
    fn ddof_requires_two_pairs() {
        let mut stats = BlandAltman::<f64>::new();
        stats.set_ddof(true).next((3.0, 1.0));

        assert_eq!(stats.mean_diff(), Some(2.0));
        assert_eq!(stats.std_diff(), None);
        assert_eq!(stats.rmse(), Some(2.0));
    }

    #[test]
    fn reset_keeps_ddof() {
        let mut stats = BlandAltman::<f64>::new();
        stats.set_ddof(true).next((3.0, 1.0)).next((5.0, 1.0));
        stats.reset();

        assert!(stats.ddof());
        assert_eq!(stats.len(), 0);
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.max_mean(), None);
        assert_eq!(stats.mean_diff(), None);
    }

    #[test]
    fn works_with_f32() {
        let mut stats = BlandAltman::<f32>::new();
        stats
            .extend_from_slices(&[10.0_f32, 12.0, 14.0], &[9.0_f32, 13.0, 13.0])
            .unwrap();

        assert_approx_eq!(stats.rmse().unwrap(), 1.0_f32, 1e-6);
        assert_approx_eq!(stats.std_diff().unwrap(), 0.942809_f32, 1e-5);
    }
}
