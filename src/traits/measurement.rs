use num_traits::Float;

/// A single measurement that may be missing
///
/// Both measurement series handed to the Bland-Altman computation are read
/// through this trait, so plain floats, optional floats and references to
/// either can be mixed freely. A floating point `NaN` is treated the same as
/// `None`: the entry is missing and is ignored by every reduction.
///
/// # Examples
///
/// ```
/// use bland_altman::Measurement;
///
/// assert_eq!(1.5_f64.value(), Some(1.5));
/// assert_eq!(f64::NAN.value(), None);
/// assert_eq!(Some(2.0_f32).value(), Some(2.0));
/// assert_eq!(None::<f32>.value(), None);
/// assert_eq!(Some(f64::NAN).value(), None);
/// ```
pub trait Measurement {
    /// Floating point type of the measured value
    type Value: Float;

    /// Returns the measured value, or `None` if it is missing
    ///
    /// # Returns
    ///
    /// * `Option<Self::Value>` - The value, `None` for a missing or `NaN` entry
    fn value(&self) -> Option<Self::Value>;
}

macro_rules! impl_measurement {
    ($($t:ty),*) => {
        $(
            impl Measurement for $t {
                type Value = $t;

                #[inline]
                fn value(&self) -> Option<$t> {
                    (!self.is_nan()).then_some(*self)
                }
            }

            impl Measurement for Option<$t> {
                type Value = $t;

                #[inline]
                fn value(&self) -> Option<$t> {
                    self.filter(|v| !v.is_nan())
                }
            }
        )*
    };
}

impl_measurement!(f32, f64);

impl<M: Measurement + ?Sized> Measurement for &M {
    type Value = M::Value;

    #[inline]
    fn value(&self) -> Option<Self::Value> {
        (**self).value()
    }
}
