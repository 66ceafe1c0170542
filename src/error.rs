use alloc::string::String;

/// Errors raised while computing or drawing a Bland-Altman analysis
///
/// Numeric undefinedness (for example, every pair has a missing entry) is not
/// an error: it shows up as `NaN` in [`Agreement`](crate::Agreement) and as
/// `None` from the [`BlandAltman`](crate::BlandAltman) getters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The two measurement series do not have the same length
    #[error("length mismatch: first series has {left} values, second series has {right}")]
    LengthMismatch {
        /// Length of the first series
        left: usize,
        /// Length of the second series
        right: usize,
    },

    /// No pair has both measurements present, so there is nothing to plot
    #[error("no complete measurement pairs to plot")]
    NoCompletePairs,

    /// The drawing backend failed to render or present the chart
    #[error("drawing failed: {0}")]
    Drawing(String),
}
