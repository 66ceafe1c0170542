#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "plot"), no_std)]
#![deny(
    unsafe_code,
    unused_imports,
    unused_variables,
    unused_must_use,
    missing_docs,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(clippy::just_underscores_and_digits, clippy::len_without_is_empty)]

extern crate alloc;

pub(crate) type Kbn<T> = compensated_summation::KahanBabuskaNeumaier<T>;

mod utils;
pub(crate) use utils::helper;

mod traits;
pub use traits::Measurement;

mod error;
pub use error::Error;

mod bland_altman;
pub use bland_altman::BlandAltman;

mod agreement;
pub use agreement::{Agreement, LIMIT_Z, bland_altman};

#[cfg(feature = "plot")]
pub mod plot;
#[cfg(feature = "plot")]
pub use plot::{PlotStyle, bland_altman_plot};
