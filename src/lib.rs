//! Three-dimensional Radon transforms of volumes, and reconstruction of a
//! Radon transform directly from oriented particle images.

pub mod error;
pub mod verbosity;
pub mod utils;
pub mod volume;
pub mod io;
pub mod project;

pub mod fft;
pub mod kernel;
pub mod gridding;
pub mod apodize;
pub mod transform;
pub mod pocs;

pub mod lut;
pub mod backproject;
pub mod coverage;
pub mod driver;

pub use error::{RadonError, Result};
pub use verbosity::Verbosity;
pub use volume::Volume;
