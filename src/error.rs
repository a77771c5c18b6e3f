//! Failure modes of the reconstruction pipeline.
//!
//! Only `FatalAllocation`, `MissingInput` and `PreconditionViolation` (plus
//! the I/O and parsing errors that amount to missing input) change the exit
//! code of the binaries; `DimensionMismatch` is reported and the affected step
//! is skipped.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RadonError {
    #[error("memory allocation for {what} ({bytes} bytes) failed")]
    FatalAllocation { what: &'static str, bytes: usize },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("dimension mismatch in {what}: expected {expected:?}, found {found:?}")]
    DimensionMismatch { what: &'static str, expected: Vec<usize>, found: Vec<usize> },

    #[error("{0}")]
    PreconditionViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{path}: malformed volume file: {source}")]
    Format { path: PathBuf, source: binrw::Error },

    #[error("{path}: malformed project file: {source}")]
    Project { path: PathBuf, source: toml::de::Error },

    #[error("could not serialize project: {0}")]
    ProjectOutput(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, RadonError>;

impl RadonError {

    /// Whether this error must abort a driver with a non-zero exit code.
    pub fn is_fatal(&self) -> bool { !matches!(self, Self::DimensionMismatch { .. }) }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn mismatch(what: &'static str, expected: &[usize], found: &[usize]) -> Self {
        Self::DimensionMismatch { what, expected: expected.to_vec(), found: found.to_vec() }
    }
}

/// Reserve room for `additional` more elements, reporting failure as
/// `FatalAllocation` rather than aborting.
pub(crate) fn try_reserve<T>(v: &mut Vec<T>, additional: usize, what: &'static str) -> Result<()> {
    v.try_reserve(additional)
        .map_err(|_| RadonError::FatalAllocation { what, bytes: additional * std::mem::size_of::<T>() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dimension_mismatch_is_recoverable() {
        assert!(!RadonError::mismatch("mask", &[4, 4], &[2, 2]).is_fatal());
        assert!( RadonError::MissingInput("nothing".into()).is_fatal());
        assert!( RadonError::PreconditionViolation("no mask".into()).is_fatal());
        assert!( RadonError::FatalAllocation { what: "table", bytes: 8 }.is_fatal());
    }

    #[test]
    fn messages_name_the_problem() {
        let e = RadonError::mismatch("coverage mask", &[8, 8], &[4, 8]);
        assert_eq!(e.to_string(), "dimension mismatch in coverage mask: expected [8, 8], found [4, 8]");
    }

    #[test]
    fn reserve_reports_absurd_requests() {
        let mut v: Vec<u64> = Vec::new();
        let e = try_reserve(&mut v, usize::MAX / 4, "lookup table").unwrap_err();
        assert!(matches!(e, RadonError::FatalAllocation { what: "lookup table", .. }));
    }
}
