use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Enum-like parameters are validated before any numeric work starts;
/// degenerate numeric inputs (empty signals, windows too short to assess)
/// are not errors and return well-defined empty/`None` values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A parameter value outside its allowed set: an unknown kind/direction
    /// name, or a malformed sequence (non-increasing indices, non-positive
    /// intervals).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-finite samples where finite numeric input is required.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Parameters that are individually valid but inconsistent together,
    /// e.g. an explicit sampling rate combined with an RR-unit input that
    /// already implies one.
    #[error("invalid combination: {0}")]
    InvalidCombination(String),
}

pub type Result<T> = std::result::Result<T, Error>;
