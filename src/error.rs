// src/error.rs
use thiserror::Error;

/// Library-wide error for gr-kfilter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KfError {
    /// Construction parameters rejected (`k <= 1` or `delay_constraint < k`).
    #[error("kfilter: invalid configuration: {what}")]
    InvalidConfig { what: &'static str },
}

pub type KfResult<T> = Result<T, KfError>;
