// Copyright 2022 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use thiserror::Error;

/// Errors produced by the aperture engine.
///
/// Nothing is retried internally; every error is surfaced to the call
/// site. `InternalInvariantViolated` indicates a bug in the engine
/// itself rather than a caller mistake.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    /// A pattern, control array, or configuration value was missing or
    /// out of its allowed range.
    InvalidArgument(String),

    #[error("size mismatch: {0}")]
    /// A destination or control array does not match the source's
    /// dimensions or length.
    SizeMismatch(String),

    #[error("index range exceeded: {0}")]
    /// The extended (continuation) dimensions or total element count
    /// would overflow the index type.
    OutOfIndexRange(String),

    #[error("internal invariant violated at index {index}: {detail}")]
    /// A histogram bucket count went negative, or a rank difference was
    /// significantly negative. Should be impossible; indicates a bug.
    InternalInvariantViolated { index: usize, detail: String },

    #[error("operation cancelled")]
    /// The `ArrayContext` signaled cancellation at a loop boundary.
    Cancelled,
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn size_mismatch(msg: impl Into<String>) -> Self {
        Error::SizeMismatch(msg.into())
    }

    pub fn out_of_index_range(msg: impl Into<String>) -> Self {
        Error::OutOfIndexRange(msg.into())
    }

    pub fn invariant(index: usize, detail: impl Into<String>) -> Self {
        Error::InternalInvariantViolated {
            index,
            detail: detail.into(),
        }
    }
}
