#![forbid(unsafe_code)]

//! Errors for list changes and list mutation.

use ftui_reactive::ListenerError;
use thiserror::Error;

/// Misuse of a [`ListChange`](crate::ListChange) cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChangeError {
    /// A facet was queried before the first `next()`.
    #[error("invalid change state: next() must be called before inspecting the change")]
    NotStarted,
    /// A facet was queried after `next()` returned `false`.
    #[error("invalid change state: the change has no more steps")]
    Exhausted,
    /// `permutation()` was called on a step that is not a permutation.
    #[error("the current step is not a permutation")]
    NoPermutation,
    /// `permutation(index)` was called outside the step's `[from, to)` range.
    #[error("permutation index {index} outside [{from}, {to})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Start of the step.
        from: usize,
        /// End of the step (exclusive).
        to: usize,
    },
}

/// Rejected list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    /// An index was past the end of the list.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Length of the list.
        len: usize,
    },
    /// A range was reversed or extended past the end of the list.
    #[error("range {from}..{to} invalid for length {len}")]
    InvalidRange {
        /// Range start.
        from: usize,
        /// Range end (exclusive).
        to: usize,
        /// Length of the list.
        len: usize,
    },
}

impl From<ChangeError> for ListenerError {
    fn from(error: ChangeError) -> Self {
        ListenerError::new(error.to_string())
    }
}

impl From<ListError> for ListenerError {
    fn from(error: ListError) -> Self {
        ListenerError::new(error.to_string())
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<(), ListError> {
    if index < len {
        Ok(())
    } else {
        Err(ListError::IndexOutOfBounds { index, len })
    }
}

/// Like [`check_index`], but `index == len` (an insertion point) is valid.
pub(crate) fn check_position(index: usize, len: usize) -> Result<(), ListError> {
    if index <= len {
        Ok(())
    } else {
        Err(ListError::IndexOutOfBounds { index, len })
    }
}

pub(crate) fn check_range(from: usize, to: usize, len: usize) -> Result<(), ListError> {
    if from <= to && to <= len {
        Ok(())
    } else {
        Err(ListError::InvalidRange { from, to, len })
    }
}
