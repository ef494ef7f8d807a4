use crate::term::{Term, Variable};
use thiserror::Error;

/// Everything that can go wrong while building terms, unifying, or searching.
///
/// Most variants describe a failed match and only ever prune one branch of a
/// search (see [`Error::is_branch_local`]). The rest mean the input itself is
/// malformed and are reported to the caller. Host functions may return either
/// kind: a branch-local error prunes, anything else ends the search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("values dont match: {left} != {right}")]
    ValueMismatch { left: Term, right: Term },

    #[error("keys must match: ({}) != ({})", .left.join(", "), .right.join(", "))]
    KeyMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("list lengths must be the same")]
    LengthMismatch,

    #[error("{variable} cannot equal {value} because {value} != {existing}")]
    InconsistentBinding {
        variable: Variable,
        value: Term,
        existing: Term,
    },

    #[error("assertion failed over ({0})")]
    AssertionFailed(String),

    #[error("{0} has no fixed value")]
    UnboundVariable(Variable),

    #[error("{0} must be hashable")]
    NotHashable(Term),

    #[error("{0}")]
    NotConstructible(String),

    #[error("invalid variable name {0:?}: must not be empty or begin with a lowercase letter")]
    InvalidVariableName(String),

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: Term },

    #[error("host function failed: {0}")]
    HostFunction(String),

    #[error("search exceeded the step limit of {0}")]
    StepLimitExceeded(usize),
}

impl Error {
    /// True if this failure only means "this alternative does not match".
    ///
    /// The search drops the branch and keeps going. Anything else is a
    /// malformed input and ends the search.
    pub fn is_branch_local(&self) -> bool {
        matches!(
            self,
            Error::ValueMismatch { .. }
                | Error::KeyMismatch { .. }
                | Error::LengthMismatch
                | Error::InconsistentBinding { .. }
                | Error::AssertionFailed(_)
                | Error::UnboundVariable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
