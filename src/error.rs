//! Error taxonomy for the filament-sliding simulator.
//!
//! Follows the taxonomy of spec §7: `InvariantBroken` and
//! `PreconditionViolated` are fatal aborts surfaced to the caller;
//! `InputMalformed` is recoverable (the CLI may retry with a default
//! parameter file); `NumericInstability` is raised at construction time
//! wherever possible. `BoundaryClamp` is deliberately not a variant
//! here — it is a non-fatal counter tracked on `Propagator`.

use crate::linker::LinkerId;
use thiserror::Error;

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, FilamentSlidingError>;

/// Errors produced by the simulator core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilamentSlidingError {
    /// A filament deque desynced from site state, a linker ended up in
    /// an impossible state, or an event table referenced a linker that
    /// no longer exists in the state it claims.
    #[error("invariant broken: {detail}")]
    InvariantBroken {
        detail: String,
        linker: Option<LinkerId>,
    },

    /// Parameter file header, ordering, type, or value out of range.
    #[error("malformed input: {detail}")]
    InputMalformed { detail: String },

    /// API misuse by a `Reaction` (e.g. `BindFree` fired with no free
    /// linker of the required type left).
    #[error("precondition violated: {detail}")]
    PreconditionViolated { detail: String },

    /// The time step is too large relative to the lattice spacing, or a
    /// reaction rate overflowed.
    #[error("numeric instability: {detail}")]
    NumericInstability { detail: String },

    /// Wraps I/O failures from parameter/output file handling.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FilamentSlidingError {
    fn from(err: std::io::Error) -> Self {
        FilamentSlidingError::Io(err.to_string())
    }
}

impl FilamentSlidingError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        FilamentSlidingError::InvariantBroken {
            detail: detail.into(),
            linker: None,
        }
    }

    pub fn invariant_at(detail: impl Into<String>, linker: LinkerId) -> Self {
        FilamentSlidingError::InvariantBroken {
            detail: detail.into(),
            linker: Some(linker),
        }
    }

    pub fn precondition(detail: impl Into<String>) -> Self {
        FilamentSlidingError::PreconditionViolated {
            detail: detail.into(),
        }
    }

    pub fn numeric(detail: impl Into<String>) -> Self {
        FilamentSlidingError::NumericInstability {
            detail: detail.into(),
        }
    }

    pub fn input(detail: impl Into<String>) -> Self {
        FilamentSlidingError::InputMalformed {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_error_displays_detail() {
        let err = FilamentSlidingError::invariant("free-tip deque desync");
        assert!(err.to_string().contains("free-tip deque desync"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FilamentSlidingError = io.into();
        assert!(matches!(err, FilamentSlidingError::Io(_)));
    }
}
