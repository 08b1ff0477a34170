//! Error type for contract violations and unsupported operations.
//!
//! Normal negative answers (no collision, empty query) are never errors;
//! they come back as `false`, `None` or an empty slice.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The collider pair has no geometric test.
    #[error("collision between {a} and {b} colliders is not supported")]
    UnsupportedPair { a: &'static str, b: &'static str },

    /// A tracker query named a type that was never registered.
    #[error("type `{0}` is not registered with the tracker")]
    Untracked(&'static str),

    /// A component was added or removed while its list was drawing.
    #[error("components cannot be added or removed while the list is drawing")]
    ListLocked,

    /// A scene pass was started from inside another pass.
    #[error("scene cannot {attempted} while it is {busy}")]
    SceneBusy {
        attempted: &'static str,
        busy: &'static str,
    },

    #[error("state {state} is out of range for a machine with {count} states")]
    StateOutOfRange { state: usize, count: usize },

    #[error("grid data holds {actual} cells, expected {expected}")]
    GridSize { expected: usize, actual: usize },

    #[error("a global tracker registry is already installed")]
    RegistryInstalled,

    #[error("config: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
