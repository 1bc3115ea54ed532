//! In-memory implementation of the infrastructure capabilities.
//!
//! Keeps everything in the process memory, so is suitable for tests and
//! single-node setups only.

mod events;
mod sessions;
mod users;

use derive_more::{Display, Error as StdError};

pub use self::{events::Events, sessions::Sessions, users::Users};

/// In-memory infrastructure [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Storage is switched off.
    #[display("Storage is unavailable")]
    Unavailable,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |n| n == *c),
            Self::Unavailable => false,
        }
    }
}
