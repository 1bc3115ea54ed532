//! [`Database`]-related definitions.

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
use super::postgres;
use super::memory;

/// Identity store operation.
pub use common::Handler as Database;

/// Name of the constraint keeping usernames unique across all users.
pub const USERNAME_CONSTRAINT: &str = "users_username_key";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Postgres`] error.
    ///
    /// [`Postgres`]: postgres::Postgres
    #[cfg(feature = "postgres")]
    Postgres(postgres::Error),

    /// In-memory store error.
    Memory(memory::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            Self::Memory(e) => e.is_unique_violation(constraint),
        }
    }
}
