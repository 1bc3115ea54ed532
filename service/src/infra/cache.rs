//! [`SessionCache`]-related definitions.

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
use super::postgres;
use super::memory;

/// Session cache operation.
///
/// Expired entries are indistinguishable from absent ones on reads.
pub use common::Handler as SessionCache;

/// [`SessionCache`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Postgres`] error.
    ///
    /// [`Postgres`]: postgres::Postgres
    #[cfg(feature = "postgres")]
    Postgres(postgres::Error),

    /// In-memory cache error.
    Memory(memory::Error),

    /// Failed to (de)serialize a cached snapshot.
    #[display("Failed to (de)serialize a session snapshot: {_0}")]
    Serialization(serde_json::Error),
}
