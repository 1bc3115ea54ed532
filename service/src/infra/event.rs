//! [`EventSink`]-related definitions.

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
use super::postgres;
use super::memory;

/// Event publishing operation.
pub use common::Handler as EventSink;

/// [`EventSink`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Postgres`] error.
    ///
    /// [`Postgres`]: postgres::Postgres
    #[cfg(feature = "postgres")]
    Postgres(postgres::Error),

    /// In-memory sink error.
    Memory(memory::Error),
}
