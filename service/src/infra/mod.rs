//! Infrastructure layer.

pub mod cache;
pub mod database;
pub mod event;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;
pub use self::{cache::SessionCache, database::Database, event::EventSink};
