//! [`Query`] definition.

pub mod profile;

/// [`Query`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Query;

pub use self::profile::Profile;
