//! [`Session`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Claims of a [`Token`] binding it to a live session of a [`User`].
///
/// Proves only that the session [`Id`] was issued by this service, not that
/// the session is still alive.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    /// [`Id`] of the session in the session cache.
    #[serde(rename = "sid")]
    pub id: Id,

    /// [`DateTime`] when this [`Session`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

/// Opaque, unguessable ID of a [`Session`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Generates a new random [`Id`].
    ///
    /// Randomness comes from the OS CSPRNG, so collisions are negligible.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Eq, From, Into, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

/// [`User`] data cached along with a [`Session`] at the moment it was opened.
///
/// Is not refreshed from the identity store afterwards, so changes of the
/// [`User`] become visible with the next [`Session`] only.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    /// ID of the [`User`].
    pub id: user::Id,

    /// Name of the [`User`].
    pub name: user::Name,

    /// Email of the [`User`].
    pub email: user::Email,

    /// Username of the [`User`].
    pub username: user::Username,

    /// [`DateTime`] when the [`User`] was created.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub created_at: user::CreationDateTime,
}

/// Entry of the session cache.
#[derive(Clone, Debug)]
pub struct Record {
    /// [`Id`] keying this [`Record`].
    pub id: Id,

    /// [`Snapshot`] stored under the [`Id`].
    pub snapshot: Snapshot,

    /// Time-to-live of this [`Record`], after which it is treated as absent.
    pub ttl: Duration,
}

/// Selector of all the [`Record`]s whose time-to-live has elapsed.
#[derive(Clone, Copy, Debug)]
pub struct Expired;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Id, Session};

    #[test]
    fn ids_are_unique() {
        assert_ne!(Id::new(), Id::new());
    }

    #[test]
    fn serializes_as_jwt_claims() {
        let id = Id::new();
        let session = Session {
            id,
            expires_at: DateTime::from_unix_timestamp(1_700_000_000)
                .unwrap()
                .coerce(),
        };

        let json = serde_json::to_value(session).unwrap();

        assert_eq!(json["sid"], id.to_string());
        assert_eq!(json["exp"], 1_700_000_000);
    }
}
