//! [`User`]-related definitions.

use derive_more::Debug;
use serde::{Deserialize, Serialize};
use service::domain::{self, user::session};

use crate::Error;

/// A [`User`] of the system, as exposed to clients.
///
/// Never carries any password data.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct User {
    /// Unique identifier of this [`User`].
    pub id: i64,

    /// Name of this [`User`].
    pub name: String,

    /// Email address of this [`User`].
    pub email: String,

    /// Username of this [`User`].
    pub username: String,

    /// [RFC 3339] date and time when this [`User`] was created.
    ///
    /// [RFC 3339]: https://datatracker.ietf.org/doc/html/rfc3339
    pub created_at: String,
}

impl From<&domain::User> for User {
    fn from(user: &domain::User) -> Self {
        user.snapshot().into()
    }
}

impl From<session::Snapshot> for User {
    fn from(snapshot: session::Snapshot) -> Self {
        let session::Snapshot {
            id,
            name,
            email,
            username,
            created_at,
        } = snapshot;

        Self {
            id: id.into(),
            name: name.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: created_at.to_rfc3339(),
        }
    }
}

/// Credentials of a [`User`] to log in with.
#[derive(Clone, Debug, Deserialize)]
#[debug("Credentials {{ username: {username:?}, password: *** }}")]
pub struct Credentials {
    /// Username of the [`User`].
    pub username: String,

    /// Password of the [`User`].
    pub password: String,
}

/// Data of a new [`User`] to register.
#[derive(Clone, Debug, Deserialize)]
#[debug(
    "Registration {{ name: {name:?}, email: {email:?}, \
     username: {username:?}, password: *** }}"
)]
pub struct Registration {
    /// Name of the new [`User`].
    pub name: String,

    /// Email address of the new [`User`].
    pub email: String,

    /// Username of the new [`User`].
    pub username: String,

    /// Password of the new [`User`].
    pub password: String,
}

/// Parses the provided raw `value` into a domain type, reporting a failure
/// as a validation [`Error`].
///
/// # Errors
///
/// If the `value` is not a valid `T`.
pub fn parse<T>(value: &str) -> Result<T, Error>
where
    T: std::str::FromStr<Err = &'static str>,
{
    value.parse().map_err(Error::validation)
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::domain::user::{self, session};

    use crate::Error;

    use super::{parse, User};

    #[test]
    fn exposes_no_password() {
        let user = User::from(session::Snapshot {
            id: 7.into(),
            name: user::Name::new("Ann").unwrap(),
            email: user::Email::new("a@x.com").unwrap(),
            username: user::Username::new("ann").unwrap(),
            created_at: DateTime::now().coerce(),
        });

        let json = serde_json::to_value(&user).unwrap();
        let keys = json.as_object().unwrap().keys().collect::<Vec<_>>();
        assert_eq!(keys, ["created_at", "email", "id", "name", "username"]);
        assert_eq!(json["id"], 7);
        assert_eq!(json["username"], "ann");
    }

    #[test]
    fn reports_invalid_values_verbatim() {
        let err = parse::<user::Username>("a b").unwrap_err();

        assert_eq!(err, Error::validation("invalid `Username`"));
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
