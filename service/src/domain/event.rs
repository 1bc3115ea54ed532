//! [`Event`] definitions.

use std::time::Duration;

use derive_more::{AsRef, Display, From, Into};
use serde::Serialize;
use serde_json::json;

use crate::domain::user::{self, session, User};

/// Notification about something that happened to a [`User`], published to
/// an external event sink.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// [`Topic`] this [`Event`] is published to.
    pub topic: Topic,

    /// [`Action`] this [`Event`] describes.
    pub action: Action,

    /// Structured data of this [`Event`].
    pub payload: serde_json::Value,
}

impl Event {
    /// Creates a new [`Event`] notifying the registered [`User`] via mail.
    #[must_use]
    pub fn registered(
        topic: Topic,
        sender: &user::Email,
        user: &User,
        session_id: session::Id,
    ) -> Self {
        Self {
            topic,
            action: Action::Register,
            payload: json!({
                "to": user.email,
                "from": sender,
                "subject": format!(
                    "{}, your account is registered",
                    user.username,
                ),
                "data": format!(
                    "Hi, {}. Your account is registered. Please login.",
                    user.name,
                ),
                "uuid": session_id,
            }),
        }
    }

    /// Creates a new [`Event`] about a [`User`] opening a new session.
    #[must_use]
    pub fn logged_in(
        topic: Topic,
        snapshot: &session::Snapshot,
        session_id: session::Id,
        ttl: Duration,
    ) -> Self {
        Self {
            topic,
            action: Action::Login,
            payload: json!({
                "uuid": session_id,
                "user": snapshot,
                "exp": ttl.as_secs(),
            }),
        }
    }

    /// Creates a new [`Event`] about a [`User`] closing a session.
    #[must_use]
    pub fn logged_out(topic: Topic, session_id: session::Id) -> Self {
        Self {
            topic,
            action: Action::Logout,
            payload: json!({ "uuid": session_id }),
        }
    }

    /// Returns the envelope of this [`Event`], as it's delivered to
    /// subscribers of its [`Topic`].
    #[must_use]
    pub fn envelope(&self) -> Envelope<'_> {
        Envelope {
            action: self.action,
            payload: &self.payload,
        }
    }
}

/// Name of a channel [`Event`]s are published to.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[as_ref(str)]
#[from(&str, String)]
pub struct Topic(String);

/// Kind of an [`Event`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// [`User`] has been registered.
    #[display("register")]
    Register,

    /// [`User`] has logged in.
    #[display("login")]
    Login,

    /// [`User`] has logged out.
    #[display("logout")]
    Logout,
}

/// Serialized form of an [`Event`] delivered to subscribers.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Envelope<'a> {
    /// [`Action`] of the [`Event`].
    pub action: Action,

    /// Structured data of the [`Event`].
    pub payload: &'a serde_json::Value,
}
