//! Handler of the current `User` profile.

use axum::{Extension, Json};
use serde::Serialize;
use service::{
    query::{self, Query as _},
    Deadline,
};

use crate::{api, define_error, AsError, Error, Service, Session};

/// Response with a profile of the current `User`.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileResponse {
    /// Always `false`, distinguishing successful responses.
    pub error: bool,

    /// Human-readable outcome.
    pub message: &'static str,

    /// Profile of the current `User`.
    pub profile: api::User,
}

/// Returns the profile of the `User` owning the current `Session`, as of
/// the moment it was opened.
///
/// # Errors
///
/// Possible error codes:
/// - `SESSION_NOT_FOUND` - `Session` has expired meanwhile;
/// - `TIMEOUT_EXCEEDED` - request has not been served in time.
#[tracing::instrument(skip_all, fields(username = %session.user.username))]
pub async fn profile(
    Extension(service): Extension<Service>,
    Extension(deadline): Extension<Deadline>,
    session: Session,
) -> Result<Json<ProfileResponse>, Error> {
    let snapshot = service
        .execute(query::Profile {
            session_id: session.id,
            deadline,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(ProfileResponse {
        error: false,
        message: "Profile retrieved",
        profile: snapshot.into(),
    }))
}

impl AsError for query::profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Cache(e) => e.try_as_error(),
            Self::SessionNotFound(_) => {
                Some(ProfileError::SessionNotFound.into())
            }
            Self::TimedOut(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum ProfileError {
        #[code = "SESSION_NOT_FOUND"]
        #[status = UNAUTHORIZED]
        #[message = "Session is not found"]
        SessionNotFound,
    }
}
