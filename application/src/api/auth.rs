//! Handlers opening and closing [`Session`]s.
//!
//! [`Session`]: crate::Session

use axum::{extract::rejection::JsonRejection, Extension, Json};
use secrecy::SecretBox;
use serde::Serialize;
use service::{
    command::{self, Command as _},
    domain::user,
    Deadline,
};
use tracing::Span;

use crate::{api, define_error, AsError, Error, Service, Session};

/// Response of a successfully opened [`Session`].
#[derive(Clone, Debug, Serialize)]
pub struct SessionResponse {
    /// Always `false`, distinguishing successful responses.
    pub error: bool,

    /// Human-readable outcome.
    pub message: &'static str,

    /// [`api::User`] the [`Session`] is opened for.
    pub data: api::User,

    /// Token to authenticate further requests with.
    pub token: String,
}

impl SessionResponse {
    /// Creates a new [`SessionResponse`] out of the provided
    /// [`command::create_user_session::Output`].
    fn new(
        message: &'static str,
        output: command::create_user_session::Output,
    ) -> Self {
        Self {
            error: false,
            message,
            data: (&output.user).into(),
            token: output.token.into(),
        }
    }
}

/// Response of a successfully closed [`Session`].
#[derive(Clone, Copy, Debug, Serialize)]
pub struct LogoutResponse {
    /// Always `false`, distinguishing successful responses.
    pub error: bool,

    /// Human-readable outcome.
    pub message: &'static str,
}

/// Registers a new `User` and opens their first `Session`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILURE` - provided data is malformed;
/// - `DUPLICATE_USERNAME` - provided username is occupied by another `User`;
/// - `TIMEOUT_EXCEEDED` - request has not been served in time.
#[tracing::instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn register(
    Extension(service): Extension<Service>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<api::user::Registration>, JsonRejection>,
) -> Result<Json<SessionResponse>, Error> {
    let Json(api::user::Registration {
        name,
        email,
        username,
        password,
    }) = payload.map_err(AsError::into_error)?;
    _ = Span::current().record("username", username.as_str());

    let output = service
        .execute(command::RegisterUser {
            name: api::user::parse(&name)?,
            email: api::user::parse(&email)?,
            username: api::user::parse(&username)?,
            password: SecretBox::new(Box::new(api::user::parse::<
                user::Password,
            >(&password)?)),
            deadline,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(SessionResponse::new("User registered", output)))
}

/// Opens a new `Session` of the `User` with the provided credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILURE` - provided data is malformed;
/// - `INVALID_CREDENTIALS` - provided credentials don't match any `User`;
/// - `TIMEOUT_EXCEEDED` - request has not been served in time.
#[tracing::instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn login(
    Extension(service): Extension<Service>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<api::user::Credentials>, JsonRejection>,
) -> Result<Json<SessionResponse>, Error> {
    let Json(api::user::Credentials { username, password }) =
        payload.map_err(AsError::into_error)?;
    _ = Span::current().record("username", username.as_str());

    // Malformed credentials are no different from unknown ones.
    let (Ok(username), Ok(password)) = (
        username.parse::<user::Username>(),
        password.parse::<user::Password>(),
    ) else {
        return Err(UserError::InvalidCredentials.into());
    };

    let output = service
        .execute(command::CreateUserSession::ByCredentials {
            username,
            password: SecretBox::new(Box::new(password)),
            deadline,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(SessionResponse::new("Logged in", output)))
}

/// Closes the current `Session`, so its token is not accepted anymore.
///
/// # Errors
///
/// Possible error codes:
/// - `TIMEOUT_EXCEEDED` - request has not been served in time.
#[tracing::instrument(skip_all, fields(username = %session.user.username))]
pub async fn logout(
    Extension(service): Extension<Service>,
    Extension(deadline): Extension<Deadline>,
    session: Session,
) -> Result<Json<LogoutResponse>, Error> {
    service
        .execute(command::DeleteUserSession {
            session_id: session.id,
            deadline,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(LogoutResponse {
        error: false,
        message: "Logged out",
    }))
}

impl AsError for command::register_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Hasher(e) => e.try_as_error(),
            Self::UsernameOccupied(_) => {
                Some(UserError::DuplicateUsername.into())
            }
            Self::Session(e) => e.try_as_error(),
            Self::TimedOut(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Cache(e) => e.try_as_error(),
            Self::Hasher(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::InvalidCredentials => {
                Some(UserError::InvalidCredentials.into())
            }
            Self::TimedOut(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Cache(e) => e.try_as_error(),
            Self::TimedOut(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum UserError {
        #[code = "DUPLICATE_USERNAME"]
        #[status = CONFLICT]
        #[message = "Username is occupied by another `User`"]
        DuplicateUsername,

        #[code = "INVALID_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid username or password"]
        InvalidCredentials,
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{create_user_session, register_user},
        deadline,
        domain::user,
    };

    use crate::{AsError as _, Error};

    use super::UserError;

    #[test]
    fn maps_occupied_username_to_conflict() {
        let err = register_user::ExecutionError::UsernameOccupied(
            user::Username::new("ann").unwrap(),
        );

        assert_eq!(err.as_error(), Error::from(UserError::DuplicateUsername));
        assert_eq!(err.as_error().status_code, http::StatusCode::CONFLICT);
    }

    #[test]
    fn maps_nested_session_errors() {
        let err = register_user::ExecutionError::Session(
            create_user_session::ExecutionError::TimedOut(deadline::Elapsed),
        );

        assert_eq!(err.as_error().code, "TIMEOUT_EXCEEDED");
    }

    #[test]
    fn hides_which_credential_is_wrong() {
        let err = create_user_session::ExecutionError::InvalidCredentials;

        assert_eq!(err.as_error(), Error::from(UserError::InvalidCredentials));
        assert_eq!(err.as_error().message, "Invalid username or password");
    }
}
