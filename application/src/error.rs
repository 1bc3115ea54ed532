//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Error as StdError;
use serde::Serialize;
use service::{
    deadline, hasher,
    infra::{cache, database},
};
use tracerr::Traced;
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            Eq,
            PartialEq,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_owned(),
                        },
                    )*
                }
            }
        }

        impl $crate::AsError for $name {
            fn try_as_error(&self) -> Option<$crate::Error> {
                Some((*self).into())
            }
        }
    };
}

/// HTTP API [`Error`].
#[derive(Clone, Debug, Eq, PartialEq, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Code of an internal server [`Error`].
    pub const INTERNAL: Code = "INTERNAL_SERVER_ERROR";

    /// Creates a new [`Error`] representing an internal server error.
    ///
    /// The provided `err` is logged, while the returned [`Error`] carries a
    /// generic message only.
    #[must_use]
    pub fn internal(err: &impl fmt::Display) -> Self {
        log::error!("internal server error: {err}");
        Self {
            code: Self::INTERNAL,
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_owned(),
        }
    }

    /// Creates a new [`Error`] representing malformed request data.
    ///
    /// The provided `message` is returned to the client verbatim.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION_FAILURE",
            status_code: http::StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            message,
        } = self;

        write!(f, "[{code}]: {message}")
    }
}

/// JSON body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body<'e> {
    /// Always `true`, distinguishing [`Error`] responses.
    error: bool,

    /// [`Error`] code.
    code: Code,

    /// [`Error`] message.
    message: &'e str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Body {
            error: true,
            code: self.code,
            message: &self.message,
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`],
    /// meaning it's an internal one.
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError + fmt::Display> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        self.as_ref().try_as_error()
    }

    fn as_error(&self) -> Error {
        self.try_as_error().unwrap_or_else(|| {
            Error::internal(&format_args!("{}\n{}", self.as_ref(), self.trace()))
        })
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::validation(self.body_text()))
    }
}

impl AsError for deadline::Elapsed {
    fn try_as_error(&self) -> Option<Error> {
        Some(RequestError::TimeoutExceeded.into())
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for cache::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for hasher::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

define_error! {
    enum RequestError {
        #[code = "TIMEOUT_EXCEEDED"]
        #[status = GATEWAY_TIMEOUT]
        #[message = "Request has not been served in time"]
        TimeoutExceeded,
    }
}

#[cfg(test)]
mod spec {
    use axum::{body, response::IntoResponse as _};
    use service::deadline;
    use tracerr::Traced;

    use super::{AsError as _, Error, RequestError};

    #[tokio::test]
    async fn responds_with_json_body() {
        let resp = Error::validation("invalid `Username`").into_response();

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": true,
                "code": "VALIDATION_FAILURE",
                "message": "invalid `Username`",
            }),
        );
    }

    #[test]
    fn hides_internal_details() {
        let err = Error::internal(&"relation \"users\" does not exist");

        assert_eq!(err.code, Error::INTERNAL);
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("users"));
    }

    #[test]
    fn maps_elapsed_deadline_to_timeout() {
        let err: Traced<deadline::Elapsed> = tracerr::new!(deadline::Elapsed);

        assert_eq!(err.as_error(), Error::from(RequestError::TimeoutExceeded));
        assert_eq!(err.as_error().status_code, http::StatusCode::GATEWAY_TIMEOUT);
    }
}
