//! Request [`Session`] context and the middleware resolving it.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::Response,
    Extension,
};
use axum_extra::headers::{
    authorization::Bearer, Authorization, HeaderMapExt as _,
};
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
    Deadline,
};
use tracing as log;

use crate::{define_error, AsError, Error, Service};

/// Paths served without authentication.
#[derive(Clone, Debug)]
pub struct AnonymousPaths(Arc<[String]>);

impl AnonymousPaths {
    /// Paths which are always served without authentication.
    pub const ALWAYS: [&'static str; 2] = ["/register", "/login"];

    /// Creates new [`AnonymousPaths`] out of the [`AnonymousPaths::ALWAYS`]
    /// ones and the provided `extra` ones.
    #[must_use]
    pub fn new(extra: impl IntoIterator<Item = String>) -> Self {
        Self(
            Self::ALWAYS
                .into_iter()
                .map(ToOwned::to_owned)
                .chain(extra)
                .collect(),
        )
    }

    /// Checks whether the provided `path` is served without authentication.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }
}

impl Default for AnonymousPaths {
    fn default() -> Self {
        Self::new([])
    }
}

/// Authenticated session of the current request.
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of this [`Session`].
    pub id: session::Id,

    /// Verified claims of this [`Session`]'s token.
    pub claims: user::Session,

    /// [`user::User`] owning this [`Session`], as of its creation.
    pub user: session::Snapshot,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AuthError::MissingCredential.into())
    }
}

/// Middleware assigning a [`Deadline`] to the request and authenticating it,
/// unless its path is one of [`AnonymousPaths`].
///
/// On success, the resolved [`Session`] is put into the request extensions.
///
/// # Errors
///
/// Possible error codes:
/// - `MISSING_CREDENTIAL` - no `Authorization: Bearer` header provided;
/// - `INVALID_TOKEN` - provided token failed verification;
/// - `SESSION_EXPIRED_OR_REVOKED` - session of the token is not alive.
pub async fn authenticate(
    Extension(service): Extension<Service>,
    Extension(anonymous): Extension<AnonymousPaths>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let deadline = service.deadline();
    _ = req.extensions_mut().insert(deadline);

    if !anonymous.contains(req.uri().path()) {
        let token = bearer(req.headers())?;
        let session = resolve(&service, token, deadline).await?;
        _ = req.extensions_mut().insert(session);
    }

    Ok(next.run(req).await)
}

/// Extracts a [`session::Token`] out of the `Authorization: Bearer` header.
///
/// # Errors
///
/// If the header is absent, malformed or uses another scheme.
pub(crate) fn bearer(
    headers: &http::HeaderMap,
) -> Result<session::Token, AuthError> {
    match headers.typed_try_get::<Authorization<Bearer>>() {
        Ok(Some(Authorization(bearer))) => {
            Ok(bearer.token().to_owned().into())
        }
        Ok(None) => Err(AuthError::MissingCredential),
        Err(e) => {
            log::debug!("malformed `Authorization` header: {e}");
            Err(AuthError::MissingCredential)
        }
    }
}

/// Resolves the [`Session`] of the provided [`session::Token`].
async fn resolve(
    service: &Service,
    token: session::Token,
    deadline: Deadline,
) -> Result<Session, Error> {
    let command::authorize_user_session::Output { session, user } = service
        .execute(command::AuthorizeUserSession { token, deadline })
        .await
        .map_err(AsError::into_error)?;

    Ok(Session {
        id: session.id,
        claims: session,
        user,
    })
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Cache(e) => e.try_as_error(),
            Self::InvalidToken(_) => Some(AuthError::InvalidToken.into()),
            Self::SessionExpiredOrRevoked(_) => {
                Some(AuthError::SessionExpiredOrRevoked.into())
            }
            Self::TimedOut(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "MISSING_CREDENTIAL"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        MissingCredential,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid token"]
        InvalidToken,

        #[code = "SESSION_EXPIRED_OR_REVOKED"]
        #[status = UNAUTHORIZED]
        #[message = "Session has expired or has been revoked"]
        SessionExpiredOrRevoked,
    }
}

#[cfg(test)]
mod spec {
    use http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
    use service::{
        command::authorize_user_session::ExecutionError,
        domain::user::session, token::VerifyError,
    };

    use crate::{AsError as _, Error};

    use super::{bearer, AnonymousPaths, AuthError};

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        _ = headers
            .insert(AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let token = bearer(&headers("Bearer abc.def.ghi")).unwrap();

        assert_eq!(token.as_ref(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(
            bearer(&HeaderMap::new()).unwrap_err(),
            AuthError::MissingCredential,
        );
    }

    #[test]
    fn rejects_other_schemes() {
        for value in ["Basic YW5uOnNlY3JldDE=", "Token abc", "abc.def.ghi"] {
            assert_eq!(
                bearer(&headers(value)).unwrap_err(),
                AuthError::MissingCredential,
                "accepted `{value}`",
            );
        }
    }

    #[test]
    fn always_serves_credential_endpoints_anonymously() {
        let paths = AnonymousPaths::new(["/health".to_owned()]);

        assert!(paths.contains("/register"));
        assert!(paths.contains("/login"));
        assert!(paths.contains("/health"));
        assert!(!paths.contains("/profile"));
        assert!(!paths.contains("/logout"));
    }

    #[test]
    fn maps_authorization_errors() {
        let invalid = ExecutionError::InvalidToken(VerifyError::Expired);
        let revoked = ExecutionError::SessionExpiredOrRevoked(session::Id::new());

        assert_eq!(invalid.as_error(), Error::from(AuthError::InvalidToken));
        assert_eq!(
            revoked.as_error(),
            Error::from(AuthError::SessionExpiredOrRevoked),
        );
        assert_eq!(
            revoked.as_error().status_code,
            http::StatusCode::UNAUTHORIZED,
        );
    }
}
