//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    deadline,
    domain::user::{session, Session},
    infra::{cache, SessionCache},
    token::VerifyError,
    Deadline, Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`session::Token`].
///
/// Has no side effects, so may be repeated until the [`Session`] expires.
#[derive(Clone, Debug)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,

    /// [`Deadline`] of the whole operation.
    pub deadline: Deadline,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Authorized [`Session`].
    pub session: Session,

    /// [`User`] owning the [`Session`], as of its creation.
    pub user: session::Snapshot,
}

impl<Db, Cache, Ev> Command<AuthorizeUserSession> for Service<Db, Cache, Ev>
where
    Cache: SessionCache<
        Select<By<Option<session::Snapshot>, session::Id>>,
        Ok = Option<session::Snapshot>,
        Err = Traced<cache::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token, deadline } = cmd;

        let session = self.issuer().verify(&token).map_err(|e| {
            log::debug!("rejected `Token`: {e}");
            tracerr::new!(E::InvalidToken(e))
        })?;

        let user = deadline
            .run(self.cache().execute(Select(By::new(session.id))))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::SessionExpiredOrRevoked(session.id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { session, user })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`SessionCache`] error.
    #[display("`SessionCache` operation failed: {_0}")]
    Cache(cache::Error),

    /// [`session::Token`] failed verification.
    #[display("Invalid `Token`: {_0}")]
    InvalidToken(VerifyError),

    /// [`Session`] has expired or has been revoked.
    #[display("`Session(id: {_0})` has expired or has been revoked")]
    #[from(ignore)]
    SessionExpiredOrRevoked(#[error(not(source))] session::Id),

    /// [`Deadline`] has passed.
    #[display("Timed out: {_0}")]
    TimedOut(deadline::Elapsed),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use tokio::time;

    use crate::{
        command::{Command as _, RegisterUser},
        domain::user::{self, session},
        infra::memory,
        query::{self, Query as _},
        testing::{self, password, MemoryService},
        token::VerifyError,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    async fn register(service: &MemoryService) -> session::Token {
        service
            .execute(RegisterUser {
                name: user::Name::new("Ann").unwrap(),
                email: user::Email::new("a@x.com").unwrap(),
                username: user::Username::new("ann").unwrap(),
                password: password("secret1"),
                deadline: service.deadline(),
            })
            .await
            .unwrap()
            .token
    }

    fn authorize(
        service: &MemoryService,
        token: &session::Token,
    ) -> AuthorizeUserSession {
        AuthorizeUserSession {
            token: token.clone(),
            deadline: service.deadline(),
        }
    }

    #[tokio::test]
    async fn is_idempotent() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );
        let token = register(&service).await;

        let first = service.execute(authorize(&service, &token)).await.unwrap();
        let second =
            service.execute(authorize(&service, &token)).await.unwrap();

        assert_eq!(first.session, second.session);
        assert_eq!(first.user, second.user);
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );

        let err = service
            .execute(authorize(&service, &"garbage".to_owned().into()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidToken(VerifyError::Malformed),
        ));
    }

    #[tokio::test]
    async fn rejects_token_of_another_secret() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );
        let token = register(&service).await;

        let mut config = testing::config();
        config.jwt_secret = "rotated".to_owned().into();
        let rotated = testing::service(
            config,
            memory::Sessions::default(),
            memory::Events::default(),
        );

        let err = rotated
            .execute(authorize(&rotated, &token))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidToken(VerifyError::SignatureMismatch),
        ));
    }

    #[tokio::test]
    async fn rejects_evicted_session() {
        let sessions = memory::Sessions::default();
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            memory::Events::default(),
        );
        let token = register(&service).await;

        sessions.clear();
        let err = service
            .execute(authorize(&service, &token))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::SessionExpiredOrRevoked(_),
        ));
    }

    /// Registers "ann", reads the profile, lets the session expire and checks
    /// that both the profile and the token are rejected afterwards.
    #[tokio::test]
    async fn session_lives_for_its_ttl() {
        let mut config = testing::config();
        config.session_ttl = Duration::from_secs(60);
        let service = testing::service(
            config,
            memory::Sessions::default(),
            memory::Events::default(),
        );
        let token = register(&service).await;
        time::pause();

        let authorized =
            service.execute(authorize(&service, &token)).await.unwrap();
        let profile = service
            .execute(query::Profile {
                session_id: authorized.session.id,
                deadline: service.deadline(),
            })
            .await
            .unwrap();
        assert_eq!(profile.username.to_string(), "ann");

        time::advance(Duration::from_secs(61)).await;

        let err = service
            .execute(authorize(&service, &token))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SessionExpiredOrRevoked(_),
        ));
        let err = service
            .execute(query::Profile {
                session_id: authorized.session.id,
                deadline: service.deadline(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            query::profile::ExecutionError::SessionNotFound(_),
        ));
    }
}
