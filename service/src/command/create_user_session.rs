//! [`Command`] for creating a [`Session`].

use std::time::Duration;

use common::operations::{By, Delete, Insert, Publish, Select};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{session::Token, Password, Username};
use crate::{
    deadline,
    domain::{
        user::{self, session, Session},
        Event, User,
    },
    hasher,
    infra::{cache, database, event, Database, EventSink, SessionCache},
    Deadline, Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Debug)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Username`] of a [`User`].
        username: user::Username,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,

        /// [`Deadline`] of the whole operation.
        deadline: Deadline,
    },

    /// Create a new [`Session`] with the provided ID for the provided
    /// [`User`], whose credentials are checked already.
    ForUser {
        /// [`User`] to create a [`Session`] for.
        user: User,

        /// ID of the [`Session`] to create.
        id: session::Id,

        /// [`Deadline`] of the whole operation.
        deadline: Deadline,
    },
}

impl CreateUserSession {
    /// Maximum [`Duration`] of discarding a [`Session`] that failed to be
    /// created.
    const DISCARD_TIMEOUT: Duration = Duration::from_secs(1);
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// Created [`Session`].
    pub session: Session,

    /// [`Token`] of the created [`Session`].
    pub token: session::Token,
}

impl<Db, Cache, Ev> Command<CreateUserSession> for Service<Db, Cache, Ev>
where
    Db: for<'l> Database<
        Select<By<Option<User>, &'l user::Username>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    Cache: SessionCache<
            Insert<session::Record>,
            Ok = (),
            Err = Traced<cache::Error>,
        > + SessionCache<
            Delete<By<session::Snapshot, session::Id>>,
            Ok = (),
            Err = Traced<cache::Error>,
        >,
    Ev: EventSink<Publish<Event>, Ok = (), Err = Traced<event::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let (username, password, deadline) = match cmd {
            Cmd::ByCredentials {
                username,
                password,
                deadline,
            } => (username, password, deadline),
            Cmd::ForUser { user, id, deadline } => {
                return self
                    .open_session(user, id, deadline)
                    .await
                    .map_err(tracerr::wrap!());
            }
        };

        let user = deadline
            .run(self.database().execute(Select(By::new(&username))))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let Some(user) = user else {
            deadline
                .run(self.hasher().verify_decoy(password))
                .await
                .map_err(tracerr::from_and_wrap!(=> E))?
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            return Err(tracerr::new!(E::InvalidCredentials));
        };

        let matches = deadline
            .run(self.hasher().verify(password, &user.password_hash))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !matches {
            return Err(tracerr::new!(E::InvalidCredentials));
        }

        let output = self
            .open_session(user, session::Id::new(), deadline)
            .await
            .map_err(tracerr::wrap!())?;

        self.notify(
            Event::logged_in(
                self.config().events.auth_topic.clone(),
                &output.user.snapshot(),
                output.session.id,
                self.config().session_ttl,
            ),
            deadline,
        )
        .await;

        Ok(output)
    }
}

impl<Db, Cache, Ev> Service<Db, Cache, Ev>
where
    Cache: SessionCache<
            Insert<session::Record>,
            Ok = (),
            Err = Traced<cache::Error>,
        > + SessionCache<
            Delete<By<session::Snapshot, session::Id>>,
            Ok = (),
            Err = Traced<cache::Error>,
        >,
{
    /// Stores a new [`session::Record`] of the provided [`User`] and issues a
    /// [`Token`] for it.
    ///
    /// Discards the [`session::Record`] if the [`Token`] cannot be returned,
    /// so no orphaned [`Session`] remains.
    async fn open_session(
        &self,
        user: User,
        id: session::Id,
        deadline: Deadline,
    ) -> Result<Output, Traced<ExecutionError>> {
        use ExecutionError as E;

        let ttl = self.config().session_ttl;
        let session = Session {
            id,
            expires_at: session::ExpirationDateTime::after(ttl),
        };
        let record = session::Record {
            id,
            snapshot: user.snapshot(),
            ttl,
        };

        match deadline.run(self.cache().execute(Insert(record))).await {
            Ok(res) => res.map_err(tracerr::map_from_and_wrap!(=> E))?,
            Err(elapsed) => {
                self.discard_session(id).await;
                return Err(tracerr::new!(E::TimedOut(elapsed)));
            }
        }

        let token = match self.issuer().issue(&session) {
            Ok(token) => token,
            Err(e) => {
                self.discard_session(id).await;
                return Err(tracerr::new!(E::JsonWebTokenEncodeError(e)));
            }
        };

        Ok(Output {
            user,
            session,
            token,
        })
    }

    /// Deletes the [`session::Record`] with the provided [`session::Id`]
    /// under its own [`Deadline`].
    async fn discard_session(&self, id: session::Id) {
        let deadline = Deadline::after(CreateUserSession::DISCARD_TIMEOUT);
        let delete = self
            .cache()
            .execute(Delete(By::<session::Snapshot, _>::new(id)));
        match deadline.run(delete).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("failed to discard `Session(id: {id})`: {e}");
            }
            Err(e) => {
                log::error!("discarding `Session(id: {id})` timed out: {e}");
            }
        }
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`SessionCache`] error.
    #[display("`SessionCache` operation failed: {_0}")]
    Cache(cache::Error),

    /// [`hasher::Hasher`] error.
    #[display("`Hasher` failed: {_0}")]
    Hasher(hasher::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    #[display("Wrong `User` credentials")]
    #[from(ignore)]
    InvalidCredentials,

    /// [`Deadline`] has passed.
    #[display("Timed out: {_0}")]
    TimedOut(deadline::Elapsed),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime};

    use crate::{
        command::{AuthorizeUserSession, Command as _},
        domain::{event::Action, user, User},
        infra::{memory, Database as _},
        testing::{self, password, MemoryService},
        Deadline,
    };

    use super::{CreateUserSession, ExecutionError};

    async fn create_user(service: &MemoryService, username: &str) -> User {
        let hash = service.hasher().hash(password("secret1")).await.unwrap();
        service
            .database()
            .execute(Insert(user::New {
                name: user::Name::new("Ann").unwrap(),
                email: user::Email::new("a@x.com").unwrap(),
                username: user::Username::new(username).unwrap(),
                password_hash: hash,
                created_at: DateTime::now().coerce(),
            }))
            .await
            .unwrap()
    }

    fn login(
        service: &MemoryService,
        username: &str,
        pass: &str,
    ) -> CreateUserSession {
        CreateUserSession::ByCredentials {
            username: user::Username::new(username).unwrap(),
            password: password(pass),
            deadline: service.deadline(),
        }
    }

    #[tokio::test]
    async fn logs_in_with_valid_credentials() {
        let events = memory::Events::default();
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            events.clone(),
        );
        let user = create_user(&service, "ann").await;

        let out = service
            .execute(login(&service, "ann", "secret1"))
            .await
            .unwrap();

        assert_eq!(out.user.id, user.id);
        let authorized = service
            .execute(AuthorizeUserSession {
                token: out.token,
                deadline: service.deadline(),
            })
            .await
            .unwrap();
        assert_eq!(authorized.session.id, out.session.id);
        assert_eq!(authorized.user.username, user.username);

        let published = events.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].action, Action::Login);
        assert_eq!(published[0].topic.as_ref(), "auth");
    }

    #[tokio::test]
    async fn hides_which_credential_is_wrong() {
        let sessions = memory::Sessions::default();
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            memory::Events::default(),
        );
        _ = create_user(&service, "ann").await;

        let wrong_password = service
            .execute(login(&service, "ann", "secret2"))
            .await
            .unwrap_err();
        let unknown_user = service
            .execute(login(&service, "bob", "secret1"))
            .await
            .unwrap_err();

        assert!(matches!(
            wrong_password.as_ref(),
            ExecutionError::InvalidCredentials,
        ));
        assert!(matches!(
            unknown_user.as_ref(),
            ExecutionError::InvalidCredentials,
        ));
        assert_eq!(
            wrong_password.as_ref().to_string(),
            unknown_user.as_ref().to_string(),
        );
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn login_survives_event_sink_failure() {
        let events = memory::Events::default();
        events.set_unavailable(true);
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            events.clone(),
        );
        _ = create_user(&service, "ann").await;

        let res = service.execute(login(&service, "ann", "secret1")).await;

        assert!(res.is_ok());
        assert!(events.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_put_leaves_no_session() {
        let sessions =
            memory::Sessions::default().with_latency(Duration::from_secs(10));
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            memory::Events::default(),
        );
        let user = service
            .database()
            .execute(Insert(user::New {
                name: user::Name::new("Ann").unwrap(),
                email: user::Email::new("a@x.com").unwrap(),
                username: user::Username::new("ann").unwrap(),
                password_hash: user::PasswordHash::from_phc("$argon2id$..."),
                created_at: DateTime::now().coerce(),
            }))
            .await
            .unwrap();

        let err = service
            .execute(CreateUserSession::ForUser {
                user,
                id: user::session::Id::new(),
                deadline: Deadline::after(Duration::from_secs(1)),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::TimedOut(_)));
        assert!(sessions.is_empty());
    }
}
