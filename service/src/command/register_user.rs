//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Delete, Insert, Publish, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Username};
use crate::{
    deadline,
    domain::{
        user::{self, session},
        Event, User,
    },
    hasher,
    infra::{cache, database, event, Database, EventSink, SessionCache},
    Deadline, Service,
};

use super::{create_user_session, Command, CreateUserSession};

/// [`Command`] for registering a new [`User`] and opening their first
/// [`Session`].
///
/// [`Session`]: user::Session
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Username`] of a new [`User`].
    pub username: user::Username,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Deadline`] of the whole operation.
    pub deadline: Deadline,
}

impl<Db, Cache, Ev> Command<RegisterUser> for Service<Db, Cache, Ev>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<user::New>, Ok = User, Err = Traced<database::Error>>,
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
    type Ok = create_user_session::Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RegisterUser {
            name,
            email,
            username,
            password,
            deadline,
        } = cmd;

        let existing = deadline
            .run(self.database().execute(Select(By::new(&username))))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::UsernameOccupied(username)));
        }

        let password_hash = deadline
            .run(self.hasher().hash(password))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let new = user::New {
            name,
            email,
            username: username.clone(),
            password_hash,
            created_at: DateTime::now().coerce(),
        };
        let user = match deadline.run(self.database().execute(Insert(new))).await
        {
            Ok(Ok(user)) => user,
            Ok(Err(e))
                if e.as_ref()
                    .is_unique_violation(Some(database::USERNAME_CONSTRAINT)) =>
            {
                return Err(tracerr::new!(E::UsernameOccupied(username)));
            }
            Ok(Err(e)) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
            }
            Err(e) => return Err(tracerr::new!(E::TimedOut(e))),
        };

        let out = self
            .execute(CreateUserSession::ForUser {
                user,
                id: session::Id::new(),
                deadline,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Mail refers to the `Session`, so it's announced once stored.
        self.notify(
            Event::registered(
                self.config().events.mail_topic.clone(),
                &self.config().events.mail_sender,
                &out.user,
                out.session.id,
            ),
            deadline,
        )
        .await;

        Ok(out)
    }
}

/// Error of [`RegisterUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`hasher::Hasher`] error.
    #[display("`Hasher` failed: {_0}")]
    Hasher(hasher::Error),

    /// [`user::Username`] is already occupied.
    #[display("`{_0}` username is occupied")]
    #[from(ignore)]
    UsernameOccupied(#[error(not(source))] user::Username),

    /// Failed to open a [`Session`] of the registered [`User`].
    ///
    /// [`Session`]: user::Session
    #[display("Failed to open a `Session`: {_0}")]
    Session(create_user_session::ExecutionError),

    /// [`Deadline`] has passed.
    #[display("Timed out: {_0}")]
    TimedOut(deadline::Elapsed),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{By, Select, Update};

    use crate::{
        command::{AuthorizeUserSession, Command as _},
        domain::{event::Action, user, User},
        infra::{memory, Database as _},
        query::{self, Query as _},
        testing::{self, password, MemoryService},
        Deadline,
    };

    use super::{ExecutionError, RegisterUser};

    fn register(service: &MemoryService, username: &str) -> RegisterUser {
        RegisterUser {
            name: user::Name::new("Ann").unwrap(),
            email: user::Email::new("a@x.com").unwrap(),
            username: user::Username::new(username).unwrap(),
            password: password("secret1"),
            deadline: service.deadline(),
        }
    }

    #[tokio::test]
    async fn registers_and_opens_session() {
        let events = memory::Events::default();
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            events.clone(),
        );

        let out = service.execute(register(&service, "ann")).await.unwrap();

        assert_ne!(i64::from(out.user.id), 0);
        assert!(out.user.password_hash.as_ref().starts_with("$argon2id$"));
        let authorized = service
            .execute(AuthorizeUserSession {
                token: out.token,
                deadline: service.deadline(),
            })
            .await
            .unwrap();
        assert_eq!(authorized.user.id, out.user.id);

        let published = events.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].action, Action::Register);
        assert_eq!(published[0].topic.as_ref(), "mail");
        assert_eq!(published[0].payload["to"], "a@x.com");
        assert_eq!(published[0].payload["uuid"], out.session.id.to_string());
    }

    #[tokio::test]
    async fn rejects_occupied_username() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );
        _ = service.execute(register(&service, "ann")).await.unwrap();

        let err = service
            .execute(register(&service, "ann"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UsernameOccupied(_)));
        assert_eq!(service.database().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_create_one_user() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );

        let (first, second) = tokio::join!(
            service.execute(register(&service, "ann")),
            service.execute(register(&service, "ann")),
        );

        assert!(first.is_ok() ^ second.is_ok());
        let err = first.err().or(second.err()).unwrap();
        assert!(matches!(err.as_ref(), ExecutionError::UsernameOccupied(_)));
        assert_eq!(service.database().len(), 1);
    }

    #[tokio::test]
    async fn registration_survives_event_sink_failure() {
        let events = memory::Events::default();
        events.set_unavailable(true);
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            events.clone(),
        );

        let res = service.execute(register(&service, "ann")).await;

        assert!(res.is_ok());
        assert!(events.published().is_empty());
    }

    #[tokio::test]
    async fn announces_nothing_when_session_is_not_stored() {
        let sessions =
            memory::Sessions::default().with_latency(Duration::from_secs(10));
        let events = memory::Events::default();
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            events.clone(),
        );

        let err = service
            .execute(RegisterUser {
                deadline: Deadline::after(Duration::from_millis(500)),
                ..register(&service, "ann")
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Session(_)));
        assert!(sessions.is_empty());
        assert!(events.published().is_empty());
    }

    #[tokio::test]
    async fn profile_keeps_snapshot_of_registration() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );
        let out = service.execute(register(&service, "ann")).await.unwrap();

        service
            .database()
            .execute(Update(User {
                name: user::Name::new("Anna").unwrap(),
                ..out.user.clone()
            }))
            .await
            .unwrap();
        let stored: Option<User> = service
            .database()
            .execute(Select(By::new(out.user.id)))
            .await
            .unwrap();
        assert_eq!(stored.unwrap().name, user::Name::new("Anna").unwrap());

        let profile = service
            .execute(query::Profile {
                session_id: out.session.id,
                deadline: service.deadline(),
            })
            .await
            .unwrap();
        assert_eq!(profile.name, user::Name::new("Ann").unwrap());
    }
}
