//! [`Query`] of the profile of an authenticated [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{user::Session, User};
use crate::{
    deadline,
    domain::user::session,
    infra::{cache, SessionCache},
    Deadline, Service,
};

use super::Query;

/// [`Query`] of the profile of a [`User`] owning the [`Session`] with the
/// provided ID.
///
/// Reads the [`session::Snapshot`] taken when the [`Session`] was created,
/// so changes of the [`User`] made afterwards are not visible.
#[derive(Clone, Copy, Debug)]
pub struct Profile {
    /// ID of the [`Session`] to read the profile of.
    pub session_id: session::Id,

    /// [`Deadline`] of the whole operation.
    pub deadline: Deadline,
}

impl<Db, Cache, Ev> Query<Profile> for Service<Db, Cache, Ev>
where
    Cache: SessionCache<
        Select<By<Option<session::Snapshot>, session::Id>>,
        Ok = Option<session::Snapshot>,
        Err = Traced<cache::Error>,
    >,
{
    type Ok = session::Snapshot;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: Profile) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Profile {
            session_id,
            deadline,
        } = query;

        deadline
            .run(self.cache().execute(Select(By::new(session_id))))
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::SessionNotFound(session_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`Profile`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`SessionCache`] error.
    #[display("`SessionCache` operation failed: {_0}")]
    Cache(cache::Error),

    /// [`Session`] is not found.
    #[display("`Session(id: {_0})` is not found")]
    #[from(ignore)]
    SessionNotFound(#[error(not(source))] session::Id),

    /// [`Deadline`] has passed.
    #[display("Timed out: {_0}")]
    TimedOut(deadline::Elapsed),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::user::session,
        infra::memory,
        query::Query as _,
        testing,
    };

    use super::{ExecutionError, Profile};

    #[tokio::test]
    async fn reports_unknown_session() {
        let service = testing::service(
            testing::config(),
            memory::Sessions::default(),
            memory::Events::default(),
        );

        let err = service
            .execute(Profile {
                session_id: session::Id::new(),
                deadline: service.deadline(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SessionNotFound(_)));
    }
}
