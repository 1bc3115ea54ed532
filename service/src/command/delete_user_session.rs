//! [`Command`] for deleting a [`Session`].

use common::operations::{By, Delete, Publish};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Session;
use crate::{
    deadline,
    domain::{user::session, Event},
    infra::{cache, event, EventSink, SessionCache},
    Deadline, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Session`], so its [`session::Token`] is not
/// accepted anymore.
#[derive(Clone, Copy, Debug)]
pub struct DeleteUserSession {
    /// ID of the [`Session`] to delete.
    pub session_id: session::Id,

    /// [`Deadline`] of the whole operation.
    pub deadline: Deadline,
}

impl<Db, Cache, Ev> Command<DeleteUserSession> for Service<Db, Cache, Ev>
where
    Cache: SessionCache<
        Delete<By<session::Snapshot, session::Id>>,
        Ok = (),
        Err = Traced<cache::Error>,
    >,
    Ev: EventSink<Publish<Event>, Ok = (), Err = Traced<event::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUserSession {
            session_id,
            deadline,
        } = cmd;

        deadline
            .run(
                self.cache()
                    .execute(Delete(By::<session::Snapshot, _>::new(session_id))),
            )
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.notify(
            Event::logged_out(
                self.config().events.auth_topic.clone(),
                session_id,
            ),
            deadline,
        )
        .await;

        Ok(())
    }
}

/// Error of [`DeleteUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`SessionCache`] error.
    #[display("`SessionCache` operation failed: {_0}")]
    Cache(cache::Error),

    /// [`Deadline`] has passed.
    #[display("Timed out: {_0}")]
    TimedOut(deadline::Elapsed),
}
