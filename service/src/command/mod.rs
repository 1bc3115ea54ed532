//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_user_session;
pub mod delete_user_session;
pub mod register_user;

use common::operations::Publish;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Event,
    infra::{event, EventSink},
    Deadline, Service,
};

/// [`Command`] of the [`Service`].
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    create_user_session::CreateUserSession,
    delete_user_session::DeleteUserSession, register_user::RegisterUser,
};

impl<Db, Cache, Ev> Service<Db, Cache, Ev>
where
    Ev: EventSink<Publish<Event>, Ok = (), Err = Traced<event::Error>>,
{
    /// Publishes the provided [`Event`] on the best-effort basis.
    ///
    /// Never fails: a failed or timed out publishing is only logged.
    async fn notify(&self, event: Event, deadline: Deadline) {
        let action = event.action;
        let deadline = deadline.bounded(self.config().events.publish_timeout);
        match deadline.run(self.events().execute(Publish(event))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!("failed to publish `{action}` event: {e}");
            }
            Err(e) => {
                log::warn!("`{action}` event publishing timed out: {e}");
            }
        }
    }
}
