//! [`CleanExpiredSessions`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::session,
    infra::{cache, SessionCache},
    Service,
};

use super::Task;

/// Configuration for [`CleanExpiredSessions`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between purges of expired [`session::Record`]s.
    pub interval: time::Duration,
}

/// [`Task`] purging expired [`session::Record`]s from the [`SessionCache`]
/// storage.
///
/// Expired [`session::Record`]s are never returned by the [`SessionCache`]
/// anyway, so this [`Task`] only reclaims space.
#[derive(Clone, Copy, Debug)]
pub struct CleanExpiredSessions<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Cache, Ev> Task<Start<By<CleanExpiredSessions<Self>, Config>>>
    for Service<Db, Cache, Ev>
where
    CleanExpiredSessions<Self>:
        Task<Perform<()>, Ok = u64, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanExpiredSessions<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanExpiredSessions {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(purged) => {
                    log::debug!("purged {purged} expired `Session`s");
                }
                Err(e) => {
                    log::error!("`task::CleanExpiredSessions` failed: {e}");
                }
            }
        }
    }
}

impl<Db, Cache, Ev> Task<Perform<()>>
    for CleanExpiredSessions<Service<Db, Cache, Ev>>
where
    Cache: SessionCache<
        Delete<session::Expired>,
        Ok = u64,
        Err = Traced<cache::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        self.service
            .cache()
            .execute(Delete(session::Expired))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`CleanExpiredSessions`] execution.
pub type ExecutionError = Traced<cache::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Perform, Start},
        DateTime,
    };
    use tokio::{task::LocalSet, time};

    use crate::{
        domain::user::{self, session},
        infra::{memory, SessionCache as _},
        task::Task as _,
        testing,
    };

    use super::{CleanExpiredSessions, Config};

    fn record(ttl: Duration) -> session::Record {
        session::Record {
            id: session::Id::new(),
            snapshot: session::Snapshot {
                id: 1.into(),
                name: user::Name::new("Ann").unwrap(),
                email: user::Email::new("a@x.com").unwrap(),
                username: user::Username::new("ann").unwrap(),
                created_at: DateTime::now().coerce(),
            },
            ttl,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn purges_periodically() {
        let sessions = memory::Sessions::default();
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            memory::Events::default(),
        );
        sessions
            .execute(Insert(record(Duration::from_secs(30))))
            .await
            .unwrap();
        sessions
            .execute(Insert(record(Duration::from_secs(3600))))
            .await
            .unwrap();

        let local = LocalSet::new();
        _ = local.spawn_local(async move {
            service
                .execute(Start(By::<CleanExpiredSessions<_>, _>::new(Config {
                    interval: Duration::from_secs(60),
                })))
                .await
        });
        local
            .run_until(time::sleep(Duration::from_secs(61)))
            .await;

        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn performs_single_purge() {
        let sessions = memory::Sessions::default();
        let service = testing::service(
            testing::config(),
            sessions.clone(),
            memory::Events::default(),
        );
        sessions
            .execute(Insert(record(Duration::from_secs(1))))
            .await
            .unwrap();
        time::advance(Duration::from_secs(2)).await;

        let task = CleanExpiredSessions {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service,
        };

        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert!(sessions.is_empty());
    }
}
