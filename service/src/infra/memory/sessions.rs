//! [`Sessions`] definitions.

use std::{collections::HashMap, sync::Arc, time::Duration};

use common::operations::{By, Delete, Insert, Select};
use parking_lot::Mutex;
use tokio::time::{self, Instant};
use tracerr::Traced;

use crate::{
    domain::user::session,
    infra::{cache, SessionCache},
};

/// In-memory session cache.
///
/// Expiration is tracked with [`tokio::time`], so pausing and advancing it
/// in tests affects the stored entries.
#[derive(Clone, Debug, Default)]
pub struct Sessions {
    /// Stored [`session::Snapshot`]s along with their expiration [`Instant`].
    entries: Arc<Mutex<HashMap<session::Id, (session::Snapshot, Instant)>>>,

    /// Delay before acknowledging a stored [`session::Record`].
    latency: Duration,
}

impl Sessions {
    /// Makes this [`Sessions`] cache acknowledge every stored
    /// [`session::Record`] only after the provided `latency`.
    ///
    /// The [`session::Record`] is stored before the delay starts, so an
    /// operation cancelled during it leaves the [`session::Record`] in place.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Evicts all the stored entries, as if the cache was restarted.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of stored entries, including expired but not yet
    /// purged ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Indicates whether no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache<Insert<session::Record>> for Sessions {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(record): Insert<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Record { id, snapshot, ttl } = record;
        let expires_at = Instant::now() + ttl;
        drop(self.entries.lock().insert(id, (snapshot, expires_at)));

        if !self.latency.is_zero() {
            time::sleep(self.latency).await;
        }
        Ok(())
    }
}

impl SessionCache<Select<By<Option<session::Snapshot>, session::Id>>>
    for Sessions
{
    type Ok = Option<session::Snapshot>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<session::Snapshot>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .get(by.inner())
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(snapshot, _)| snapshot.clone()))
    }
}

impl SessionCache<Delete<By<session::Snapshot, session::Id>>> for Sessions {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Snapshot, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.entries.lock().remove(by.inner()));
        Ok(())
    }
}

impl SessionCache<Delete<session::Expired>> for Sessions {
    type Ok = u64;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        _: Delete<session::Expired>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}
