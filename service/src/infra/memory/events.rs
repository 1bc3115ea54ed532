//! [`Events`] definitions.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use common::operations::Publish;
use parking_lot::Mutex;
use tracerr::Traced;

use crate::{
    domain::Event,
    infra::{event, memory, EventSink},
};

/// In-memory event sink, recording every published [`Event`].
#[derive(Clone, Debug, Default)]
pub struct Events {
    /// Published [`Event`]s in order of publishing.
    published: Arc<Mutex<Vec<Event>>>,

    /// Indicator whether this sink rejects every [`Event`].
    unavailable: Arc<AtomicBool>,
}

impl Events {
    /// Returns all the [`Event`]s published so far.
    #[must_use]
    pub fn published(&self) -> Vec<Event> {
        self.published.lock().clone()
    }

    /// Switches this sink off, so it rejects every [`Event`], or back on.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }
}

impl EventSink<Publish<Event>> for Events {
    type Ok = ();
    type Err = Traced<event::Error>;

    async fn execute(
        &self,
        Publish(event): Publish<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(tracerr::new!(event::Error::from(
                memory::Error::Unavailable
            )));
        }
        self.published.lock().push(event);
        Ok(())
    }
}
