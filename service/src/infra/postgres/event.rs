//! [`Event`]-related [`EventSink`] implementations.

use common::operations::Publish;
use tracerr::Traced;

use crate::{
    domain::Event,
    infra::{
        event,
        postgres::{Connection as _, Postgres},
        EventSink,
    },
};

/// Appends [`Event`]s to the `events` outbox table, relayed to the
/// subscribers of their topics by a separate process.
impl EventSink<Publish<Event>> for Postgres {
    type Ok = ();
    type Err = Traced<event::Error>;

    async fn execute(
        &self,
        Publish(event): Publish<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let Event {
            topic,
            action,
            payload,
        } = event;
        let topic: &str = topic.as_ref();
        let action = action.to_string();

        const SQL: &str = "\
            INSERT INTO events (topic, action, payload) \
            VALUES ($1::VARCHAR, $2::VARCHAR, $3::JSONB)";
        self.exec(SQL, &[&topic, &action, &payload])
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}
