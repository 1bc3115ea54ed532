//! [`session::Record`]-related [`SessionCache`] implementations.

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::user::session,
    infra::{
        cache,
        postgres::{Connection as _, Postgres},
        SessionCache,
    },
};

impl SessionCache<Insert<session::Record>> for Postgres {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(record): Insert<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Record { id, snapshot, ttl } = record;

        let snapshot = serde_json::to_string(&snapshot)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?;
        let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        const SQL: &str = "\
            INSERT INTO sessions (id, snapshot, expires_at) \
            VALUES (\
                $1::UUID, $2::TEXT, \
                NOW() + ($3::INT8 * INTERVAL '1 millisecond')\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET snapshot = EXCLUDED.snapshot, \
                expires_at = EXCLUDED.expires_at";
        self.exec(SQL, &[&id, &snapshot, &ttl])
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}

impl SessionCache<Select<By<Option<session::Snapshot>, session::Id>>>
    for Postgres
{
    type Ok = Option<session::Snapshot>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<session::Snapshot>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT snapshot \
            FROM sessions \
            WHERE id = $1::UUID \
              AND expires_at > NOW()";
        let Some(row) = self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::map_from_and_wrap!())?
        else {
            return Ok(None);
        };

        serde_json::from_str(row.get("snapshot"))
            .map(Some)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }
}

impl SessionCache<Delete<By<session::Snapshot, session::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Snapshot, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}

impl SessionCache<Delete<session::Expired>> for Postgres {
    type Ok = u64;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        _: Delete<session::Expired>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE expires_at <= NOW()";
        self.exec(SQL, &[])
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}
