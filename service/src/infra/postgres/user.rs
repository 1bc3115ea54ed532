//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database,
        postgres::{Connection as _, Postgres},
        Database,
    },
};

/// Columns of the `users` table forming a [`User`].
const COLUMNS: &str = "\
    id, name, email, username, password_hash, created_at";

/// Builds a [`User`] out of the provided [`Row`] with [`COLUMNS`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

impl Database<Select<By<Option<User>, &user::Username>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE username = $1::VARCHAR",
        );
        Ok(self
            .query_opt(sql.as_str(), &[username])
            .await
            .map_err(tracerr::map_from_and_wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Postgres {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id = $1::INT8",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::map_from_and_wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl Database<Insert<user::New>> for Postgres {
    type Ok = User;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<user::New>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO users (\
                name, email, username, password_hash, created_at\
            ) \
            VALUES (\
                $1::VARCHAR, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::TIMESTAMPTZ\
            ) \
            RETURNING id";
        let row = self
            .query_one(
                SQL,
                &[
                    &user.name,
                    &user.email,
                    &user.username,
                    &user.password_hash,
                    &user.created_at,
                ],
            )
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        Ok(user.with_id(row.get("id")))
    }
}

impl Database<Update<User>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            name,
            email,
            username,
            password_hash,
            created_at: _,
        } = user;

        const SQL: &str = "\
            UPDATE users \
            SET name = $2::VARCHAR, \
                email = $3::VARCHAR, \
                username = $4::VARCHAR, \
                password_hash = $5::VARCHAR \
            WHERE id = $1::INT8";
        self.exec(SQL, &[&id, &name, &email, &username, &password_hash])
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}

impl Database<Delete<By<User, user::Id>>> for Postgres {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM users \
            WHERE id = $1::INT8";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}
