//! [`Users`] definitions.

use std::{collections::BTreeMap, sync::Arc};

use common::operations::{By, Delete, Insert, Select, Update};
use parking_lot::Mutex;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, memory, Database},
};

/// In-memory identity store.
#[derive(Clone, Debug, Default)]
pub struct Users {
    /// Stored [`User`]s along with the last generated [`user::Id`].
    state: Arc<Mutex<State>>,
}

/// State of [`Users`].
#[derive(Debug, Default)]
struct State {
    /// Last generated [`user::Id`].
    last_id: i64,

    /// Stored [`User`]s.
    users: BTreeMap<user::Id, User>,
}

impl Users {
    /// Returns the number of stored [`User`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().users.len()
    }

    /// Indicates whether no [`User`]s are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl State {
    /// Checks that the provided [`user::Username`] is not taken by any
    /// [`User`] other than the one with the provided `except` [`user::Id`].
    fn check_unique(
        &self,
        username: &user::Username,
        except: Option<user::Id>,
    ) -> Result<(), Traced<database::Error>> {
        let taken = self
            .users
            .values()
            .any(|u| &u.username == username && Some(u.id) != except);
        if taken {
            return Err(tracerr::new!(database::Error::from(
                memory::Error::UniqueViolation(database::USERNAME_CONSTRAINT),
            )));
        }
        Ok(())
    }
}

impl Database<Select<By<Option<User>, &user::Username>>> for Users {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();
        Ok(self
            .state
            .lock()
            .users
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Users {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state.lock().users.get(by.inner()).cloned())
    }
}

impl Database<Insert<user::New>> for Users {
    type Ok = User;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(new): Insert<user::New>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state.lock();
        state
            .check_unique(&new.username, None)
            .map_err(tracerr::wrap!())?;

        state.last_id += 1;
        let user = new.with_id(state.last_id.into());
        drop(state.users.insert(user.id, user.clone()));

        Ok(user)
    }
}

impl Database<Update<User>> for Users {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state.lock();
        state
            .check_unique(&user.username, Some(user.id))
            .map_err(tracerr::wrap!())?;

        if let Some(stored) = state.users.get_mut(&user.id) {
            *stored = User {
                created_at: stored.created_at,
                ..user
            };
        }
        Ok(())
    }
}

impl Database<Delete<By<User, user::Id>>> for Users {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.state.lock().users.remove(by.inner()));
        Ok(())
    }
}
