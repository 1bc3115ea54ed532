//! Service contains the authentication logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod deadline;
pub mod domain;
pub mod hasher;
pub mod infra;
pub mod query;
pub mod task;
pub mod token;

use std::time::Duration;

use common::operations::{By, Start};
use derive_more::{Debug, Display, Error, From};
use secrecy::SecretString;
use tracerr::Traced;

#[cfg(doc)]
use infra::{Database, EventSink, SessionCache};

pub use self::{
    command::Command, deadline::Deadline, hasher::Hasher, query::Query,
    task::Task, token::Issuer,
};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Secret to sign and verify session [`domain::user::session::Token`]s
    /// with.
    pub jwt_secret: SecretString,

    /// Time-to-live of every new session.
    pub session_ttl: Duration,

    /// Maximum duration of serving a single request.
    pub request_timeout: Duration,

    /// [`Hasher`] configuration.
    pub hasher: hasher::Config,

    /// Configuration of [`domain::Event`]s publishing.
    pub events: EventsConfig,

    /// [`task::CleanExpiredSessions`] configuration.
    pub clean_expired_sessions: task::clean_expired_sessions::Config,
}

/// Configuration of [`domain::Event`]s publishing.
#[derive(Clone, Debug)]
pub struct EventsConfig {
    /// Maximum duration of publishing a single [`domain::Event`].
    ///
    /// Publishing is also bounded by the deadline of the request it's made
    /// on behalf of.
    pub publish_timeout: Duration,

    /// Address mails are sent from.
    pub mail_sender: domain::user::Email,

    /// [`domain::event::Topic`] of mail [`domain::Event`]s.
    pub mail_topic: domain::event::Topic,

    /// [`domain::event::Topic`] of authentication [`domain::Event`]s.
    pub auth_topic: domain::event::Topic,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Cache, Ev> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Hasher`] of this [`Service`].
    hasher: Hasher,

    /// [`Issuer`] of this [`Service`].
    issuer: Issuer,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`SessionCache`] of this [`Service`].
    cache: Cache,

    /// [`EventSink`] of this [`Service`].
    events: Ev,
}

impl<Db, Cache, Ev> Service<Db, Cache, Ev> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// # Errors
    ///
    /// If the provided [`Config`] is invalid.
    pub fn new(
        config: Config,
        database: Db,
        cache: Cache,
        events: Ev,
    ) -> Result<(Self, task::Background), Traced<StartupError>>
    where
        Self: Task<
                Start<
                    By<
                        task::CleanExpiredSessions<Self>,
                        task::clean_expired_sessions::Config,
                    >,
                >,
                Ok = (),
                Err: std::error::Error,
            > + Clone
            + 'static,
    {
        if config.session_ttl.is_zero() {
            return Err(tracerr::new!(StartupError::ZeroSessionTtl));
        }
        let hasher = Hasher::new(config.hasher)
            .map_err(tracerr::map_from_and_wrap!(=> StartupError))?;
        let issuer = Issuer::new(&config.jwt_secret);

        let this = Self {
            config,
            hasher,
            issuer,
            database,
            cache,
            events,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("clean_expired_sessions", async move {
            svc.execute(Start(By::new(svc.config().clean_expired_sessions)))
                .await
        });

        Ok((this, bg))
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a new [`Deadline`] for serving a request started now.
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.request_timeout)
    }

    /// Returns [`Hasher`] of this [`Service`].
    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Returns [`Issuer`] of this [`Service`].
    #[must_use]
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`SessionCache`] of this [`Service`].
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Returns [`EventSink`] of this [`Service`].
    #[must_use]
    pub fn events(&self) -> &Ev {
        &self.events
    }
}

/// Error of starting a [`Service`].
#[derive(Debug, Display, Error, From)]
pub enum StartupError {
    /// [`Hasher`] failed to initialize.
    #[display("Failed to initialize `Hasher`: {_0}")]
    Hasher(hasher::Error),

    /// Session time-to-live is zero.
    #[display("Session time-to-live must be positive")]
    #[from(ignore)]
    ZeroSessionTtl,
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for testing a [`Service`] against in-memory infrastructure.

    use std::time::Duration;

    use secrecy::SecretBox;

    use crate::{
        domain::user::{self, Password},
        hasher,
        infra::memory,
        task, Config, EventsConfig, Service,
    };

    /// [`Service`] backed by in-memory infrastructure.
    pub(crate) type MemoryService =
        Service<memory::Users, memory::Sessions, memory::Events>;

    /// Returns a [`Config`] with cheap hashing parameters.
    pub(crate) fn config() -> Config {
        Config {
            jwt_secret: "test-secret".to_owned().into(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            request_timeout: Duration::from_secs(5),
            hasher: hasher::Config {
                time_cost: 1,
                memory_cost: 8,
                parallelism: 1,
                salt_length: 16,
                output_length: 32,
                workers: 2,
            },
            events: EventsConfig {
                publish_timeout: Duration::from_secs(1),
                mail_sender: user::Email::new("admin@example.com").unwrap(),
                mail_topic: "mail".into(),
                auth_topic: "auth".into(),
            },
            clean_expired_sessions: task::clean_expired_sessions::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    /// Creates a new [`MemoryService`] over the provided infrastructure.
    pub(crate) fn service(
        config: Config,
        sessions: memory::Sessions,
        events: memory::Events,
    ) -> MemoryService {
        let (service, _) =
            Service::new(config, memory::Users::default(), sessions, events)
                .unwrap();
        service
    }

    /// Wraps the provided plaintext into a secret [`Password`].
    pub(crate) fn password(p: &str) -> SecretBox<Password> {
        SecretBox::new(Box::new(Password::new(p).unwrap()))
    }
}
