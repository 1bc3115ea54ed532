//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Deserializer};
use service::domain::user;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Authentication configuration.
    pub auth: Auth,

    /// Service configuration.
    #[serde(default)]
    pub service: Service,

    /// Postgres configuration.
    #[serde(default)]
    pub postgres: Postgres,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing optional fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or the required
    /// [`Auth`] section is missing.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        Self::build(
            ConfigBuilder::<DefaultState>::default()
                .add_source(
                    config::File::with_name(path.as_ref()).required(false),
                )
                .add_source(
                    config::Environment::with_prefix("CONF").separator("__"),
                ),
        )
    }

    /// Builds a [`Config`] out of the sources of the provided `builder` and
    /// validates it.
    fn build(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigError> {
        let this: Self = builder.build()?.try_deserialize()?;
        this.auth.validate()?;
        Ok(this)
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// Paths served without authentication, besides `/register` and
    /// `/login`.
    pub anonymous_paths: Vec<String>,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Authentication configuration.
///
/// Has no defaults: both fields must be provided explicitly.
#[derive(Clone, Debug, Deserialize)]
pub struct Auth {
    /// [JWT] secret to sign and verify session tokens with.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[serde(deserialize_with = "secret")]
    pub jwt_secret: SecretString,

    /// Time-to-live of every session.
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,
}

impl Auth {
    /// Validates this [`Auth`] configuration.
    ///
    /// # Errors
    ///
    /// If the [`Auth::jwt_secret`] is empty, or the [`Auth::session_ttl`] is
    /// zero.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(ConfigError::Message(
                "`auth.jwt_secret` must not be empty".to_owned(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(ConfigError::Message(
                "`auth.session_ttl` must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Deserializes a [`SecretString`] without exposing it anywhere.
fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Maximum duration of serving a single request.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub request_timeout: time::Duration,

    /// Password hashing configuration.
    pub hasher: Hasher,

    /// Events publishing configuration.
    pub events: Events,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl Service {
    /// Combines this [`Service`] configuration with the provided [`Auth`]
    /// one into a [`service::Config`].
    #[must_use]
    pub fn with_auth(self, auth: Auth) -> service::Config {
        let Self {
            request_timeout,
            hasher,
            events,
            tasks: Tasks {
                clean_expired_sessions,
            },
        } = self;
        let Auth {
            jwt_secret,
            session_ttl,
        } = auth;

        service::Config {
            jwt_secret,
            session_ttl,
            request_timeout,
            hasher: hasher.into(),
            events: events.into(),
            clean_expired_sessions:
                service::task::clean_expired_sessions::Config {
                    interval: clean_expired_sessions.interval,
                },
        }
    }
}

/// Password hashing configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Hasher {
    /// Number of passes over the memory.
    #[default(1)]
    pub time_cost: u32,

    /// Memory size in KiB.
    #[default(64 * 1024)]
    pub memory_cost: u32,

    /// Number of lanes.
    #[default(2)]
    pub parallelism: u32,

    /// Length of a random salt in bytes.
    #[default(16)]
    pub salt_length: usize,

    /// Length of a digest in bytes.
    #[default(32)]
    pub output_length: usize,

    /// Maximum number of concurrently computed digests.
    #[default(4)]
    pub workers: usize,
}

impl From<Hasher> for service::hasher::Config {
    fn from(value: Hasher) -> Self {
        let Hasher {
            time_cost,
            memory_cost,
            parallelism,
            salt_length,
            output_length,
            workers,
        } = value;

        Self {
            time_cost,
            memory_cost,
            parallelism,
            salt_length,
            output_length,
            workers,
        }
    }
}

/// Events publishing configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Events {
    /// Maximum duration of publishing a single event.
    #[default(time::Duration::from_secs(2))]
    #[serde(with = "humantime_serde")]
    pub publish_timeout: time::Duration,

    /// Address mails are sent from.
    #[default(user::Email::new("noreply@localhost").expect("valid `Email`"))]
    #[serde(deserialize_with = "email")]
    pub mail_sender: user::Email,

    /// Topic of mail events.
    #[default("mail".to_owned())]
    pub mail_topic: String,

    /// Topic of authentication events.
    #[default("auth".to_owned())]
    pub auth_topic: String,
}

impl From<Events> for service::EventsConfig {
    fn from(value: Events) -> Self {
        let Events {
            publish_timeout,
            mail_sender,
            mail_topic,
            auth_topic,
        } = value;

        Self {
            publish_timeout,
            mail_sender,
            mail_topic: mail_topic.into(),
            auth_topic: auth_topic.into(),
        }
    }
}

/// Deserializes a validated [`user::Email`].
fn email<'de, D>(deserializer: D) -> Result<user::Email, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer)?
        .parse()
        .map_err(serde::de::Error::custom)
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CleanExpiredSessions` task configuration.
    pub clean_expired_sessions: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use config::{builder::DefaultState, ConfigBuilder, File, FileFormat};
    use secrecy::ExposeSecret as _;

    use super::Config;

    fn build(toml: &str) -> Result<Config, config::ConfigError> {
        Config::build(
            ConfigBuilder::<DefaultState>::default()
                .add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn loads_auth_and_defaults() {
        let config = build(
            r#"
            [auth]
            jwt_secret = "s3cr3t"
            session_ttl = "24h"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.jwt_secret.expose_secret(), "s3cr3t");
        assert_eq!(config.auth.session_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.service.hasher.memory_cost, 64 * 1024);
        assert_eq!(
            config.service.events.mail_sender.to_string(),
            "noreply@localhost",
        );

        let service = config.service.with_auth(config.auth);
        assert_eq!(service.session_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(service.events.auth_topic.as_ref(), "auth");
    }

    #[test]
    fn requires_auth_section() {
        assert!(build("[server]\nport = 80\n").is_err());
    }

    #[test]
    fn rejects_missing_secret() {
        assert!(build("[auth]\nsession_ttl = \"1h\"\n").is_err());
        assert!(build("[auth]\njwt_secret = \"\"\nsession_ttl = \"1h\"\n")
            .is_err());
    }

    #[test]
    fn rejects_missing_or_zero_ttl() {
        assert!(build("[auth]\njwt_secret = \"s\"\n").is_err());
        assert!(build("[auth]\njwt_secret = \"s\"\nsession_ttl = \"0s\"\n")
            .is_err());
    }

    #[test]
    fn rejects_invalid_mail_sender() {
        let err = build(
            r#"
            [auth]
            jwt_secret = "s"
            session_ttl = "1h"

            [service.events]
            mail_sender = "not an email"
            "#,
        );

        assert!(err.is_err());
    }
}
