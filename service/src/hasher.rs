//! [`Hasher`] of [`Password`]s.

use std::sync::Arc;

use argon2::{
    password_hash::{self, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use derive_more::{Debug, Display, Error as StdError, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tokio::{sync::Semaphore, task};
use tracerr::Traced;

use crate::domain::user::{Password, PasswordHash};

/// Configuration of a [`Hasher`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of passes over the memory.
    pub time_cost: u32,

    /// Memory size in KiB.
    pub memory_cost: u32,

    /// Degree of parallelism.
    pub parallelism: u32,

    /// Length of a random salt in bytes.
    pub salt_length: usize,

    /// Length of the produced digest in bytes.
    pub output_length: usize,

    /// Maximum number of hashing computations running at once.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_cost: 1,
            memory_cost: 64 * 1024,
            parallelism: 2,
            salt_length: 16,
            output_length: 32,
            workers: 4,
        }
    }
}

/// Argon2id [`Password`] hasher, running computations on a bounded pool of
/// blocking workers.
#[derive(Clone, Debug)]
pub struct Hasher {
    /// [`Argon2`] context to compute new digests with.
    #[debug(skip)]
    argon: Argon2<'static>,

    /// Length of a random salt in bytes.
    salt_length: usize,

    /// Permits to run a computation on a blocking worker.
    permits: Arc<Semaphore>,

    /// [`PasswordHash`] matching no real [`Password`].
    decoy: PasswordHash,
}

impl Hasher {
    /// Allowed range of [`Config::salt_length`].
    const SALT_LENGTH: std::ops::RangeInclusive<usize> = 8..=48;

    /// Creates a new [`Hasher`] with the provided [`Config`].
    ///
    /// Computes the decoy [`PasswordHash`] synchronously, so should be called
    /// once on startup.
    ///
    /// # Errors
    ///
    /// If the provided [`Config`] contains invalid cost parameters.
    pub fn new(config: Config) -> Result<Self, Traced<Error>> {
        if !Self::SALT_LENGTH.contains(&config.salt_length) {
            return Err(tracerr::new!(Error::SaltLength(config.salt_length)));
        }
        if config.workers == 0 {
            return Err(tracerr::new!(Error::NoWorkers));
        }

        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(config.output_length),
        )
        .map_err(tracerr::from_and_wrap!(=> Error))?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut decoy = vec![0; 32];
        getrandom::getrandom(&mut decoy)
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        let decoy = compute(&argon, config.salt_length, &decoy)
            .map_err(tracerr::wrap!())?;

        Ok(Self {
            argon,
            salt_length: config.salt_length,
            permits: Arc::new(Semaphore::new(config.workers)),
            decoy,
        })
    }

    /// Hashes the provided [`Password`] with a fresh random salt.
    ///
    /// # Errors
    ///
    /// If the computation failed or its worker died.
    pub async fn hash(
        &self,
        password: SecretBox<Password>,
    ) -> Result<PasswordHash, Traced<Error>> {
        let argon = self.argon.clone();
        let salt_length = self.salt_length;
        self.spawn(move || {
            compute(&argon, salt_length, password.expose_secret().as_bytes())
        })
        .await
        .map_err(tracerr::wrap!())?
    }

    /// Verifies the provided [`Password`] against the provided
    /// [`PasswordHash`], using the parameters encoded in the latter.
    ///
    /// A malformed [`PasswordHash`] matches nothing.
    ///
    /// # Errors
    ///
    /// If the worker running the computation died.
    pub async fn verify(
        &self,
        password: SecretBox<Password>,
        hash: &PasswordHash,
    ) -> Result<bool, Traced<Error>> {
        let argon = self.argon.clone();
        let hash = hash.clone();
        self.spawn(move || {
            let Ok(phc) = password_hash::PasswordHash::new(hash.as_ref())
            else {
                return Ok(false);
            };
            Ok(argon
                .verify_password(password.expose_secret().as_bytes(), &phc)
                .is_ok())
        })
        .await
        .map_err(tracerr::wrap!())?
    }

    /// Verifies the provided [`Password`] against a decoy [`PasswordHash`],
    /// spending the same time as [`Hasher::verify()`] does for a real one.
    ///
    /// # Errors
    ///
    /// If the worker running the computation died.
    pub async fn verify_decoy(
        &self,
        password: SecretBox<Password>,
    ) -> Result<(), Traced<Error>> {
        self.verify(password, &self.decoy)
            .await
            .map(drop)
            .map_err(tracerr::wrap!())
    }

    /// Runs the provided CPU-bound computation on a blocking worker, once a
    /// permit is available.
    ///
    /// The permit is released only when the computation finishes, even if
    /// the returned [`Future`] is dropped before that.
    async fn spawn<F, T>(&self, f: F) -> Result<T, Traced<Error>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> Error))
    }
}

/// Computes a new [`PasswordHash`] of the provided `password` bytes with a
/// random salt of `salt_length` bytes.
fn compute(
    argon: &Argon2<'_>,
    salt_length: usize,
    password: &[u8],
) -> Result<PasswordHash, Traced<Error>> {
    let mut salt = vec![0; salt_length];
    getrandom::getrandom(&mut salt)
        .map_err(tracerr::from_and_wrap!(=> Error))?;
    let salt = SaltString::encode_b64(&salt)
        .map_err(tracerr::from_and_wrap!(=> Error))?;

    let phc = argon
        .hash_password(password, &salt)
        .map_err(tracerr::from_and_wrap!(=> Error))?;
    Ok(PasswordHash::from_phc(phc.to_string()))
}

/// Error of a [`Hasher`].
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Invalid Argon2 cost parameters.
    #[display("Invalid Argon2 parameters: {_0}")]
    Params(argon2::Error),

    /// Salt length is out of the allowed range.
    #[display("Salt length must be within 8..=48 bytes, got {_0}")]
    #[from(ignore)]
    SaltLength(#[error(not(source))] usize),

    /// No workers are configured.
    #[display("At least one hashing worker is required")]
    #[from(ignore)]
    NoWorkers,

    /// Failed to obtain random bytes from the OS.
    #[display("Failed to generate a random salt: {_0}")]
    Random(getrandom::Error),

    /// Failed to compute a [`PasswordHash`].
    #[display("Failed to compute a password hash: {_0}")]
    Hash(password_hash::Error),

    /// Pool of workers is closed.
    #[display("Hashing workers are closed: {_0}")]
    Closed(tokio::sync::AcquireError),

    /// Worker running a computation panicked or was cancelled.
    #[display("Hashing worker failed: {_0}")]
    Worker(task::JoinError),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::SecretBox;
    use tokio::time;

    use crate::domain::user::{Password, PasswordHash};

    use super::{Config, Hasher};

    fn hasher() -> Hasher {
        Hasher::new(Config {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
            salt_length: 16,
            output_length: 32,
            workers: 2,
        })
        .unwrap()
    }

    fn secret(p: &str) -> SecretBox<Password> {
        SecretBox::new(Box::new(Password::new(p).unwrap()))
    }

    #[tokio::test]
    async fn verifies_own_hashes() {
        let hasher = hasher();

        let hash = hasher.hash(secret("secret1")).await.unwrap();

        assert!(hash.as_ref().starts_with("$argon2id$v=19$"));
        assert!(hasher.verify(secret("secret1"), &hash).await.unwrap());
        assert!(!hasher.verify(secret("secret2"), &hash).await.unwrap());
    }

    #[tokio::test]
    async fn salts_every_hash() {
        let hasher = hasher();

        let first = hasher.hash(secret("secret1")).await.unwrap();
        let second = hasher.hash(secret("secret1")).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn uses_params_of_the_digest() {
        let hash = hasher().hash(secret("secret1")).await.unwrap();

        let other = Hasher::new(Config {
            time_cost: 2,
            memory_cost: 16,
            ..Config::default()
        })
        .unwrap();

        assert!(other.verify(secret("secret1"), &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_digest_matches_nothing() {
        let hasher = hasher();

        for phc in ["", "not a hash", "$argon2id$v=19$m=8,t=1,p=1$zz$zz"] {
            let hash = PasswordHash::from_phc(phc);
            assert!(!hasher.verify(secret("secret1"), &hash).await.unwrap());
        }
    }

    #[tokio::test]
    async fn decoy_matches_nothing() {
        let hasher = hasher();

        for p in ["secret1", "password", "decoy123"] {
            assert!(!hasher.verify(secret(p), &hasher.decoy).await.unwrap());
        }
        hasher.verify_decoy(secret("secret1")).await.unwrap();
    }

    #[tokio::test]
    async fn keeps_worker_busy_until_computation_finishes() {
        let hasher = Hasher::new(Config {
            time_cost: 4,
            memory_cost: 16 * 1024,
            parallelism: 1,
            workers: 1,
            ..Config::default()
        })
        .unwrap();

        let cancelled =
            time::timeout(Duration::ZERO, hasher.hash(secret("secret1")))
                .await;

        assert!(cancelled.is_err(), "computation finished immediately");
        assert_eq!(hasher.permits.available_permits(), 0);

        let permit = time::timeout(
            Duration::from_secs(60),
            hasher.permits.acquire(),
        )
        .await
        .expect("permit is never released")
        .unwrap();
        drop(permit);
        assert_eq!(hasher.permits.available_permits(), 1);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Hasher::new(Config {
            salt_length: 4,
            ..Config::default()
        })
        .is_err());
        assert!(Hasher::new(Config {
            salt_length: 64,
            ..Config::default()
        })
        .is_err());
        assert!(Hasher::new(Config {
            workers: 0,
            ..Config::default()
        })
        .is_err());
        assert!(Hasher::new(Config {
            time_cost: 0,
            ..Config::default()
        })
        .is_err());
    }
}
