//! [`Deadline`] definitions.

use std::{future::Future, time::Duration};

use derive_more::{Display, Error};
use tokio::time::{self, Instant};

/// Point in time by which a request must be served, bounding every I/O
/// operation performed on its behalf.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Deadline(Instant);

impl Deadline {
    /// Creates a new [`Deadline`] expiring after the provided `timeout` from
    /// now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// Narrows this [`Deadline`] to expire no later than after the provided
    /// `timeout` from now.
    #[must_use]
    pub fn bounded(self, timeout: Duration) -> Self {
        self.min(Self::after(timeout))
    }

    /// Indicates whether this [`Deadline`] has already passed.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Runs the provided [`Future`] until this [`Deadline`].
    ///
    /// # Errors
    ///
    /// If this [`Deadline`] passes before the [`Future`] resolves. The
    /// [`Future`] is dropped then.
    pub async fn run<F: Future>(self, fut: F) -> Result<F::Output, Elapsed> {
        time::timeout_at(self.0, fut).await.map_err(|_| Elapsed)
    }
}

/// Error of a [`Deadline`] passing before an operation completes.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("Deadline exceeded")]
pub struct Elapsed;
