//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Every capability of the service (commands, queries, background tasks and
/// the infrastructure behind them) is a [`Handler`] of some typed operation,
/// so that implementations may be swapped without touching the callers.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
