//! The low-level driver interface the client is layered over.
//!
//! Drivers are callback-only: every operation is submitted together with a
//! [`Completion`] that the driver invokes exactly once, on its own dispatch
//! thread, with the raw [`Response`]. Watch events for armed requests go to
//! the request's [`WatchRouter`] on the same thread.

use crate::error::Result;
use crate::types::{Request, Response, SessionState};
use crate::watch::WatchRouter;
use grove_config::DebugLevel;
use std::sync::Arc;
use std::time::Duration;

/// Continuation receiving the raw response of one operation.
pub type Completion = Box<dyn FnOnce(Response) + Send + 'static>;

/// A connected session with the coordination service.
pub trait Driver: Send + Sync {
    /// Queue `request`; `completion` runs exactly once with its outcome.
    fn submit(&self, request: Request, completion: Completion);

    /// Current session state.
    fn state(&self) -> SessionState;

    /// Close the session. Must be idempotent.
    fn close(&self) -> Result<()>;

    /// Adjust the driver's own log verbosity.
    ///
    /// Drivers without this capability return `Error::Unsupported`.
    fn set_debug_level(&self, level: DebugLevel) -> Result<()>;
}

/// Establishes driver sessions.
pub trait Connector {
    /// Connect to `hosts`; `default_watcher` receives every watch event.
    fn connect(
        &self,
        hosts: &[String],
        session_timeout: Duration,
        default_watcher: Arc<WatchRouter>,
    ) -> Result<Arc<dyn Driver>>;
}
