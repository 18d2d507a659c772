//! Blocking wait for node deletion.
//!
//! The subscription is registered before the existence check so that a
//! deletion landing between the two cannot be missed: either the check sees
//! the node gone, or the watch it arms is already routed to a subscriber.

use crate::client::Client;
use crate::error::{Error, Result, ResultCode};
use crate::path::validate_path;
use crate::registry::Subscription;
use crate::types::Request;
use crate::watch::{WatchEvent, WatchEventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Unregisters the wait's subscription on every exit path, unwinding
/// included.
struct DeletionWait {
    subscription: Subscription,
}

impl DeletionWait {
    fn release(&self) {
        self.subscription.unregister();
    }
}

impl Drop for DeletionWait {
    fn drop(&mut self) {
        self.release();
    }
}

impl Client {
    /// Block the calling thread until `path` does not exist.
    ///
    /// Returns immediately if the node is already absent. Otherwise parks
    /// once and returns after the deletion has been observed. Fails with
    /// `Error::Closed` if the client is closed while waiting.
    ///
    /// There is no timeout. A caller that bounds the wait externally and
    /// gives up must close the client (or otherwise clear the registry) to
    /// release the subscription.
    pub fn wait_until_deleted(&self, path: &str) -> Result<()> {
        validate_path(path)?;

        // Single slot: one pending wake is enough, extras are dropped.
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);

        let waiter = self.clone();
        let watched = path.to_string();
        let subscription = self.registry().register(path, move |event: &WatchEvent| {
            if event.kind == WatchEventKind::Deleted {
                let _ = wake_tx.try_send(());
                return;
            }

            // The watch that fired is spent; re-arm it and wake if the node
            // disappeared in the meantime. Runs on the dispatch thread, so
            // this must go through the non-blocking entry point.
            let recheck_tx = wake_tx.clone();
            let rearm = waiter.submit(
                Request::exists(watched.as_str(), true),
                Box::new(move |response| match response.code {
                    ResultCode::NoNode => {
                        let _ = recheck_tx.try_send(());
                    }
                    ResultCode::Ok => {}
                    code => warn!(path = %response.path, code = ?code, "Re-check after watch event failed"),
                }),
            );
            if let Err(err) = rearm {
                warn!(path = %watched, error = %err, "Could not re-arm deletion watch");
            }
        });
        let guard = DeletionWait { subscription };

        if !self.exists(path, true)? {
            debug!(path = %path, "Node already absent, not waiting");
            guard.release();
            return Ok(());
        }

        debug!(path = %path, "Waiting for deletion");
        let woke = wake_rx.blocking_recv();
        guard.release();

        match woke {
            Some(()) => {
                debug!(path = %path, "Observed deletion");
                Ok(())
            }
            // Every sender is gone: the registry was cleared by close().
            None => Err(Error::Closed),
        }
    }
}
