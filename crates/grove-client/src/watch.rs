//! Watch arming and raw event translation.
//!
//! Every watched request carries the same [`WatchRouter`]. When the driver
//! later fires the one-shot watch it hands the router a [`RawWatchEvent`];
//! the router translates it into a [`WatchEvent`] and forwards it to the
//! [`WatchRegistry`]. Subscriber bookkeeping lives in the registry only.

use crate::path::Chroot;
use crate::registry::WatchRegistry;
use crate::types::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Raw event type codes.
pub mod event_type {
    /// Session state change, not tied to a node.
    pub const SESSION: i32 = -1;
    /// Node created.
    pub const NODE_CREATED: i32 = 1;
    /// Node deleted.
    pub const NODE_DELETED: i32 = 2;
    /// Node payload changed.
    pub const NODE_DATA_CHANGED: i32 = 3;
    /// Node child list changed.
    pub const NODE_CHILDREN_CHANGED: i32 = 4;
}

/// Connection state code carried by raw events while connected.
pub const STATE_CONNECTED: i32 = 3;

/// Event as delivered by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWatchEvent {
    /// One of the [`event_type`] codes.
    pub event_type: i32,
    /// Connection state at delivery time.
    pub state: i32,
    /// Server-side path (empty for session events).
    pub path: String,
}

impl RawWatchEvent {
    /// Node event in the connected state.
    pub fn node(event_type: i32, path: impl Into<String>) -> Self {
        Self {
            event_type,
            state: STATE_CONNECTED,
            path: path.into(),
        }
    }
}

/// Kinds of tree change a watch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchEventKind {
    /// Node was created.
    Created,
    /// Node was deleted.
    Deleted,
    /// Node payload changed.
    DataChanged,
    /// Node child list changed.
    ChildrenChanged,
}

impl WatchEventKind {
    /// Decode a raw event type; `None` for session or unknown events.
    pub fn from_raw(event_type: i32) -> Option<Self> {
        match event_type {
            event_type::NODE_CREATED => Some(Self::Created),
            event_type::NODE_DELETED => Some(Self::Deleted),
            event_type::NODE_DATA_CHANGED => Some(Self::DataChanged),
            event_type::NODE_CHILDREN_CHANGED => Some(Self::ChildrenChanged),
            _ => None,
        }
    }

    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::DataChanged => "data_changed",
            Self::ChildrenChanged => "children_changed",
        }
    }
}

/// A tree change on a client-visible path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// Where it happened.
    pub path: String,
}

impl WatchEvent {
    /// Create a new watch event.
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// The single shared watch callback.
///
/// Built once per client with the registry and path prefix it needs, and
/// handed to the connector as the default watch handler.
#[derive(Debug)]
pub struct WatchRouter {
    registry: WatchRegistry,
    chroot: Chroot,
}

impl WatchRouter {
    /// Create a router forwarding into `registry`.
    pub fn new(registry: WatchRegistry, chroot: Chroot) -> Self {
        Self { registry, chroot }
    }

    /// The registry events are forwarded to.
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Attach this router to `request` if its operation asks for a watch.
    pub fn arm(self: &Arc<Self>, request: &mut Request) {
        if request.op.wants_watch() {
            trace!(path = %request.path, op = request.op.name(), "Arming watch");
            request.watcher = Some(Arc::clone(self));
        }
    }

    /// Translate a raw event and hand it to the registry.
    ///
    /// Returns the number of subscriber callbacks invoked.
    pub fn deliver(&self, raw: RawWatchEvent) -> usize {
        let Some(kind) = WatchEventKind::from_raw(raw.event_type) else {
            debug!(
                event_type = raw.event_type,
                state = raw.state,
                "Ignoring non-node watch event"
            );
            return 0;
        };

        let event = WatchEvent::new(kind, self.chroot.to_client(&raw.path));
        debug!(path = %event.path, kind = event.kind.as_str(), "Watch fired");
        self.registry.process(&event)
    }
}
