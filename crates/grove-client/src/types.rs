//! Request, response and metadata types shared by the facade and drivers.

use crate::error::{self, ResultCode};
use crate::watch::WatchRouter;
use grove_config::CreateMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Version value that matches any node version.
pub const ANY_VERSION: i32 = -1;

/// Node metadata as reported by the service.
///
/// Produced by drivers; the client never fabricates one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Transaction id that created the node.
    pub czxid: i64,
    /// Transaction id that last modified the node's data.
    pub mzxid: i64,
    /// Creation time, milliseconds since the epoch.
    pub ctime: i64,
    /// Last data modification time, milliseconds since the epoch.
    pub mtime: i64,
    /// Data version.
    pub version: i32,
    /// Child list version.
    pub cversion: i32,
    /// ACL version.
    pub aversion: i32,
    /// Owning session id for ephemeral nodes, 0 otherwise.
    pub ephemeral_owner: i64,
    /// Payload length in bytes.
    pub data_length: i32,
    /// Number of children.
    pub num_children: i32,
    /// Transaction id that last modified the child list.
    pub pzxid: i64,
}

impl Stat {
    /// Whether the node is bound to a session.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner != 0
    }
}

/// One access-control entry. Passed through to the service uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acl {
    /// Permission bits (see the associated constants).
    pub perms: u32,
    /// Authentication scheme, e.g. `world` or `digest`.
    pub scheme: String,
    /// Identity within the scheme.
    pub id: String,
}

impl Acl {
    /// Read data and list children.
    pub const READ: u32 = 1;
    /// Set data.
    pub const WRITE: u32 = 1 << 1;
    /// Create children.
    pub const CREATE: u32 = 1 << 2;
    /// Delete children.
    pub const DELETE: u32 = 1 << 3;
    /// Set ACLs.
    pub const ADMIN: u32 = 1 << 4;
    /// Every permission.
    pub const ALL: u32 = Self::READ | Self::WRITE | Self::CREATE | Self::DELETE | Self::ADMIN;

    /// Create a new ACL entry.
    pub fn new(perms: u32, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// Everyone may do anything.
    pub fn open_unsafe() -> Vec<Acl> {
        vec![Self::new(Self::ALL, "world", "anyone")]
    }

    /// Everyone may read.
    pub fn read_unsafe() -> Vec<Acl> {
        vec![Self::new(Self::READ, "world", "anyone")]
    }
}

/// Lifecycle state of a driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Establishing or re-establishing the connection.
    Connecting,
    /// Connected and usable.
    Connected,
    /// Closed by the client.
    Closed,
    /// Expired by the service.
    Expired,
    /// Authentication failed.
    AuthFailed,
}

impl SessionState {
    /// Whether operations may still be submitted.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// A tree primitive and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a node.
    Create {
        /// Initial payload
        data: Vec<u8>,
        /// Access control list
        acl: Vec<Acl>,
        /// Ephemeral/sequential selection
        mode: CreateMode,
    },
    /// Read payload and metadata.
    GetData {
        /// Arm a one-shot watch
        watch: bool,
    },
    /// Replace the payload.
    SetData {
        /// New payload
        data: Vec<u8>,
        /// Expected version, [`ANY_VERSION`] to skip the check
        version: i32,
    },
    /// Remove a childless node.
    Delete {
        /// Expected version, [`ANY_VERSION`] to skip the check
        version: i32,
    },
    /// List child names.
    GetChildren {
        /// Arm a one-shot watch
        watch: bool,
    },
    /// Fetch metadata if the node exists.
    Exists {
        /// Arm a one-shot watch
        watch: bool,
    },
    /// Read the ACL.
    GetAcl,
    /// Replace the ACL.
    SetAcl {
        /// New access control list
        acl: Vec<Acl>,
        /// Expected ACL version, [`ANY_VERSION`] to skip the check
        version: i32,
    },
}

impl Operation {
    /// Whether the caller asked for a watch on this operation.
    pub fn wants_watch(&self) -> bool {
        matches!(
            self,
            Self::GetData { watch: true } | Self::GetChildren { watch: true } | Self::Exists { watch: true }
        )
    }

    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::GetData { .. } => "get_data",
            Self::SetData { .. } => "set_data",
            Self::Delete { .. } => "delete",
            Self::GetChildren { .. } => "get_children",
            Self::Exists { .. } => "exists",
            Self::GetAcl => "get_acl",
            Self::SetAcl { .. } => "set_acl",
        }
    }
}

/// An operation addressed to a path, optionally carrying the watch callback.
#[derive(Clone)]
pub struct Request {
    /// Target path.
    pub path: String,
    /// What to do.
    pub op: Operation,
    /// Shared watch callback, attached by the client when the operation
    /// asks for a watch.
    pub watcher: Option<Arc<WatchRouter>>,
}

impl Request {
    /// Create a new request without a watcher.
    pub fn new(path: impl Into<String>, op: Operation) -> Self {
        Self {
            path: path.into(),
            op,
            watcher: None,
        }
    }

    /// Create request.
    pub fn create(path: impl Into<String>, data: Vec<u8>, acl: Vec<Acl>, mode: CreateMode) -> Self {
        Self::new(path, Operation::Create { data, acl, mode })
    }

    /// Read request.
    pub fn get_data(path: impl Into<String>, watch: bool) -> Self {
        Self::new(path, Operation::GetData { watch })
    }

    /// Write request.
    pub fn set_data(path: impl Into<String>, data: Vec<u8>, version: Option<i32>) -> Self {
        Self::new(
            path,
            Operation::SetData {
                data,
                version: version.unwrap_or(ANY_VERSION),
            },
        )
    }

    /// Delete request.
    pub fn delete(path: impl Into<String>, version: Option<i32>) -> Self {
        Self::new(
            path,
            Operation::Delete {
                version: version.unwrap_or(ANY_VERSION),
            },
        )
    }

    /// Child listing request.
    pub fn get_children(path: impl Into<String>, watch: bool) -> Self {
        Self::new(path, Operation::GetChildren { watch })
    }

    /// Existence request.
    pub fn exists(path: impl Into<String>, watch: bool) -> Self {
        Self::new(path, Operation::Exists { watch })
    }

    /// ACL read request.
    pub fn get_acl(path: impl Into<String>) -> Self {
        Self::new(path, Operation::GetAcl)
    }

    /// ACL write request.
    pub fn set_acl(path: impl Into<String>, acl: Vec<Acl>, version: Option<i32>) -> Self {
        Self::new(
            path,
            Operation::SetAcl {
                acl,
                version: version.unwrap_or(ANY_VERSION),
            },
        )
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("path", &self.path)
            .field("op", &self.op.name())
            .field("watched", &self.watcher.is_some())
            .finish()
    }
}

/// Raw outcome of an operation. Fields are filled per operation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Result code.
    pub code: ResultCode,
    /// Path the request addressed.
    pub path: String,
    /// Payload (read).
    pub data: Option<Vec<u8>>,
    /// Metadata (read, write, exists, ACL operations).
    pub stat: Option<Stat>,
    /// Child names (list-children).
    pub children: Option<Vec<String>>,
    /// Access control list (read-acl).
    pub acl: Option<Vec<Acl>>,
    /// Final path (create), including any sequence suffix.
    pub created_path: Option<String>,
}

impl Response {
    /// Response with only a code and path.
    pub fn new(code: ResultCode, path: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            data: None,
            stat: None,
            children: None,
            acl: None,
            created_path: None,
        }
    }

    /// Successful response with no payload.
    pub fn ok(path: impl Into<String>) -> Self {
        Self::new(ResultCode::Ok, path)
    }

    /// Set the payload.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the metadata.
    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Set the child names.
    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = Some(children);
        self
    }

    /// Set the ACL.
    pub fn with_acl(mut self, acl: Vec<Acl>) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Set the created path.
    pub fn with_created_path(mut self, path: impl Into<String>) -> Self {
        self.created_path = Some(path.into());
        self
    }

    /// Fail with the mapped error kind unless the code is Ok.
    pub fn validate(self) -> error::Result<Self> {
        error::validate(self)
    }
}
