//! Handles for the distributed lock and queue recipes.
//!
//! Constructing a handle performs no I/O; it only binds a client to a name
//! that cooperating clients share.

use crate::client::Client;
use crate::error::{Error, Result};

/// Parent path under which lock nodes live.
pub const LOCKS_ROOT: &str = "/locks";
/// Parent path under which queue nodes live.
pub const QUEUES_ROOT: &str = "/queues";

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') || name == "." || name == ".." {
        return Err(Error::InvalidArgument(format!(
            "{} name '{}' must be a single path segment",
            kind, name
        )));
    }
    Ok(())
}

/// A named lock bound to a client.
#[derive(Debug, Clone)]
pub struct Lock {
    client: Client,
    name: String,
}

impl Lock {
    /// Shared lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client this lock operates through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Node under which contenders register.
    pub fn base_path(&self) -> String {
        format!("{}/{}", LOCKS_ROOT, self.name)
    }
}

/// A named queue bound to a client.
#[derive(Debug, Clone)]
pub struct Queue {
    client: Client,
    name: String,
}

impl Queue {
    /// Shared queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client this queue operates through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Node under which items are stored.
    pub fn base_path(&self) -> String {
        format!("{}/{}", QUEUES_ROOT, self.name)
    }
}

impl Client {
    /// Lock handle for `name`.
    pub fn lock_for(&self, name: &str) -> Result<Lock> {
        validate_name("lock", name)?;
        Ok(Lock {
            client: self.clone(),
            name: name.to_string(),
        })
    }

    /// Queue handle for `name`.
    pub fn queue_for(&self, name: &str) -> Result<Queue> {
        validate_name("queue", name)?;
        Ok(Queue {
            client: self.clone(),
            name: name.to_string(),
        })
    }
}
