//! # Grove Client
//!
//! A client facade over tree-structured, version-stamped coordination
//! services: nodes addressed like filesystem paths, optimistic version
//! checks, ephemeral and sequential nodes, and one-shot watches.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   Application   │───▶│      Client      │───▶│     Driver      │
//! │ (locks, queues, │    │ (blocking/async  │    │ (callback-only, │
//! │  barriers)      │    │  entry points)   │    │  own thread)    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//!         ▲                       │                       │
//!         │                       ▼                       ▼
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  WatchRegistry  │◀───│   WatchRouter    │◀───│   Raw events    │
//! │ (subscriptions) │    │  (translation)   │    │ (one-shot)      │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! On top of the primitives the client offers `ensure_path` (create a node
//! and its ancestors), `delete_subtree` (remove a node and its
//! descendants), and `wait_until_deleted`, the blocking building block for
//! lock and barrier recipes. All three tolerate other clients mutating the
//! same part of the tree concurrently.
//!
//! ## Quick Start
//!
//! ```rust
//! use grove_client::memory::{MemoryConnector, MemoryServer};
//! use grove_client::{Client, ClientConfig, CreateMode};
//!
//! # fn main() -> grove_client::Result<()> {
//! let connector = MemoryConnector::new(MemoryServer::new());
//! let client = Client::connect(&connector, &ClientConfig::default())?;
//!
//! client.ensure_path("/app/config")?;
//! client.create("/app/config/db", "postgres://db", CreateMode::Persistent)?;
//! let (data, stat) = client.get("/app/config/db", false)?;
//! assert_eq!(data, b"postgres://db");
//! assert_eq!(stat.version, 0);
//!
//! client.delete_subtree("/app")?;
//! assert!(!client.exists("/app", false)?);
//! client.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod client;
pub mod driver;
pub mod error;
pub mod memory;
pub mod path;
mod recipes;
pub mod registry;
mod tree;
pub mod types;
mod wait;
pub mod watch;

pub use client::{Client, Pending};
pub use driver::{Completion, Connector, Driver};
pub use error::{validate, Error, ErrorKind, Result, ResultCode};
pub use recipes::{Lock, Queue, LOCKS_ROOT, QUEUES_ROOT};
pub use registry::{Subscription, WatchCallback, WatchRegistry};
pub use types::{Acl, Operation, Request, Response, SessionState, Stat, ANY_VERSION};
pub use watch::{RawWatchEvent, WatchEvent, WatchEventKind, WatchRouter};

pub use grove_config::{ClientConfig, ConfigLoader, CreateMode, DebugLevel};
