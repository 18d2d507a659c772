//! # Grove Configuration Library
//!
//! Typed configuration for grove clients: where to connect, how long a
//! session may stay silent, which debug level to ask the driver for, and the
//! default node mode used by `create_default`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grove_config::ConfigLoader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("grove.toml")?;
//!     config.validate()?;
//!     println!("connecting to {:?}", config.connect.host_list());
//!     Ok(())
//! }
//! ```
//!
//! Configuration files are TOML:
//!
//! ```toml
//! [connect]
//! hosts = "zk1:2181,zk2:2181"
//! session_timeout_ms = 15000
//! chroot = "/apps/billing"
//!
//! [logging]
//! debug_level = "info"
//!
//! [defaults]
//! create_mode = "persistent"
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;
mod modes;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use modes::*;
