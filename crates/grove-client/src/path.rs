//! Node path helpers.

use crate::error::{Error, Result};

/// The root path.
pub const ROOT: &str = "/";

/// Check that `path` is absolute, has no empty, `.` or `..` segments, no
/// trailing slash (except the root itself), and no NUL characters.
pub fn validate_path(path: &str) -> Result<()> {
    let reject = |reason: &str| Err(Error::InvalidArgument(format!("path '{}' {}", path, reason)));

    if !path.starts_with('/') {
        return reject("must be absolute");
    }
    if path == ROOT {
        return Ok(());
    }
    if path.ends_with('/') {
        return reject("must not end with '/'");
    }
    if path.contains('\0') {
        return reject("must not contain NUL");
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return reject("contains an empty segment"),
            "." | ".." => return reject("contains a relative segment"),
            _ => {}
        }
    }
    Ok(())
}

/// Whether `path` is the root.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Parent of a validated path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if is_root(path) {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Final segment of a validated path; empty for the root.
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Append a child name to a parent path.
pub fn join(parent: &str, child: &str) -> String {
    if is_root(parent) {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Maps client paths into a server-side prefix and back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chroot {
    prefix: Option<String>,
}

impl Chroot {
    /// Prefix every path with `prefix`; `None` leaves paths untouched.
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !is_root(p)),
        }
    }

    /// The configured prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Client path to server path.
    pub fn to_server(&self, path: &str) -> String {
        match &self.prefix {
            None => path.to_string(),
            Some(prefix) if is_root(path) => prefix.clone(),
            Some(prefix) => format!("{}{}", prefix, path),
        }
    }

    /// Server path to client path. Paths outside the prefix pass through.
    pub fn to_client(&self, path: &str) -> String {
        let Some(prefix) = &self.prefix else {
            return path.to_string();
        };
        match path.strip_prefix(prefix.as_str()) {
            Some("") => ROOT.to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }
}
