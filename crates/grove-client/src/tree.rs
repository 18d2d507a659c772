//! Idempotent recursive tree operations.
//!
//! Both operations run on an explicit work stack instead of recursion, so
//! tree depth is bounded by memory rather than the call stack.

use crate::client::Client;
use crate::error::{ErrorKind, Result};
use crate::path::{is_root, join, parent, validate_path};
use crate::types::Acl;
use grove_config::CreateMode;
use tracing::debug;

enum Step {
    /// List the node's children and schedule them ahead of its removal.
    Visit(String),
    /// Delete the node itself; all of its children were handled first.
    Remove(String),
}

impl Client {
    /// Make sure `path` and all of its ancestors exist, creating missing
    /// nodes as persistent and empty.
    ///
    /// Nodes created concurrently by other clients count as success. When a
    /// create fails because the parent is missing, the parent chain is
    /// ensured first and the create is retried once; a second failure, or a
    /// missing parent directly below the root, is returned to the caller.
    pub fn ensure_path(&self, path: &str) -> Result<()> {
        validate_path(path)?;

        // (path, already retried after ensuring its parent)
        let mut stack: Vec<(String, bool)> = vec![(path.to_string(), false)];

        while let Some((current, retried)) = stack.pop() {
            if is_root(&current) {
                continue;
            }

            match self.create_with(&current, Vec::<u8>::new(), Acl::open_unsafe(), CreateMode::Persistent) {
                Ok(_) => debug!(path = %current, "Created path node"),
                Err(err) if err.kind() == ErrorKind::NodeExists => {
                    debug!(path = %current, "Path node already exists");
                }
                Err(err) if err.kind() == ErrorKind::NoNode && !retried => {
                    let Some(up) = parent(&current).filter(|p| !is_root(p)) else {
                        return Err(err);
                    };
                    let up = up.to_string();
                    debug!(path = %current, parent = %up, "Parent missing, ensuring it first");
                    stack.push((current, true));
                    stack.push((up, false));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Delete `path` and everything beneath it.
    ///
    /// Children are always removed before their parent. Nodes that vanish
    /// underneath the walk (deleted by another client, or listed twice) are
    /// skipped. Any other failure stops the walk and is returned; nodes
    /// already deleted stay deleted. The root itself is never removed, only
    /// emptied.
    pub fn delete_subtree(&self, path: &str) -> Result<()> {
        validate_path(path)?;

        let mut stack = vec![Step::Visit(path.to_string())];

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(node) => match self.get_children(&node, false) {
                    Ok(children) => {
                        if !is_root(&node) {
                            stack.push(Step::Remove(node.clone()));
                        }
                        stack.extend(
                            children
                                .iter()
                                .rev()
                                .map(|child| Step::Visit(join(&node, child))),
                        );
                    }
                    Err(err) if err.kind() == ErrorKind::NoNode => {
                        debug!(path = %node, "Subtree already gone");
                    }
                    Err(err) => return Err(err),
                },
                Step::Remove(node) => match self.delete(&node, None) {
                    Ok(()) => debug!(path = %node, "Deleted node"),
                    Err(err) if err.kind() == ErrorKind::NoNode => {
                        debug!(path = %node, "Node already deleted");
                    }
                    Err(err) => return Err(err),
                },
            }
        }

        Ok(())
    }

    /// Delete each subtree in order; see [`Client::delete_subtree`].
    ///
    /// Paths are validated up front, so a malformed entry fails the call
    /// before anything is deleted.
    pub fn delete_subtrees<I, P>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let paths: Vec<P> = paths.into_iter().collect();
        for path in &paths {
            validate_path(path.as_ref())?;
        }
        for path in &paths {
            self.delete_subtree(path.as_ref())?;
        }
        Ok(())
    }
}
