//! In-process tree service.
//!
//! [`MemoryServer`] holds one shared tree; every [`MemoryDriver`] connected
//! to it is a separate session with its own dispatch thread. Completions and
//! watch events for a session are queued on that thread in the order the
//! tree applied them, which gives the same ordering guarantees a real
//! service connection does. Used by the test suites and for local runs
//! without a service.

use crate::driver::{Completion, Connector, Driver};
use crate::error::{Error, Result, ResultCode};
use crate::path::{is_root, name, parent};
use crate::types::{Acl, Operation, Request, Response, SessionState, Stat, ANY_VERSION};
use crate::watch::{event_type, RawWatchEvent, WatchRouter, STATE_CONNECTED};
use chrono::Utc;
use grove_config::{CreateMode, DebugLevel};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Result code for creating beneath an ephemeral node.
pub const NO_CHILDREN_FOR_EPHEMERALS: i32 = -108;
/// Result code for structurally invalid requests (e.g. deleting the root).
pub const BAD_ARGUMENTS: i32 = -8;

enum Job {
    Complete(Completion, Response),
    Watch(Arc<WatchRouter>, RawWatchEvent),
}

#[derive(Clone)]
struct WatchTarget {
    queue: flume::Sender<Job>,
    router: Arc<WatchRouter>,
}

type Watches = HashMap<String, HashMap<i64, WatchTarget>>;
type Fired = Vec<(WatchTarget, RawWatchEvent)>;

struct Node {
    data: Vec<u8>,
    acl: Vec<Acl>,
    stat: Stat,
    children: BTreeSet<String>,
    next_sequence: i32,
}

impl Node {
    fn new(data: Vec<u8>, acl: Vec<Acl>, stat: Stat) -> Self {
        Self {
            data,
            acl,
            stat,
            children: BTreeSet::new(),
            next_sequence: 0,
        }
    }
}

fn arm(watches: &mut Watches, path: &str, session: i64, target: Option<WatchTarget>) {
    if let Some(target) = target {
        watches.entry(path.to_string()).or_default().insert(session, target);
    }
}

fn fire(watches: &mut Watches, path: &str, kind: i32, fired: &mut Fired) {
    if let Some(targets) = watches.remove(path) {
        for target in targets.into_values() {
            fired.push((target, RawWatchEvent::node(kind, path)));
        }
    }
}

fn failure(code: ResultCode, path: &str) -> Response {
    Response::new(code, path)
}

struct Tree {
    nodes: HashMap<String, Node>,
    zxid: i64,
    data_watches: Watches,
    child_watches: Watches,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::new(Vec::new(), Acl::open_unsafe(), Stat::default()));
        Self {
            nodes,
            zxid: 0,
            data_watches: HashMap::new(),
            child_watches: HashMap::new(),
        }
    }

    fn next_zxid(&mut self) -> i64 {
        self.zxid += 1;
        self.zxid
    }

    fn apply(&mut self, session: i64, request: &Request, target: Option<WatchTarget>) -> (Response, Fired) {
        let path = request.path.as_str();
        let mut fired = Vec::new();

        let response = match &request.op {
            Operation::Create { data, acl, mode } => {
                self.create(session, path, data, acl, *mode, &mut fired)
            }
            Operation::GetData { .. } => match self.nodes.get(path) {
                Some(node) => {
                    let response = Response::ok(path)
                        .with_data(node.data.clone())
                        .with_stat(node.stat.clone());
                    arm(&mut self.data_watches, path, session, target);
                    response
                }
                None => failure(ResultCode::NoNode, path),
            },
            Operation::SetData { data, version } => self.set_data(path, data, *version, &mut fired),
            Operation::Delete { version } => self.delete(path, *version, &mut fired),
            Operation::GetChildren { .. } => match self.nodes.get(path) {
                Some(node) => {
                    let response = Response::ok(path)
                        .with_children(node.children.iter().cloned().collect())
                        .with_stat(node.stat.clone());
                    arm(&mut self.child_watches, path, session, target);
                    response
                }
                None => failure(ResultCode::NoNode, path),
            },
            Operation::Exists { .. } => {
                // Armed even when absent, so creation is observable.
                let response = match self.nodes.get(path) {
                    Some(node) => Response::ok(path).with_stat(node.stat.clone()),
                    None => failure(ResultCode::NoNode, path),
                };
                arm(&mut self.data_watches, path, session, target);
                response
            }
            Operation::GetAcl => match self.nodes.get(path) {
                Some(node) => Response::ok(path)
                    .with_acl(node.acl.clone())
                    .with_stat(node.stat.clone()),
                None => failure(ResultCode::NoNode, path),
            },
            Operation::SetAcl { acl, version } => match self.nodes.get_mut(path) {
                None => failure(ResultCode::NoNode, path),
                Some(node) if *version != ANY_VERSION && *version != node.stat.aversion => {
                    failure(ResultCode::BadVersion, path)
                }
                Some(node) => {
                    node.acl = acl.clone();
                    node.stat.aversion += 1;
                    Response::ok(path).with_stat(node.stat.clone())
                }
            },
        };

        (response, fired)
    }

    fn create(
        &mut self,
        session: i64,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
        fired: &mut Fired,
    ) -> Response {
        let Some(parent_path) = parent(path) else {
            return failure(ResultCode::NodeExists, path);
        };

        let final_path = {
            let Some(parent_node) = self.nodes.get_mut(parent_path) else {
                return failure(ResultCode::NoNode, path);
            };
            if mode.is_sequential() {
                let sequence = parent_node.next_sequence;
                parent_node.next_sequence += 1;
                format!("{}{:010}", path, sequence)
            } else {
                path.to_string()
            }
        };

        if self.nodes.contains_key(&final_path) {
            return failure(ResultCode::NodeExists, path);
        }
        if self.nodes.get(parent_path).is_some_and(|p| p.stat.is_ephemeral()) {
            return failure(ResultCode::Unknown(NO_CHILDREN_FOR_EPHEMERALS), path);
        }

        let zxid = self.next_zxid();
        let now = Utc::now().timestamp_millis();
        if let Some(parent_node) = self.nodes.get_mut(parent_path) {
            parent_node.children.insert(name(&final_path).to_string());
            parent_node.stat.cversion += 1;
            parent_node.stat.num_children += 1;
            parent_node.stat.pzxid = zxid;
        }

        let stat = Stat {
            czxid: zxid,
            mzxid: zxid,
            ctime: now,
            mtime: now,
            ephemeral_owner: if mode.is_ephemeral() { session } else { 0 },
            data_length: data.len() as i32,
            pzxid: zxid,
            ..Default::default()
        };
        self.nodes
            .insert(final_path.clone(), Node::new(data.to_vec(), acl.to_vec(), stat));

        fire(&mut self.data_watches, &final_path, event_type::NODE_CREATED, fired);
        fire(&mut self.child_watches, parent_path, event_type::NODE_CHILDREN_CHANGED, fired);

        Response::ok(path).with_created_path(final_path)
    }

    fn set_data(&mut self, path: &str, data: &[u8], version: i32, fired: &mut Fired) -> Response {
        let zxid = self.zxid + 1;
        let stat = match self.nodes.get_mut(path) {
            None => return failure(ResultCode::NoNode, path),
            Some(node) if version != ANY_VERSION && version != node.stat.version => {
                return failure(ResultCode::BadVersion, path)
            }
            Some(node) => {
                node.data = data.to_vec();
                node.stat.version += 1;
                node.stat.mzxid = zxid;
                node.stat.mtime = Utc::now().timestamp_millis();
                node.stat.data_length = data.len() as i32;
                node.stat.clone()
            }
        };
        self.zxid = zxid;

        fire(&mut self.data_watches, path, event_type::NODE_DATA_CHANGED, fired);
        Response::ok(path).with_stat(stat)
    }

    fn delete(&mut self, path: &str, version: i32, fired: &mut Fired) -> Response {
        if is_root(path) {
            return failure(ResultCode::Unknown(BAD_ARGUMENTS), path);
        }
        match self.nodes.get(path) {
            None => return failure(ResultCode::NoNode, path),
            Some(node) if version != ANY_VERSION && version != node.stat.version => {
                return failure(ResultCode::BadVersion, path)
            }
            Some(node) if !node.children.is_empty() => return failure(ResultCode::NotEmpty, path),
            Some(_) => {}
        }

        self.remove_node(path, fired);
        Response::ok(path)
    }

    fn remove_node(&mut self, path: &str, fired: &mut Fired) {
        self.nodes.remove(path);
        let zxid = self.next_zxid();

        let parent_path = parent(path);
        if let Some(parent_node) = parent_path.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.children.remove(name(path));
            parent_node.stat.cversion += 1;
            parent_node.stat.num_children -= 1;
            parent_node.stat.pzxid = zxid;
        }

        // One deleted event per session, whichever kind of watch it held.
        let mut targets = self.data_watches.remove(path).unwrap_or_default();
        targets.extend(self.child_watches.remove(path).unwrap_or_default());
        for target in targets.into_values() {
            fired.push((target, RawWatchEvent::node(event_type::NODE_DELETED, path)));
        }

        if let Some(parent_path) = parent_path {
            fire(&mut self.child_watches, parent_path, event_type::NODE_CHILDREN_CHANGED, fired);
        }
    }

    fn end_session(&mut self, session: i64) -> Fired {
        for watches in [&mut self.data_watches, &mut self.child_watches] {
            watches.retain(|_, targets| {
                targets.remove(&session);
                !targets.is_empty()
            });
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.stat.ephemeral_owner == session)
            .map(|(path, _)| path.clone())
            .collect();

        let mut fired = Vec::new();
        for path in &owned {
            trace!(session, path = %path, "Removing ephemeral node");
            self.remove_node(path, &mut fired);
        }
        fired
    }
}

fn dispatch(fired: Fired) {
    for (target, event) in fired {
        if target.queue.send(Job::Watch(target.router, event)).is_err() {
            trace!("Watch target session already stopped");
        }
    }
}

/// Shared in-memory tree. Cheap to clone; clones share the tree.
#[derive(Clone)]
pub struct MemoryServer {
    tree: Arc<Mutex<Tree>>,
    next_session: Arc<AtomicI64>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// A tree containing only the root.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(Tree::new())),
            next_session: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.tree.lock().nodes.len()
    }

    /// Whether `path` exists.
    pub fn contains(&self, path: &str) -> bool {
        self.tree.lock().nodes.contains_key(path)
    }

    /// Payload of `path`.
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.tree.lock().nodes.get(path).map(|n| n.data.clone())
    }

    /// Metadata of `path`.
    pub fn stat(&self, path: &str) -> Option<Stat> {
        self.tree.lock().nodes.get(path).map(|n| n.stat.clone())
    }

    /// Every path in the tree, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.tree.lock().nodes.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Armed (not yet fired) watches across all sessions.
    pub fn watch_count(&self) -> usize {
        let tree = self.tree.lock();
        tree.data_watches
            .values()
            .chain(tree.child_watches.values())
            .map(HashMap::len)
            .sum()
    }

    /// Open a new session on this tree.
    pub fn open_session(&self, default_watcher: Arc<WatchRouter>, debug_supported: bool) -> Result<MemoryDriver> {
        let session = self.next_session.fetch_add(1, Ordering::SeqCst);
        let (queue, jobs) = flume::unbounded::<Job>();

        std::thread::Builder::new()
            .name(format!("grove-memory-{}", session))
            .spawn(move || {
                for job in jobs.iter() {
                    match job {
                        Job::Complete(completion, response) => completion(response),
                        Job::Watch(router, event) => {
                            router.deliver(event);
                        }
                    }
                }
                trace!(session, "Dispatch thread stopped");
            })
            .map_err(|err| Error::Connect(format!("failed to start dispatch thread: {}", err)))?;

        let connected = RawWatchEvent {
            event_type: event_type::SESSION,
            state: STATE_CONNECTED,
            path: String::new(),
        };
        let _ = queue.send(Job::Watch(default_watcher, connected));

        debug!(session, "Memory session opened");
        Ok(MemoryDriver {
            session,
            tree: Arc::clone(&self.tree),
            queue: Mutex::new(Some(queue)),
            state: Mutex::new(SessionState::Connected),
            debug_level: Mutex::new(None),
            debug_supported,
        })
    }
}

/// One session against a [`MemoryServer`].
pub struct MemoryDriver {
    session: i64,
    tree: Arc<Mutex<Tree>>,
    queue: Mutex<Option<flume::Sender<Job>>>,
    state: Mutex<SessionState>,
    debug_level: Mutex<Option<DebugLevel>>,
    debug_supported: bool,
}

impl MemoryDriver {
    /// Session id, also recorded as the owner of ephemeral nodes.
    pub fn session_id(&self) -> i64 {
        self.session
    }

    /// Last debug level applied.
    pub fn debug_level(&self) -> Option<DebugLevel> {
        *self.debug_level.lock()
    }
}

impl Driver for MemoryDriver {
    fn submit(&self, request: Request, completion: Completion) {
        let Some(queue) = self.queue.lock().clone() else {
            completion(Response::new(ResultCode::InvalidState, request.path));
            return;
        };

        let target = request.watcher.clone().map(|router| WatchTarget {
            queue: queue.clone(),
            router,
        });

        // Enqueue under the tree lock so every session sees events and
        // completions in the order the tree applied them.
        let mut tree = self.tree.lock();
        let (response, fired) = tree.apply(self.session, &request, target);
        trace!(session = self.session, path = %request.path, code = ?response.code, "Applied request");
        dispatch(fired);
        if queue.send(Job::Complete(completion, response)).is_err() {
            warn!(session = self.session, "Dispatch thread gone, dropping completion");
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.is_alive() {
            return Ok(());
        }
        *state = SessionState::Closed;

        let queue = self.queue.lock().take();
        {
            let mut tree = self.tree.lock();
            let fired = tree.end_session(self.session);
            dispatch(fired);
        }
        drop(queue);

        info!(session = self.session, "Memory session closed");
        Ok(())
    }

    fn set_debug_level(&self, level: DebugLevel) -> Result<()> {
        if !self.debug_supported {
            return Err(Error::Unsupported("debug levels".to_string()));
        }
        *self.debug_level.lock() = Some(level);
        Ok(())
    }
}

impl Drop for MemoryDriver {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Connects clients to a [`MemoryServer`].
#[derive(Clone, Default)]
pub struct MemoryConnector {
    server: MemoryServer,
    without_debug_levels: bool,
}

impl MemoryConnector {
    /// Connector for `server`.
    pub fn new(server: MemoryServer) -> Self {
        Self {
            server,
            without_debug_levels: false,
        }
    }

    /// Make sessions report debug-level control as unsupported.
    pub fn without_debug_levels(mut self) -> Self {
        self.without_debug_levels = true;
        self
    }

    /// The server sessions connect to.
    pub fn server(&self) -> &MemoryServer {
        &self.server
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        hosts: &[String],
        session_timeout: Duration,
        default_watcher: Arc<WatchRouter>,
    ) -> Result<Arc<dyn Driver>> {
        debug!(
            hosts = ?hosts,
            session_timeout_ms = session_timeout.as_millis() as u64,
            "Connecting to in-memory tree"
        );
        let driver = self
            .server
            .open_session(default_watcher, !self.without_debug_levels)?;
        Ok(Arc::new(driver))
    }
}
