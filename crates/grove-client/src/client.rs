//! Connection facade.
//!
//! Every tree primitive has two entry points: a blocking one that returns
//! typed values and fails with the translated error, and an `_async` one
//! that submits immediately and returns a [`Pending`] future resolving to the
//! raw [`Response`]. Both go through [`Client::submit`], which checks the
//! session state, applies the chroot, and arms watches.
//!
//! Blocking entry points park the calling thread; do not call them from
//! inside an async runtime (use `spawn_blocking` or the `_async` variants).

use crate::driver::{Completion, Connector, Driver};
use crate::error::{Error, Result, ResultCode};
use crate::path::{validate_path, Chroot};
use crate::registry::WatchRegistry;
use crate::types::{Acl, Request, Response, SessionState, Stat};
use crate::watch::WatchRouter;
use grove_config::{ClientConfig, CreateMode, DebugLevel};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

struct ClientInner {
    driver: Arc<dyn Driver>,
    router: Arc<WatchRouter>,
    chroot: Chroot,
    default_mode: CreateMode,
}

/// Handle to a coordination-service session. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("chroot", &self.inner.chroot.prefix())
            .field("registry", self.registry())
            .finish()
    }
}

impl Client {
    /// Validate `config`, connect through `connector`, and apply the
    /// configured debug level.
    pub fn connect(connector: &dyn Connector, config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let hosts = config.connect.host_list();
        let chroot = Chroot::new(config.connect.chroot.clone());
        let router = Arc::new(WatchRouter::new(WatchRegistry::new(), chroot.clone()));

        info!(
            hosts = %config.connect.hosts,
            session_timeout_ms = config.connect.session_timeout_ms,
            chroot = ?chroot.prefix(),
            "Connecting client"
        );
        let driver = connector.connect(&hosts, config.connect.session_timeout(), Arc::clone(&router))?;

        let client = Self {
            inner: Arc::new(ClientInner {
                driver,
                router,
                chroot,
                default_mode: config.defaults.create_mode,
            }),
        };
        client.apply_debug_level(config.logging.debug_level)?;
        Ok(client)
    }

    /// Wrap an already connected driver. `router` must be the watcher the
    /// driver was connected with.
    pub fn from_driver(driver: Arc<dyn Driver>, router: Arc<WatchRouter>, chroot: Chroot) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                driver,
                router,
                chroot,
                default_mode: CreateMode::default(),
            }),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.driver.state()
    }

    /// The event-dispatch registry fed by this client's watches.
    pub fn registry(&self) -> &WatchRegistry {
        self.inner.router.registry()
    }

    /// Mode used by [`Client::create_default`].
    pub fn default_mode(&self) -> CreateMode {
        self.inner.default_mode
    }

    fn ensure_open(&self, path: &str) -> Result<()> {
        let state = self.state();
        if state.is_alive() {
            Ok(())
        } else {
            warn!(path = %path, state = ?state, "Rejecting operation on closed client");
            Err(Error::Closed)
        }
    }

    /// Submit a raw request; `completion` receives the untranslated response
    /// on the driver's dispatch thread.
    ///
    /// This is the continuation entry point: it never blocks, so it is safe
    /// to call from inside a watch callback or another completion.
    pub fn submit(&self, mut request: Request, completion: Completion) -> Result<()> {
        validate_path(&request.path)?;
        self.ensure_open(&request.path)?;

        let client_path = std::mem::take(&mut request.path);
        request.path = self.inner.chroot.to_server(&client_path);
        self.inner.router.arm(&mut request);

        debug!(
            path = %client_path,
            op = request.op.name(),
            watch = request.watcher.is_some(),
            "Dispatching request"
        );

        let chroot = self.inner.chroot.clone();
        self.inner.driver.submit(
            request,
            Box::new(move |mut response: Response| {
                response.path = client_path;
                response.created_path = response.created_path.map(|p| chroot.to_client(&p));
                completion(response);
            }),
        );
        Ok(())
    }

    fn pending(&self, request: Request) -> Result<Pending> {
        let path = request.path.clone();
        let (tx, rx) = oneshot::channel();
        self.submit(
            request,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        )?;
        Ok(Pending { path, rx })
    }

    // Async entry points

    /// Submit a create.
    pub fn create_async(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
        acl: Vec<Acl>,
        mode: CreateMode,
    ) -> Result<Pending> {
        self.pending(Request::create(path, data.into(), acl, mode))
    }

    /// Submit a read.
    pub fn get_async(&self, path: &str, watch: bool) -> Result<Pending> {
        self.pending(Request::get_data(path, watch))
    }

    /// Submit a write.
    pub fn set_async(&self, path: &str, data: impl Into<Vec<u8>>, version: Option<i32>) -> Result<Pending> {
        self.pending(Request::set_data(path, data.into(), version))
    }

    /// Submit a delete.
    pub fn delete_async(&self, path: &str, version: Option<i32>) -> Result<Pending> {
        self.pending(Request::delete(path, version))
    }

    /// Submit a child listing.
    pub fn get_children_async(&self, path: &str, watch: bool) -> Result<Pending> {
        self.pending(Request::get_children(path, watch))
    }

    /// Submit an existence check.
    pub fn exists_async(&self, path: &str, watch: bool) -> Result<Pending> {
        self.pending(Request::exists(path, watch))
    }

    /// Submit an ACL read.
    pub fn get_acl_async(&self, path: &str) -> Result<Pending> {
        self.pending(Request::get_acl(path))
    }

    /// Submit an ACL write.
    pub fn set_acl_async(&self, path: &str, acl: Vec<Acl>, version: Option<i32>) -> Result<Pending> {
        self.pending(Request::set_acl(path, acl, version))
    }

    // Blocking entry points

    /// Create a node with the open ACL. Returns the final path, which
    /// carries the sequence suffix for sequential modes.
    pub fn create(&self, path: &str, data: impl Into<Vec<u8>>, mode: CreateMode) -> Result<String> {
        self.create_with(path, data, Acl::open_unsafe(), mode)
    }

    /// Create a node using the configured default mode.
    pub fn create_default(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<String> {
        self.create(path, data, self.inner.default_mode)
    }

    /// Create a node with an explicit ACL.
    pub fn create_with(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
        acl: Vec<Acl>,
        mode: CreateMode,
    ) -> Result<String> {
        let response = self.create_async(path, data, acl, mode)?.wait()?.validate()?;
        required(response.created_path, path, "created_path")
    }

    /// Read a node's payload and metadata.
    pub fn get(&self, path: &str, watch: bool) -> Result<(Vec<u8>, Stat)> {
        let response = self.get_async(path, watch)?.wait()?.validate()?;
        let stat = required(response.stat, path, "stat")?;
        Ok((response.data.unwrap_or_default(), stat))
    }

    /// Replace a node's payload. `None` skips the version check.
    pub fn set(&self, path: &str, data: impl Into<Vec<u8>>, version: Option<i32>) -> Result<Stat> {
        let response = self.set_async(path, data, version)?.wait()?.validate()?;
        required(response.stat, path, "stat")
    }

    /// Delete a childless node. `None` matches any version.
    pub fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        self.delete_async(path, version)?.wait()?.validate()?;
        Ok(())
    }

    /// List child names, sorted.
    pub fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let response = self.get_children_async(path, watch)?.wait()?.validate()?;
        let mut children = required(response.children, path, "children")?;
        children.sort();
        Ok(children)
    }

    /// Metadata for `path`, `None` if it does not exist.
    ///
    /// A missing node is a normal outcome here, not an error; with
    /// `watch` set the watch is armed either way and fires on creation.
    pub fn stat(&self, path: &str, watch: bool) -> Result<Option<Stat>> {
        let response = self.exists_async(path, watch)?.wait()?;
        if response.code == ResultCode::NoNode {
            return Ok(None);
        }
        let response = response.validate()?;
        required(response.stat, path, "stat").map(Some)
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &str, watch: bool) -> Result<bool> {
        Ok(self.stat(path, watch)?.is_some())
    }

    /// Read a node's ACL and metadata.
    pub fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat)> {
        let response = self.get_acl_async(path)?.wait()?.validate()?;
        let acl = required(response.acl, path, "acl")?;
        let stat = required(response.stat, path, "stat")?;
        Ok((acl, stat))
    }

    /// Replace a node's ACL. `None` skips the ACL version check.
    pub fn set_acl(&self, path: &str, acl: Vec<Acl>, version: Option<i32>) -> Result<Stat> {
        let response = self.set_acl_async(path, acl, version)?.wait()?.validate()?;
        required(response.stat, path, "stat")
    }

    // Lifecycle

    /// Close the session.
    ///
    /// Returns `Ok(false)` if it was already closed. Every subscription is
    /// dropped, so blocked waiters wake with `Error::Closed`, and later
    /// operations fail fast with the same error.
    pub fn close(&self) -> Result<bool> {
        let state = self.state();
        if !state.is_alive() {
            debug!(state = ?state, "Client already closed");
            return Ok(false);
        }

        self.inner.driver.close()?;
        self.registry().clear();
        info!("Client closed");
        Ok(true)
    }

    /// Set the driver's debug level from its name.
    ///
    /// Unknown names fail with `InvalidArgument` before the driver is
    /// touched. Drivers that cannot change levels are tolerated.
    pub fn set_debug_level(&self, level: &str) -> Result<()> {
        let level: DebugLevel = level
            .parse()
            .map_err(|err: grove_config::ConfigError| Error::InvalidArgument(err.to_string()))?;
        self.apply_debug_level(level)
    }

    fn apply_debug_level(&self, level: DebugLevel) -> Result<()> {
        match self.inner.driver.set_debug_level(level) {
            Ok(()) => {
                debug!(level = %level, "Driver debug level set");
                Ok(())
            }
            Err(Error::Unsupported(reason)) => {
                warn!(level = %level, reason = %reason, "Driver does not support debug levels");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

fn required<T>(value: Option<T>, path: &str, field: &'static str) -> Result<T> {
    value.ok_or_else(|| Error::Protocol {
        path: path.to_string(),
        field,
    })
}

/// An in-flight operation.
///
/// Resolves to the raw response; `validate()` it to apply error translation.
/// Resolves to a `ConnectionLoss` error if the driver drops the operation.
#[must_use = "a pending operation does nothing observable unless awaited or waited on"]
pub struct Pending {
    path: String,
    rx: oneshot::Receiver<Response>,
}

impl Pending {
    /// Block the current thread until the response arrives.
    pub fn wait(self) -> Result<Response> {
        let Pending { path, rx } = self;
        rx.blocking_recv().map_err(|_| Error::connection_loss(path))
    }

    /// Path the operation addressed.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Future for Pending {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(response)) => Poll::Ready(Ok(response)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::connection_loss(self.path.clone()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("path", &self.path).finish()
    }
}
