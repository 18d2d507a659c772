//! Shared fixtures for grove-client integration tests.

#![allow(dead_code)]

use grove_client::memory::{MemoryConnector, MemoryServer};
use grove_client::{
    Client, ClientConfig, Completion, Connector, DebugLevel, Driver, Operation, Request, Response,
    ResultCode, SessionState, WatchRouter,
};
use parking_lot::Mutex;
use std::sync::{mpsc, Arc, Once};
use std::time::Duration;

/// Upper bound for anything a test waits on.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route library logs to the test harness output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Connect a fresh client to `server` with default settings.
pub fn connect(server: &MemoryServer) -> Client {
    init_tracing();
    Client::connect(&MemoryConnector::new(server.clone()), &ClientConfig::default())
        .expect("connect to memory server")
}

/// Run `f` on its own thread and report its result through a channel.
pub fn spawn_result<T, F>(f: F) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx
}

/// One submitted operation, as seen by a [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub op: &'static str,
    pub path: String,
}

/// Forwards to an inner driver, recording every request and optionally
/// failing some of them.
pub struct RecordingDriver {
    inner: Arc<dyn Driver>,
    log: Arc<Mutex<Vec<Recorded>>>,
    fault: Option<Arc<dyn Fn(&Request) -> Option<ResultCode> + Send + Sync>>,
}

impl Driver for RecordingDriver {
    fn submit(&self, request: Request, completion: Completion) {
        self.log.lock().push(Recorded {
            op: request.op.name(),
            path: request.path.clone(),
        });
        if let Some(code) = self.fault.as_ref().and_then(|fault| fault(&request)) {
            completion(Response::new(code, request.path));
            return;
        }
        self.inner.submit(request, completion);
    }

    fn state(&self) -> SessionState {
        self.inner.state()
    }

    fn close(&self) -> grove_client::Result<()> {
        self.inner.close()
    }

    fn set_debug_level(&self, level: DebugLevel) -> grove_client::Result<()> {
        self.inner.set_debug_level(level)
    }
}

/// Connector producing [`RecordingDriver`] sessions over a memory server.
#[derive(Clone)]
pub struct RecordingConnector {
    memory: MemoryConnector,
    pub log: Arc<Mutex<Vec<Recorded>>>,
    fault: Option<Arc<dyn Fn(&Request) -> Option<ResultCode> + Send + Sync>>,
}

impl RecordingConnector {
    pub fn new(server: &MemoryServer) -> Self {
        Self {
            memory: MemoryConnector::new(server.clone()),
            log: Arc::default(),
            fault: None,
        }
    }

    /// Fail requests for which `fault` returns a code, without forwarding.
    pub fn with_fault<F>(mut self, fault: F) -> Self
    where
        F: Fn(&Request) -> Option<ResultCode> + Send + Sync + 'static,
    {
        self.fault = Some(Arc::new(fault));
        self
    }

    pub fn client(&self) -> Client {
        init_tracing();
        Client::connect(self, &ClientConfig::default()).expect("connect recording client")
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    pub fn recorded_ops(&self, op: &str) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.op == op)
            .map(|r| r.path.clone())
            .collect()
    }
}

impl Connector for RecordingConnector {
    fn connect(
        &self,
        hosts: &[String],
        session_timeout: Duration,
        default_watcher: Arc<WatchRouter>,
    ) -> grove_client::Result<Arc<dyn Driver>> {
        let inner = self.memory.connect(hosts, session_timeout, default_watcher)?;
        Ok(Arc::new(RecordingDriver {
            inner,
            log: Arc::clone(&self.log),
            fault: self.fault.clone(),
        }))
    }
}

/// Whether `request` is a delete of `path`.
pub fn is_delete_of(request: &Request, path: &str) -> bool {
    matches!(request.op, Operation::Delete { .. }) && request.path == path
}

/// Whether `request` is a create of `path`.
pub fn is_create_of(request: &Request, path: &str) -> bool {
    matches!(request.op, Operation::Create { .. }) && request.path == path
}
