//! Connection registry
//!
//! Tracks named logical connections to the backing SQLite plugin and
//! guarantees at most one live connection per `(name, read_only)` key.
//!
//! ## Slot lifecycle
//!
//! `Absent -> Open` on a successful `create`, `Open -> Absent` on a
//! successful `close`. A failed backend call leaves the slot where it was.
//!
//! ## Concurrency
//!
//! The entry list sits behind an async mutex that is held across the backend
//! `open`/`close` call, so the existence check and the mutation of `create`
//! and `close` are never interleaved with another registry operation.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ConnectionDefaults;
use crate::domain::{
    BackendError, BridgeError, BridgeResult, Connection, ConnectionKey, ConnectionOptions,
};
use crate::ports::ISqliteBackend;

type Entry<B> = Arc<Connection<<B as ISqliteBackend>::Handle>>;

// ============================================================================
// ConnectionMap
// ============================================================================

/// Snapshot of the registry in creation order
///
/// Keys follow [`ConnectionKey`]'s display form: `name` for read-write and
/// `RO_name` for read-only connections.
#[derive(Debug)]
pub struct ConnectionMap<H> {
    entries: Vec<(String, Arc<Connection<H>>)>,
}

impl<H> ConnectionMap<H> {
    /// Keys in creation order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Connection<H>>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, conn)| conn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Connection<H>>)> {
        self.entries.iter().map(|(key, conn)| (key.as_str(), conn))
    }
}

impl<H> IntoIterator for ConnectionMap<H> {
    type Item = (String, Arc<Connection<H>>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// CloseAllReport
// ============================================================================

/// Outcome of the best-effort `close_all`
///
/// The registry is empty afterwards whatever this report says.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseAllReport {
    /// Keys whose handles were released
    pub closed: Vec<String>,
    /// Keys whose release failed, with the backend error
    pub failures: Vec<(String, BackendError)>,
}

impl CloseAllReport {
    /// True when every handle was released
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Owner of every live connection to one SQLite backend
pub struct ConnectionRegistry<B: ISqliteBackend> {
    backend: Arc<B>,
    defaults: ConnectionDefaults,
    entries: Mutex<Vec<Entry<B>>>,
}

impl<B: ISqliteBackend> ConnectionRegistry<B> {
    /// Creates an empty registry over `backend`
    ///
    /// `defaults` fill the options a caller leaves unset in `create`.
    pub fn new(backend: Arc<B>, defaults: ConnectionDefaults) -> Self {
        Self {
            backend,
            defaults,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn defaults(&self) -> &ConnectionDefaults {
        &self.defaults
    }

    /// Open a new connection and register it
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `name` is empty
    /// - `AlreadyExists` if the `(name, read_only)` key is live
    /// - `Backing` if the backend fails to open; the registry is unchanged
    pub async fn create(
        &self,
        name: &str,
        options: &ConnectionOptions,
    ) -> BridgeResult<Arc<Connection<B::Handle>>> {
        if name.is_empty() {
            return Err(BridgeError::invalid_argument("Must provide a database name"));
        }
        let request = options.resolve(name, &self.defaults);
        let key = request.key();

        let mut entries = self.entries.lock().await;
        if entries.iter().any(|conn| conn.matches(&key)) {
            return Err(BridgeError::AlreadyExists(key.to_string()));
        }

        let handle = self.backend.open(&request).await?;
        let conn = Arc::new(Connection::new(request, handle));
        entries.push(Arc::clone(&conn));

        info!(
            connection = %key,
            id = %conn.id(),
            version = conn.options().version,
            "Connection opened"
        );
        Ok(conn)
    }

    /// Look up a live connection
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is not live.
    pub async fn retrieve(
        &self,
        name: &str,
        read_only: bool,
    ) -> BridgeResult<Arc<Connection<B::Handle>>> {
        let key = ConnectionKey::new(name, read_only);
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|conn| conn.matches(&key))
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(key.to_string()))
    }

    /// Every live connection in creation order; empty when none is open
    pub async fn retrieve_all(&self) -> ConnectionMap<B::Handle> {
        let entries = self.entries.lock().await;
        ConnectionMap {
            entries: entries
                .iter()
                .map(|conn| (conn.key().to_string(), Arc::clone(conn)))
                .collect(),
        }
    }

    /// Whether the key is live
    pub async fn contains(&self, name: &str, read_only: bool) -> bool {
        let key = ConnectionKey::new(name, read_only);
        self.entries
            .lock()
            .await
            .iter()
            .any(|conn| conn.matches(&key))
    }

    /// Number of live connections
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Release a connection and unregister it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key is not live
    /// - `Backing` if the backend fails to release; the entry is kept
    pub async fn close(&self, name: &str, read_only: bool) -> BridgeResult<()> {
        let key = ConnectionKey::new(name, read_only);

        let mut entries = self.entries.lock().await;
        let position = entries
            .iter()
            .position(|conn| conn.matches(&key))
            .ok_or_else(|| BridgeError::NotFound(key.to_string()))?;

        self.backend.close(entries[position].handle()).await?;
        let conn = entries.remove(position);

        info!(connection = %key, id = %conn.id(), "Connection closed");
        Ok(())
    }

    /// Release every connection, best effort
    ///
    /// Each handle is released in creation order. Failures are logged and
    /// reported, and the registry is cleared regardless.
    pub async fn close_all(&self) -> CloseAllReport {
        let mut entries = self.entries.lock().await;
        let mut report = CloseAllReport::default();

        for conn in entries.drain(..) {
            let key = conn.key().to_string();
            match self.backend.close(conn.handle()).await {
                Ok(()) => {
                    debug!(connection = %key, "Connection closed");
                    report.closed.push(key);
                }
                Err(e) => {
                    warn!(connection = %key, error = %e, "Failed to close connection, dropping it");
                    report.failures.push((key, e));
                }
            }
        }

        info!(
            closed = report.closed.len(),
            failed = report.failures.len(),
            "All connections closed"
        );
        report
    }

    /// Tear down the registry, releasing every connection
    pub async fn shutdown(self) -> CloseAllReport {
        self.close_all().await
    }
}

impl<B: ISqliteBackend> Drop for ConnectionRegistry<B> {
    fn drop(&mut self) {
        let open = self.entries.get_mut().len();
        if open > 0 {
            warn!(open, "Connection registry dropped with open connections");
        }
    }
}
