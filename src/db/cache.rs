//! Connection cache.
//!
//! One live connection per distinct connection key, created lazily on first
//! use, probed before every reuse and replaced when the probe fails.
//!
//! Each key owns its own async mutex, so probe-or-connect for one key is a
//! critical section: concurrent callers for the same key wait for the first
//! one instead of opening a second connection. Different keys never block
//! each other beyond the short map lookup.

use crate::db::client::{ConnectTimeouts, DatabaseClient};
use crate::error::DbResult;
use crate::models::{ConnectionKey, ConnectionSettings};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Slot<H> = Arc<Mutex<Option<H>>>;

/// Outcome of closing every cached connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Connections closed cleanly.
    pub closed: usize,
    /// Keys whose close call failed. They are dropped from the cache anyway.
    pub failed: Vec<ConnectionKey>,
}

/// Point-in-time view of the cache, taken without waiting on any key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Keys holding a live connection that no call is using, sorted.
    pub idle: Vec<ConnectionKey>,
    /// Keys a call is currently connecting, checking or using, sorted.
    pub busy: Vec<ConnectionKey>,
}

/// Key → live handle map owning the connection lifecycle.
pub struct ConnectionCache<C: DatabaseClient> {
    client: C,
    timeouts: ConnectTimeouts,
    entries: Mutex<HashMap<ConnectionKey, Slot<C::Handle>>>,
}

impl<C: DatabaseClient> ConnectionCache<C> {
    pub fn new(client: C) -> Self {
        Self::with_timeouts(client, ConnectTimeouts::default())
    }

    pub fn with_timeouts(client: C, timeouts: ConnectTimeouts) -> Self {
        Self {
            client,
            timeouts,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The client used to open, probe and close connections.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Timeouts applied to every connection this cache opens.
    pub fn timeouts(&self) -> &ConnectTimeouts {
        &self.timeouts
    }

    /// Return a live handle for `settings`, reusing the cached one when it
    /// still answers a probe.
    ///
    /// A failed probe evicts the entry without closing it and falls through
    /// to a fresh connection. A failed connect stores nothing.
    pub async fn acquire(&self, settings: &ConnectionSettings) -> DbResult<C::Handle> {
        let key = settings.key();
        let slot = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let mut guard = slot.lock().await;

        if let Some(handle) = guard.as_ref() {
            match self.client.probe(handle).await {
                Ok(()) => {
                    debug!(key = %key, "Reusing cached connection");
                    return Ok(handle.clone());
                }
                Err(e) => {
                    warn!(
                        key = %key,
                        error = %e,
                        "Cached connection failed liveness probe, reconnecting"
                    );
                    *guard = None;
                }
            }
        }

        match self.client.connect(settings, &self.timeouts).await {
            Ok(handle) => {
                info!(key = %key, client = self.client.name(), "Opened new connection");
                *guard = Some(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to open connection");
                drop(guard);
                self.prune_empty(&key, &slot).await;
                Err(e)
            }
        }
    }

    /// Drop an empty slot nobody else is waiting on.
    async fn prune_empty(&self, key: &ConnectionKey, slot: &Slot<C::Handle>) {
        let mut entries = self.entries.lock().await;

        // Waiters clone the slot under the map lock, so the count is stable here:
        // one reference in the map, one held by the caller.
        let unused = entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if !unused {
            return;
        }

        let empty = slot.try_lock().is_ok_and(|guard| guard.is_none());
        if empty {
            entries.remove(key);
        }
    }

    /// Close every cached connection and empty the cache.
    ///
    /// Close failures are logged and reported but never stop the remaining
    /// closes. Calling this again on an empty cache is a no-op.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut drained: Vec<(ConnectionKey, Slot<C::Handle>)> = {
            let mut entries = self.entries.lock().await;
            entries.drain().collect()
        };
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = ShutdownReport::default();

        for (key, slot) in drained {
            let Some(handle) = slot.lock().await.take() else {
                continue;
            };

            match self.client.close(handle).await {
                Ok(()) => {
                    debug!(key = %key, "Closed connection");
                    report.closed += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to close connection");
                    report.failed.push(key);
                }
            }
        }

        info!(
            closed = report.closed,
            failed = report.failed.len(),
            "Connection cache shut down"
        );
        report
    }

    /// Classify every entry without waiting on its key.
    ///
    /// A key whose slot is locked is mid-acquire, so it is reported as busy
    /// whether or not it already holds a connection. Empty idle slots are
    /// left out.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::default();
        {
            let entries = self.entries.lock().await;
            for (key, slot) in entries.iter() {
                match slot.try_lock() {
                    Ok(guard) if guard.is_some() => snapshot.idle.push(key.clone()),
                    Ok(_) => {}
                    Err(_) => snapshot.busy.push(key.clone()),
                }
            }
        }
        snapshot.idle.sort();
        snapshot.busy.sort();
        snapshot
    }

    /// Keys that hold a live connection nobody is using, sorted.
    pub async fn keys(&self) -> Vec<ConnectionKey> {
        self.snapshot().await.idle
    }

    pub async fn len(&self) -> usize {
        self.keys().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<C: DatabaseClient + std::fmt::Debug> std::fmt::Debug for ConnectionCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("client", &self.client)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}
