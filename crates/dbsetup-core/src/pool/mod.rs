//! Connection pool keyed by logical resource name.
//!
//! - Each resource gets a slot with `limit` permits and a stack of idle connections.
//! - Slots and their physical connections are created lazily on first acquire.
//! - `PooledConnection` returns its connection to the slot when dropped, so a
//!   borrowed connection is released on every exit path.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::{ResourceConfig, ResourceMap};
use crate::domain::PoolError;
use crate::ports::{Connection, Connector};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-resource pool state.
struct Slot {
    resource: String,
    config: ResourceConfig,
    /// One permit per connection that may be lent out concurrently.
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    opened: AtomicUsize,
}

impl Slot {
    fn new(resource: &str, config: ResourceConfig) -> Self {
        Self {
            resource: resource.to_string(),
            permits: Arc::new(Semaphore::new(config.limit)),
            config,
            idle: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
        }
    }

    fn in_use(&self) -> usize {
        self.config.limit.saturating_sub(self.permits.available_permits())
    }
}

/// Lends connections per resource and enforces each resource's `limit`.
pub struct ConnectionPool {
    resources: ResourceMap,
    connector: Arc<dyn Connector>,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl ConnectionPool {
    pub fn new(resources: ResourceMap, connector: Arc<dyn Connector>) -> Self {
        Self {
            resources,
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    /// Configuration a resource name resolves to (with `db` fallback).
    pub fn config(&self, resource: &str) -> Result<&ResourceConfig, PoolError> {
        self.resources
            .get(resource)
            .ok_or_else(|| PoolError::UnknownResource(resource.to_string()))
    }

    fn slot(&self, resource: &str) -> Result<Arc<Slot>, PoolError> {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(resource) {
            return Ok(Arc::clone(slot));
        }
        let config = self.config(resource)?.clone();
        let slot = Arc::new(Slot::new(resource, config));
        slots.insert(resource.to_string(), Arc::clone(&slot));
        Ok(slot)
    }

    /// Borrow a connection, waiting up to the resource's acquire timeout.
    ///
    /// Fails with `PoolError::Exhausted` if no connection frees up in time.
    pub async fn acquire(&self, resource: &str) -> Result<PooledConnection, PoolError> {
        let slot = self.slot(resource)?;
        let limit = slot.config.limit;

        let acquire = Arc::clone(&slot.permits).acquire_owned();
        let permit = match tokio::time::timeout(slot.config.acquire_timeout(), acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed(resource.to_string())),
            Err(_) => {
                warn!(resource, limit, "connection pool exhausted");
                return Err(PoolError::Exhausted {
                    resource: resource.to_string(),
                    limit,
                });
            }
        };

        let idle = lock(&slot.idle).pop();
        let conn = match idle {
            Some(conn) => conn,
            // the permit is dropped (and returned) if opening fails
            None => self.open(&slot).await?,
        };

        debug!(resource, in_use = slot.in_use(), "connection acquired");
        Ok(PooledConnection {
            conn: Some(conn),
            slot,
            _permit: permit,
        })
    }

    async fn open(&self, slot: &Slot) -> Result<Box<dyn Connection>, PoolError> {
        let resource = slot.resource.as_str();
        debug!(resource, adapter = %slot.config.adapter, "opening connection");

        let connect_err = |source| PoolError::Connect {
            resource: resource.to_string(),
            source,
        };
        let mut conn = self
            .connector
            .connect(resource, &slot.config)
            .await
            .map_err(connect_err)?;
        for stmt in &slot.config.stmt {
            conn.execute(stmt, &[]).await.map_err(connect_err)?;
        }

        slot.opened.fetch_add(1, Ordering::SeqCst);
        Ok(conn)
    }

    /// Return a connection to its resource.
    ///
    /// Dropping the `PooledConnection` has the same effect.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Connections of `resource` currently lent out.
    pub fn in_use(&self, resource: &str) -> usize {
        lock(&self.slots)
            .get(resource)
            .map(|slot| slot.in_use())
            .unwrap_or(0)
    }

    /// Connections lent out across all resources.
    pub fn total_in_use(&self) -> usize {
        lock(&self.slots).values().map(|slot| slot.in_use()).sum()
    }

    /// Physical connections opened so far for `resource`.
    pub fn connections_opened(&self, resource: &str) -> usize {
        lock(&self.slots)
            .get(resource)
            .map(|slot| slot.opened.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Drop idle connections and refuse further acquisitions.
    pub fn close(&self) {
        for slot in lock(&self.slots).values() {
            slot.permits.close();
            lock(&slot.idle).clear();
        }
    }
}

/// A connection exclusively owned by one caller until dropped.
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    slot: Arc<Slot>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub fn resource(&self) -> &str {
        &self.slot.resource
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        match self.conn.as_deref() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on drop"),
        }
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_deref_mut() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on drop"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let resource = self.slot.resource.as_str();
        // runs before `_permit` is dropped, so the idle connection is visible
        // to the next caller that obtains the permit
        match self.conn.take() {
            Some(conn) if conn.is_broken() => {
                warn!(resource, "discarding broken connection");
            }
            Some(conn) if !self.slot.permits.is_closed() => {
                lock(&self.slot.idle).push(conn);
                debug!(resource, "connection released");
            }
            _ => debug!(resource, "connection released"),
        }
    }
}
