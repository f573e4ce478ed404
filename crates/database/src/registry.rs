use crate::connection::{Connector, PgConnector};
use crate::error::DbError;
use configuration::PoolSettings;
use core_types::TenantId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// The registry used by the rest of the workspace.
pub type PgRegistry = TenantRegistry<PgConnector>;

/// Hands out one live handle per tenant schema.
///
/// Handles are opened lazily on first use. The map lock is held only long
/// enough to find or insert a tenant's slot; the connection itself is opened
/// inside that slot's `OnceCell`, so a slow first connection to one tenant
/// never stalls lookups for another, and concurrent first lookups for the
/// same tenant share a single open.
///
/// Each opened tenant gets a keep-alive task that pings the handle on a fixed
/// interval and swaps in a fresh one when the ping fails. `evict` and
/// `shutdown` stop those tasks.
pub struct TenantRegistry<C: Connector> {
    inner: Arc<RegistryInner<C>>,
}

impl<C: Connector> Clone for TenantRegistry<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct RegistryInner<C: Connector> {
    connector: Arc<C>,
    slots: Mutex<HashMap<TenantId, Arc<TenantSlot<C::Handle>>>>,
    keepalive_interval: Duration,
    open_timeout: Duration,
}

struct TenantSlot<H> {
    entry: OnceCell<TenantEntry<H>>,
}

struct TenantEntry<H> {
    /// Shared with the keep-alive task, which replaces it after a reconnect.
    handle: Arc<RwLock<H>>,
    shutdown: watch::Sender<bool>,
}

impl<H: Clone> TenantEntry<H> {
    fn current(&self) -> H {
        self.handle.read().clone()
    }

    /// Signals the keep-alive task to end. Returns `true` for the first
    /// caller only, who then owns closing the handle.
    fn stop(&self) -> bool {
        !self.shutdown.send_replace(true)
    }
}

impl<C: Connector> TenantRegistry<C> {
    pub fn new(connector: C, keepalive_interval: Duration, open_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                connector: Arc::new(connector),
                slots: Mutex::new(HashMap::new()),
                keepalive_interval,
                open_timeout,
            }),
        }
    }

    pub fn from_settings(connector: C, settings: &PoolSettings) -> Self {
        Self::new(connector, settings.keepalive_interval(), settings.acquire_timeout())
    }

    /// Returns the tenant's handle, opening it on first use.
    ///
    /// A failed open caches nothing, so the next call tries again. Callers
    /// already waiting on the same slot retry the open inside that slot.
    pub async fn get_handle(&self, tenant: &TenantId) -> Result<C::Handle, DbError> {
        loop {
            let slot = self.slot_for(tenant);
            let entry = match slot.entry.get_or_try_init(|| self.open_entry(tenant)).await {
                Ok(entry) => entry,
                Err(e) => {
                    self.discard_if_unopened(tenant, &slot);
                    return Err(e);
                }
            };

            if self.is_mapped(tenant, &slot) {
                return Ok(entry.current());
            }

            // Evicted while the open was in flight.
            if entry.stop() {
                self.inner.connector.close(entry.current()).await;
                tracing::debug!(tenant = %tenant, "Closed connection opened during eviction.");
            }
        }
    }

    /// Whether the tenant currently has an open handle.
    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.inner
            .slots
            .lock()
            .get(tenant)
            .is_some_and(|slot| slot.entry.initialized())
    }

    /// Tenants with an open handle, in no particular order.
    pub fn tenants(&self) -> Vec<TenantId> {
        self.inner
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.entry.initialized())
            .map(|(tenant, _)| tenant.clone())
            .collect()
    }

    /// Forgets the tenant, stops its keep-alive task and closes its handle.
    /// Returns `false` if the tenant had no open handle.
    pub async fn evict(&self, tenant: &TenantId) -> bool {
        let slot = self.inner.slots.lock().remove(tenant);
        let Some(entry) = slot.as_ref().and_then(|slot| slot.entry.get()) else {
            return false;
        };

        if entry.stop() {
            self.inner.connector.close(entry.current()).await;
        }
        tracing::info!(tenant = %tenant, "Evicted tenant connection.");
        true
    }

    /// Evicts every tenant. Used on process exit.
    pub async fn shutdown(&self) {
        let slots: Vec<_> = self.inner.slots.lock().drain().collect();
        for (tenant, slot) in slots {
            if let Some(entry) = slot.entry.get().filter(|entry| entry.stop()) {
                self.inner.connector.close(entry.current()).await;
                tracing::debug!(tenant = %tenant, "Closed tenant connection.");
            }
        }
    }

    fn slot_for(&self, tenant: &TenantId) -> Arc<TenantSlot<C::Handle>> {
        let mut slots = self.inner.slots.lock();
        Arc::clone(
            slots
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(TenantSlot { entry: OnceCell::new() })),
        )
    }

    fn is_mapped(&self, tenant: &TenantId, slot: &Arc<TenantSlot<C::Handle>>) -> bool {
        self.inner
            .slots
            .lock()
            .get(tenant)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drops a never-opened slot once nobody else holds it. Clones are only
    /// taken under the map lock, so a count of two (map and caller) means no
    /// other caller is waiting to retry the open.
    fn discard_if_unopened(&self, tenant: &TenantId, slot: &Arc<TenantSlot<C::Handle>>) {
        let mut slots = self.inner.slots.lock();
        let same_slot = slots.get(tenant).is_some_and(|current| Arc::ptr_eq(current, slot));
        if same_slot && !slot.entry.initialized() && Arc::strong_count(slot) == 2 {
            slots.remove(tenant);
        }
    }

    async fn open_entry(&self, tenant: &TenantId) -> Result<TenantEntry<C::Handle>, DbError> {
        let inner = &self.inner;
        let handle = tokio::time::timeout(inner.open_timeout, inner.connector.open(tenant))
            .await
            .map_err(|_| DbError::Timeout(inner.open_timeout))??;

        let handle = Arc::new(RwLock::new(handle));
        let (shutdown, signal) = watch::channel(false);
        tokio::spawn(keep_alive(
            Arc::clone(&inner.connector),
            tenant.clone(),
            Arc::clone(&handle),
            signal,
            inner.keepalive_interval,
        ));

        tracing::info!(tenant = %tenant, "Opened tenant connection.");
        Ok(TenantEntry { handle, shutdown })
    }
}

/// Pings the tenant's handle every `period` and replaces it when the ping
/// fails. Errors are logged and retried on the next tick, never surfaced.
///
/// Ends when the entry is stopped or dropped.
async fn keep_alive<C: Connector>(
    connector: Arc<C>,
    tenant: TenantId,
    handle: Arc<RwLock<C::Handle>>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = timer.tick() => {}
        }

        let current = handle.read().clone();
        let Err(e) = connector.ping(&current).await else {
            continue;
        };
        tracing::warn!(tenant = %tenant, error = ?e, "Keep-alive ping failed, reconnecting.");

        match connector.open(&tenant).await {
            Ok(fresh) => {
                let stale = std::mem::replace(&mut *handle.write(), fresh.clone());
                connector.close(stale).await;
                tracing::info!(tenant = %tenant, "Keep-alive reconnected.");

                let stopping = *shutdown.borrow();
                if stopping {
                    connector.close(fresh).await;
                    break;
                }
            }
            Err(e) => {
                tracing::error!(tenant = %tenant, error = ?e, "Keep-alive reconnect failed, will retry.");
            }
        }
    }

    tracing::debug!(tenant = %tenant, "Keep-alive stopped.");
}
