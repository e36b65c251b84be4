//! # In-Memory Persistence Gateway
//!
//! Reference [`PersistenceGateway`] backed by an ordered map. Supports
//! deterministic fault injection, an artificial per-operation latency and a
//! reachability toggle so the resilience layer can be exercised without a
//! real backend.
//!
//! ## Usage
//!
//! ```rust
//! use cmdgate_core::models::{Record, RecordKey};
//! use cmdgate_core::persistence::{
//!     BackendError, GatewayOperation, InMemoryGateway, PersistenceGateway, ScriptedFaults,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let faults = Arc::new(ScriptedFaults::new());
//! let gateway = InMemoryGateway::with_faults(faults.clone());
//! faults.fail_next(GatewayOperation::Save, 1, BackendError::transient("connection reset"));
//!
//! let tag = Record::new(RecordKey::new("tags", "t1"), json!({ "name": "Beach" }));
//! assert!(gateway.save(tag.clone()).await.is_err());
//! assert!(gateway.save(tag).await.is_ok());
//! assert_eq!(gateway.len(), 1);
//! # });
//! ```

use super::faults::{FaultInjector, NoFaults};
use super::gateway::{BackendError, BackendResult, GatewayOperation, PersistenceGateway};
use crate::models::{Record, RecordKey};
use crate::resilience::ReachabilityProbe;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct InMemoryGateway {
    storage: RwLock<BTreeMap<RecordKey, Value>>,
    faults: Arc<dyn FaultInjector>,
    reachable: AtomicBool,
    latency: RwLock<Option<Duration>>,
    writes: AtomicUsize,
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("records", &self.storage.read().len())
            .field("reachable", &self.reachable.load(Ordering::Acquire))
            .field("writes", &self.writes.load(Ordering::Acquire))
            .finish()
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::with_faults(Arc::new(NoFaults))
    }

    pub fn with_faults(faults: Arc<dyn FaultInjector>) -> Self {
        Self {
            storage: RwLock::new(BTreeMap::new()),
            faults,
            reachable: AtomicBool::new(true),
            latency: RwLock::new(None),
            writes: AtomicUsize::new(0),
        }
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Simulate the backend going away or coming back.
    ///
    /// While unreachable every operation fails with a transient error and
    /// [`ReachabilityProbe::ping`] reports `false`.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Insert a record directly, bypassing faults, latency and write counting
    pub fn seed(&self, record: Record) {
        self.storage.write().insert(record.key, record.data);
    }

    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        self.storage
            .read()
            .get(key)
            .map(|data| Record::new(key.clone(), data.clone()))
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.storage
            .read()
            .iter()
            .filter(|(key, _)| key.collection == collection)
            .map(|(key, data)| Record::new(key.clone(), data.clone()))
            .collect()
    }

    /// Copy of the whole store, for before/after equality checks
    pub fn snapshot(&self) -> BTreeMap<RecordKey, Value> {
        self.storage.read().clone()
    }

    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }

    /// Successful `save`/`delete` calls that changed the store
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    async fn enter(
        &self,
        operation: GatewayOperation,
        collection: &str,
        key: Option<&RecordKey>,
    ) -> BackendResult<()> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if !self.reachable.load(Ordering::Acquire) {
            return Err(BackendError::transient("backend unreachable"));
        }

        if let Some(error) = self.faults.before_operation(operation, collection, key) {
            trace!(
                operation = %operation,
                collection = collection,
                error = %error,
                "Injected backend fault"
            );
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn find_by_id(&self, key: &RecordKey) -> BackendResult<Option<Record>> {
        self.enter(GatewayOperation::FindById, &key.collection, Some(key))
            .await?;
        Ok(self.get(key))
    }

    async fn find_all(&self, collection: &str) -> BackendResult<Vec<Record>> {
        self.enter(GatewayOperation::FindAll, collection, None).await?;
        Ok(self.records(collection))
    }

    async fn save(&self, record: Record) -> BackendResult<Record> {
        self.enter(GatewayOperation::Save, &record.key.collection, Some(&record.key))
            .await?;
        self.storage
            .write()
            .insert(record.key.clone(), record.data.clone());
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(record)
    }

    async fn delete(&self, key: &RecordKey) -> BackendResult<bool> {
        self.enter(GatewayOperation::Delete, &key.collection, Some(key))
            .await?;
        let removed = self.storage.write().remove(key).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::AcqRel);
        }
        Ok(removed)
    }

    async fn count_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> BackendResult<usize> {
        self.enter(GatewayOperation::Count, collection, None).await?;
        let count = self
            .storage
            .read()
            .iter()
            .filter(|(key, data)| key.collection == collection && data.get(field) == Some(value))
            .count();
        Ok(count)
    }
}

#[async_trait]
impl ReachabilityProbe for InMemoryGateway {
    async fn ping(&self) -> bool {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.reachable.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::ScriptedFaults;
    use serde_json::json;

    fn tag(id: &str, name: &str) -> Record {
        Record::new(RecordKey::new("tags", id), json!({ "name": name }))
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let gateway = InMemoryGateway::new();
        gateway.save(tag("t1", "Beach")).await.unwrap();
        gateway.save(tag("t2", "Museum")).await.unwrap();

        let found = gateway
            .find_by_id(&RecordKey::new("tags", "t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.str_field("name"), Some("Beach"));
        assert_eq!(gateway.find_all("tags").await.unwrap().len(), 2);
        assert_eq!(
            gateway
                .count_where("tags", "name", &json!("Museum"))
                .await
                .unwrap(),
            1
        );

        assert!(gateway.delete(&RecordKey::new("tags", "t1")).await.unwrap());
        assert!(!gateway.delete(&RecordKey::new("tags", "t1")).await.unwrap());
        assert_eq!(gateway.writes(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_transiently() {
        let gateway = InMemoryGateway::new();
        gateway.set_reachable(false);

        let err = gateway.find_all("tags").await.unwrap_err();
        assert!(err.is_transient());
        assert!(!gateway.ping().await);

        gateway.set_reachable(true);
        assert!(gateway.ping().await);
    }

    #[tokio::test]
    async fn test_injected_fault_leaves_store_untouched() {
        let faults = Arc::new(ScriptedFaults::new());
        faults.fail_next(GatewayOperation::Save, 1, BackendError::fatal("constraint"));
        let gateway = InMemoryGateway::with_faults(faults.clone());

        assert!(gateway.save(tag("t1", "Beach")).await.is_err());
        assert!(gateway.is_empty());
        gateway.save(tag("t1", "Beach")).await.unwrap();
        assert_eq!(gateway.len(), 1);
        assert_eq!(faults.calls(GatewayOperation::Save), 2);
    }

    #[tokio::test]
    async fn test_seed_bypasses_faults() {
        let faults = Arc::new(ScriptedFaults::new());
        faults.fail_always(GatewayOperation::Save, BackendError::transient("down"));
        let gateway = InMemoryGateway::with_faults(faults);

        gateway.seed(tag("t1", "Beach"));
        assert_eq!(gateway.records("tags").len(), 1);
        assert_eq!(gateway.writes(), 0);
    }
}
