// ── In-memory state store ──
//
// `DashMap`-backed reference implementation of `StateStore`, with a
// `watch` version counter bumped on every mutation and optional JSON
// snapshot persistence between runs.

use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::{
    ObjectCommon, ObjectKind, ObjectSpec, StateStore, StoreError, StoredObject, is_within,
    parent_id,
};

/// Lock-free object tree living in process memory.
pub struct MemoryStore {
    namespace: String,
    objects: DashMap<String, StoredObject>,
    /// Bumped on every mutation.
    version: watch::Sender<u64>,
    last_write: watch::Sender<Option<DateTime<Utc>>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    namespace: String,
    saved_at: DateTime<Utc>,
    objects: Vec<StoredObject>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        let (version, _) = watch::channel(0u64);
        let (last_write, _) = watch::channel(None);
        Self {
            namespace: namespace.into(),
            objects: DashMap::new(),
            version,
            last_write,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, id: &str) -> Option<StoredObject> {
        self.objects.get(id).map(|r| r.value().clone())
    }

    /// Current value of a leaf, `None` if the object does not exist.
    pub fn value(&self, id: &str) -> Option<Value> {
        self.objects.get(id).map(|r| r.value.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects sorted by id.
    pub fn snapshot(&self) -> Vec<StoredObject> {
        let mut objects: Vec<StoredObject> =
            self.objects.iter().map(|r| r.value().clone()).collect();
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        objects
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Time of the most recent mutation.
    pub fn last_write(&self) -> Option<DateTime<Utc>> {
        *self.last_write.borrow()
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Write every object to `path` as pretty-printed JSON.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            namespace: self.namespace.clone(),
            saved_at: Utc::now(),
            objects: self.snapshot(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), objects = snapshot.objects.len(), "state snapshot saved");
        Ok(())
    }

    /// Restore a store from `path`. A missing file yields an empty store.
    ///
    /// Objects saved under another namespace are ignored.
    pub fn load_snapshot(namespace: impl Into<String>, path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(namespace);
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        if snapshot.namespace != store.namespace {
            debug!(
                saved = %snapshot.namespace,
                expected = %store.namespace,
                "snapshot namespace differs, starting empty"
            );
            return Ok(store);
        }
        for object in snapshot.objects {
            store.objects.insert(object.id.clone(), object);
        }
        debug!(path = %path.display(), objects = store.len(), "state snapshot loaded");
        Ok(store)
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        self.last_write.send_replace(Some(Utc::now()));
    }
}

impl StateStore for MemoryStore {
    async fn ensure_object(&self, id: &str, spec: &ObjectSpec) -> Result<bool, StoreError> {
        if self.objects.contains_key(id) {
            return Ok(false);
        }
        if let Some(parent) = parent_id(id) {
            if !self.objects.contains_key(parent) {
                return Err(StoreError::MissingParent { id: id.to_owned() });
            }
        }
        self.objects.insert(
            id.to_owned(),
            StoredObject {
                id: id.to_owned(),
                kind: spec.kind,
                common: spec.common.clone(),
                value: Value::Null,
            },
        );
        self.bump_version();
        Ok(true)
    }

    async fn update_common(&self, id: &str, common: &ObjectCommon) -> Result<(), StoreError> {
        let mut entry = self
            .objects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;
        entry.common = common.clone();
        drop(entry);
        self.bump_version();
        Ok(())
    }

    async fn set_value(&self, id: &str, value: Value) -> Result<(), StoreError> {
        let mut entry = self
            .objects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;
        if entry.kind != ObjectKind::Leaf {
            return Err(StoreError::NotALeaf { id: id.to_owned() });
        }
        entry.value = value;
        drop(entry);
        self.bump_version();
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError> {
        Ok(self.snapshot())
    }

    async fn delete_recursive(&self, id: &str) -> Result<usize, StoreError> {
        let doomed: Vec<String> = self
            .objects
            .iter()
            .filter(|r| is_within(r.key(), id))
            .map(|r| r.key().clone())
            .collect();
        for key in &doomed {
            self.objects.remove(key);
        }
        if !doomed.is_empty() {
            self.bump_version();
        }
        Ok(doomed.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{StateCommon, ValueKind};
    use serde_json::json;

    const NUMBER: StateCommon = StateCommon {
        name: "Load",
        kind: ValueKind::Number,
        role: "value",
        unit: Some("%"),
    };

    #[tokio::test]
    async fn rejects_orphan_objects() {
        let store = MemoryStore::new("test.0");
        let err = store
            .ensure_object("metrics.cpu", &ObjectSpec::container("CPU"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));
    }

    #[tokio::test]
    async fn ensure_is_idempotent_and_keeps_value() {
        let store = MemoryStore::new("test.0");
        store.ensure_object("metrics", &ObjectSpec::container("Metrics")).await.unwrap();
        assert!(store.ensure_object("metrics.load", &ObjectSpec::leaf(&NUMBER)).await.unwrap());
        store.set_value("metrics.load", json!(12.5)).await.unwrap();
        assert!(!store.ensure_object("metrics.load", &ObjectSpec::leaf(&NUMBER)).await.unwrap());
        assert_eq!(store.value("metrics.load"), Some(json!(12.5)));
    }

    #[tokio::test]
    async fn containers_hold_no_values() {
        let store = MemoryStore::new("test.0");
        store.ensure_object("metrics", &ObjectSpec::container("Metrics")).await.unwrap();
        let err = store.set_value("metrics", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotALeaf { .. }));
    }

    #[tokio::test]
    async fn delete_is_recursive_on_segment_boundary() {
        let store = MemoryStore::new("test.0");
        for id in ["shares", "shares.list", "shares.list.media", "sharesX"] {
            store.ensure_object(id, &ObjectSpec::container(id)).await.unwrap();
        }
        assert_eq!(store.delete_recursive("shares").await.unwrap(), 3);
        assert!(store.contains("sharesX"));
        assert_eq!(store.delete_recursive("shares").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mutations_bump_version() {
        let store = MemoryStore::new("test.0");
        let rx = store.subscribe();
        store.ensure_object("a", &ObjectSpec::container("A")).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.version(), 1);
        assert!(store.last_write().is_some());
    }

    #[tokio::test]
    async fn snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("snapshot.json");

        let store = MemoryStore::new("test.0");
        store.ensure_object("metrics", &ObjectSpec::container("Metrics")).await.unwrap();
        store.ensure_object("metrics.load", &ObjectSpec::leaf(&NUMBER)).await.unwrap();
        store.set_value("metrics.load", json!(3.25)).await.unwrap();
        store.save_snapshot(&path).unwrap();

        let restored = MemoryStore::load_snapshot("test.0", &path).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());

        let other = MemoryStore::load_snapshot("other.0", &path).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn missing_snapshot_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load_snapshot("test.0", &dir.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }
}
