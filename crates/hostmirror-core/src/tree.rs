// ── Object tree manager ──
//
// Inventory of every object mirrored into the state store, tagged static
// (catalog-mapped) or dynamic (a resource instance sub-tree). All object
// creation and deletion goes through here so the inventory and the store
// stay in step.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::catalog::{Catalog, StateCommon};
use crate::error::CoreError;
use crate::resources::ResourceCategory;
use crate::selection::EffectiveSelection;
use crate::store::{ObjectCommon, ObjectKind, ObjectSpec, StateStore, is_within, parent_id};

/// Connection bookkeeping states live here and are never cleaned up.
pub const INFO_PREFIX: &str = "info";

/// One object known to be present in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedObject {
    pub id: String,
    pub kind: ObjectKind,
    pub last_seen_cycle: u64,
    pub is_static: bool,
    /// Owning category and instance key for dynamic objects.
    pub resource: Option<(ResourceCategory, String)>,
}

/// Which dynamic instance, if any, an id belongs to.
fn classify(id: &str) -> Option<(ResourceCategory, String)> {
    ResourceCategory::iter().find_map(|c| c.spec().key_for_id(id).map(|key| (c, key)))
}

pub struct ObjectTreeManager {
    catalog: &'static Catalog,
    objects: BTreeMap<String, TrackedObject>,
    cycle: u64,
}

impl ObjectTreeManager {
    pub fn new(catalog: &'static Catalog) -> Self {
        Self {
            catalog,
            objects: BTreeMap::new(),
            cycle: 0,
        }
    }

    /// Advance the cycle counter used for `last_seen_cycle`.
    pub fn begin_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.cycle
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn get(&self, id: &str) -> Option<&TrackedObject> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Seed the inventory from what the store already holds and repair the
    /// display names of dynamic instance containers left without one.
    ///
    /// Safe to call repeatedly.
    pub async fn initialize<S: StateStore>(&mut self, store: &S) -> Result<usize, CoreError> {
        let existing = store.list_objects().await?;
        let cycle = self.cycle;
        for object in &existing {
            let resource = classify(&object.id);
            self.objects
                .entry(object.id.clone())
                .or_insert_with(|| TrackedObject {
                    id: object.id.clone(),
                    kind: object.kind,
                    last_seen_cycle: cycle,
                    is_static: resource.is_none(),
                    resource: resource.clone(),
                });

            let Some((category, key)) = resource else {
                continue;
            };
            let is_instance = object.id == category.spec().instance_id(&key);
            let needs_name = object.common.name.is_empty() || object.common.name == object.id;
            if is_instance && object.kind == ObjectKind::Container && needs_name {
                let common = ObjectCommon::container(key.clone());
                match store.update_common(&object.id, &common).await {
                    Ok(()) => debug!(id = %object.id, "repaired instance container name"),
                    Err(e) => warn!(id = %object.id, error = %e, "could not repair container name"),
                }
            }
        }
        debug!(objects = self.objects.len(), "object inventory seeded");
        Ok(existing.len())
    }

    /// Display name for a container created implicitly as a parent.
    fn container_name(&self, id: &str) -> String {
        if let Some(label) = self.catalog.label(id) {
            return label.to_owned();
        }
        if let Some(category) = ResourceCategory::iter().find(|c| c.spec().base_path == id) {
            return category.spec().base_name.to_owned();
        }
        id.rsplit('.').next().unwrap_or(id).to_owned()
    }

    fn track(&mut self, id: &str, kind: ObjectKind) {
        let cycle = self.cycle;
        self.objects
            .entry(id.to_owned())
            .and_modify(|o| o.last_seen_cycle = cycle)
            .or_insert_with(|| {
                let resource = classify(id);
                TrackedObject {
                    id: id.to_owned(),
                    kind,
                    last_seen_cycle: cycle,
                    is_static: resource.is_none(),
                    resource,
                }
            });
    }

    /// Create every missing ancestor of `id` as a container, outermost first.
    async fn ensure_parents<S: StateStore>(&mut self, store: &S, id: &str) -> Result<(), CoreError> {
        let mut ancestors = Vec::new();
        let mut current = parent_id(id);
        while let Some(parent) = current {
            if self.objects.contains_key(parent) {
                break;
            }
            ancestors.push(parent.to_owned());
            current = parent_id(parent);
        }
        for parent in ancestors.into_iter().rev() {
            let spec = ObjectSpec::container(self.container_name(&parent));
            store.ensure_object(&parent, &spec).await?;
            self.track(&parent, ObjectKind::Container);
        }
        Ok(())
    }

    /// Ensure a container exists with the given display name.
    pub async fn ensure_container<S: StateStore>(
        &mut self,
        store: &S,
        id: &str,
        name: &str,
    ) -> Result<bool, CoreError> {
        if self.objects.contains_key(id) {
            self.track(id, ObjectKind::Container);
            return Ok(false);
        }
        self.ensure_parents(store, id).await?;
        let created = store.ensure_object(id, &ObjectSpec::container(name)).await?;
        self.track(id, ObjectKind::Container);
        Ok(created)
    }

    /// Ensure a leaf exists, creating parents first. A new leaf starts null.
    pub async fn ensure_leaf<S: StateStore>(
        &mut self,
        store: &S,
        id: &str,
        common: &StateCommon,
    ) -> Result<bool, CoreError> {
        if self.objects.contains_key(id) {
            self.track(id, ObjectKind::Leaf);
            return Ok(false);
        }
        self.ensure_parents(store, id).await?;
        let created = store.ensure_object(id, &ObjectSpec::leaf(common)).await?;
        self.track(id, ObjectKind::Leaf);
        Ok(created)
    }

    /// Write a value to a tracked leaf and mark it seen this cycle.
    pub async fn write<S: StateStore>(
        &mut self,
        store: &S,
        id: &str,
        value: Value,
    ) -> Result<(), CoreError> {
        store.set_value(id, value).await?;
        self.track(id, ObjectKind::Leaf);
        Ok(())
    }

    /// Delete `id` and its descendants. Failures are logged and reported
    /// as `false`; the inventory keeps the objects so a later pass retries.
    pub async fn delete<S: StateStore>(&mut self, store: &S, id: &str) -> bool {
        match store.delete_recursive(id).await {
            Ok(removed) => {
                self.objects.retain(|tracked, _| !is_within(tracked, id));
                debug!(id, removed, "deleted object sub-tree");
                true
            }
            Err(e) => {
                warn!(id, error = %e, "failed to delete object sub-tree");
                false
            }
        }
    }

    /// Remove every object that is neither under a prefix owned by the
    /// selection nor an ancestor container of one. Returns how many
    /// sub-trees were deleted.
    ///
    /// Both the tracked inventory and the store's own listing are swept, so
    /// objects written behind the tree's back are pruned as well.
    pub async fn cleanup_unselected_domains<S: StateStore>(
        &mut self,
        store: &S,
        selection: &EffectiveSelection,
    ) -> usize {
        let mut prefixes = selection.allowed_prefixes(self.catalog);
        prefixes.push(INFO_PREFIX);
        let keep = |id: &str| {
            prefixes
                .iter()
                .any(|p| is_within(id, p) || is_within(p, id))
        };

        let mut candidates: BTreeSet<String> = self.objects.keys().cloned().collect();
        match store.list_objects().await {
            Ok(listed) => candidates.extend(listed.into_iter().map(|o| o.id)),
            Err(e) => warn!(error = %e, "store listing failed, sweeping tracked objects only"),
        }

        let mut doomed: Vec<String> = Vec::new();
        for id in candidates {
            if keep(&id) || doomed.iter().any(|d| is_within(&id, d)) {
                continue;
            }
            doomed.push(id);
        }

        let mut deleted = 0;
        for id in &doomed {
            if self.delete(store, id).await {
                deleted += 1;
            }
        }
        if deleted > 0 {
            debug!(deleted, "removed objects of unselected domains");
        }
        deleted
    }

    /// Instance keys currently mirrored for a category.
    pub fn tracked_keys(&self, category: ResourceCategory) -> BTreeSet<String> {
        self.objects
            .values()
            .filter_map(|o| match &o.resource {
                Some((c, key)) if *c == category => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Delete the sub-tree of every tracked instance whose key is not in
    /// `current`. Returns the keys actually removed.
    pub async fn handle_dynamic_resources<S: StateStore>(
        &mut self,
        store: &S,
        category: ResourceCategory,
        current: &BTreeSet<String>,
    ) -> Vec<String> {
        let spec = category.spec();
        let stale: Vec<String> = self
            .tracked_keys(category)
            .into_iter()
            .filter(|key| !current.contains(key))
            .collect();

        let mut removed = Vec::new();
        for key in stale {
            if self.delete(store, &spec.instance_id(&key)).await {
                removed.push(key);
            }
        }
        removed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::catalog::ValueKind;
    use crate::selection::expand_selection;
    use crate::store::{MemoryStore, StoreError, StoredObject};

    const TEXT: StateCommon = StateCommon {
        name: "Name",
        kind: ValueKind::String,
        role: "text",
        unit: None,
    };

    /// Wraps a `MemoryStore` and fails deletes of chosen ids.
    struct FlakyStore {
        inner: MemoryStore,
        failing: Mutex<HashSet<String>>,
    }

    impl StateStore for FlakyStore {
        async fn ensure_object(&self, id: &str, spec: &ObjectSpec) -> Result<bool, StoreError> {
            self.inner.ensure_object(id, spec).await
        }

        async fn update_common(&self, id: &str, common: &ObjectCommon) -> Result<(), StoreError> {
            self.inner.update_common(id, common).await
        }

        async fn set_value(&self, id: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set_value(id, value).await
        }

        async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError> {
            self.inner.list_objects().await
        }

        async fn delete_recursive(&self, id: &str) -> Result<usize, StoreError> {
            let failing = self.failing.lock().unwrap().contains(id);
            if failing {
                return Err(StoreError::Backend {
                    message: format!("refusing to delete {id}"),
                });
            }
            self.inner.delete_recursive(id).await
        }
    }

    #[tokio::test]
    async fn leaf_creation_builds_named_parents() {
        let store = MemoryStore::new("test.0");
        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        tree.ensure_leaf(&store, "system.info.hostname", &TEXT).await.unwrap();

        assert_eq!(store.get("system").unwrap().common.name, "System");
        assert_eq!(store.get("system.info").unwrap().kind, ObjectKind::Container);
        assert!(tree.get("system.info.hostname").unwrap().is_static);
    }

    #[tokio::test]
    async fn dynamic_ids_are_classified() {
        let store = MemoryStore::new("test.0");
        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        tree.ensure_leaf(&store, "docker.containers.web.image", &TEXT).await.unwrap();

        assert_eq!(store.get("docker.containers").unwrap().common.name, "Containers");
        let tracked = tree.get("docker.containers.web").unwrap();
        assert_eq!(
            tracked.resource,
            Some((ResourceCategory::Workload, "web".to_owned()))
        );
        assert_eq!(
            tree.tracked_keys(ResourceCategory::Workload),
            BTreeSet::from(["web".to_owned()])
        );
    }

    #[tokio::test]
    async fn initialize_seeds_and_repairs_names() {
        let store = MemoryStore::new("test.0");
        for id in ["docker", "docker.containers", "docker.containers.web"] {
            store.ensure_object(id, &ObjectSpec::container(id)).await.unwrap();
        }
        store.ensure_object("docker.containers.web.image", &ObjectSpec::leaf(&TEXT)).await.unwrap();

        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        assert_eq!(tree.initialize(&store).await.unwrap(), 4);
        assert_eq!(store.get("docker.containers.web").unwrap().common.name, "web");
        assert_eq!(tree.tracked_keys(ResourceCategory::Workload).len(), 1);

        // A second pass changes nothing.
        let version = store.version();
        tree.initialize(&store).await.unwrap();
        assert_eq!(store.version(), version);
    }

    #[tokio::test]
    async fn cleanup_keeps_selected_prefixes_and_their_ancestors() {
        let store = MemoryStore::new("test.0");
        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        for id in [
            "system.info.hostname",
            "system.online",
            "shares.list.media.name",
            "info.connection",
        ] {
            tree.ensure_leaf(&store, id, &TEXT).await.unwrap();
        }

        let selection = expand_selection(Catalog::builtin(), &["system.online"]);
        let deleted = tree.cleanup_unselected_domains(&store, &selection).await;

        assert_eq!(deleted, 2);
        assert!(store.contains("system"));
        assert!(store.contains("system.online"));
        assert!(store.contains("info.connection"));
        assert!(!store.contains("system.info"));
        assert!(!store.contains("shares"));
        assert!(tree.get("shares.list.media.name").is_none());
    }

    #[tokio::test]
    async fn cleanup_prunes_untracked_store_objects() {
        let store = MemoryStore::new("test.0");
        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        tree.ensure_leaf(&store, "system.online", &TEXT).await.unwrap();

        // Written straight to the store, never seen by the tree.
        store.ensure_object("vms", &ObjectSpec::container("VMs")).await.unwrap();
        store
            .ensure_object("vms.count", &ObjectSpec::leaf(&TEXT))
            .await
            .unwrap();

        let selection = expand_selection(Catalog::builtin(), &["system.online"]);
        let deleted = tree.cleanup_unselected_domains(&store, &selection).await;

        assert_eq!(deleted, 1);
        assert!(!store.contains("vms"));
        assert!(!store.contains("vms.count"));
        assert!(store.contains("system.online"));
    }

    #[tokio::test]
    async fn failed_delete_does_not_abort_sweep() {
        let store = FlakyStore {
            inner: MemoryStore::new("test.0"),
            failing: Mutex::new(HashSet::from(["docker.containers.db".to_owned()])),
        };
        let mut tree = ObjectTreeManager::new(Catalog::builtin());
        for key in ["web", "db", "cache"] {
            tree.ensure_leaf(&store, &format!("docker.containers.{key}.name"), &TEXT)
                .await
                .unwrap();
        }

        let current = BTreeSet::from(["web".to_owned()]);
        let removed = tree
            .handle_dynamic_resources(&store, ResourceCategory::Workload, &current)
            .await;

        assert_eq!(removed, ["cache"]);
        assert!(!store.inner.contains("docker.containers.cache"));
        assert!(store.inner.contains("docker.containers.db"));
        // Still tracked so the next sweep retries it.
        assert!(tree.tracked_keys(ResourceCategory::Workload).contains("db"));

        store.failing.lock().unwrap().clear();
        let removed = tree
            .handle_dynamic_resources(&store, ResourceCategory::Workload, &current)
            .await;
        assert_eq!(removed, ["db"]);
    }
}
