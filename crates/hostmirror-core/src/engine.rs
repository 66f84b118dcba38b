// ── Sync engine ──
//
// Wires the selection expander, query planner, state synchronizer,
// dynamic resource reconciler and object tree manager into one session.
// The poller drives it; tests and the `once` command can drive it directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, DomainDefinition, StateCommon, ValueKind};
use crate::error::CoreError;
use crate::query::{QueryPlan, build_query_plan};
use crate::resources::{DynamicResourceReconciler, ReconcileOutcome, ResourceCategory};
use crate::selection::{EffectiveSelection, expand_selection};
use crate::store::StateStore;
use crate::sync::{StateSynchronizer, SyncOutcome};
use crate::tree::{INFO_PREFIX, ObjectTreeManager};

pub const CONNECTION_STATE: &str = "info.connection";
pub const LAST_POLL_STATE: &str = "info.lastPoll";

const CONNECTION: StateCommon = StateCommon {
    name: "Connected to server",
    kind: ValueKind::Boolean,
    role: "indicator.connected",
    unit: None,
};

const LAST_POLL: StateCommon = StateCommon {
    name: "Last successful poll",
    kind: ValueKind::String,
    role: "date",
    unit: None,
};

/// Summary of one processed response.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub finished_at: DateTime<Utc>,
    /// Domains whose values were written.
    pub applied: Vec<&'static str>,
    /// Domains skipped because a root field was absent.
    pub skipped: Vec<&'static str>,
    pub resources: BTreeMap<ResourceCategory, ReconcileOutcome>,
}

pub struct SyncEngine<S> {
    catalog: &'static Catalog,
    store: Arc<S>,
    selection: EffectiveSelection,
    definitions: Vec<&'static DomainDefinition>,
    plan: Option<QueryPlan>,
    synchronizer: StateSynchronizer,
    reconciler: DynamicResourceReconciler,
    tree: ObjectTreeManager,
    seeded: bool,
}

impl<S: StateStore> SyncEngine<S> {
    pub fn new(catalog: &'static Catalog, store: Arc<S>) -> Self {
        Self {
            catalog,
            store,
            selection: EffectiveSelection::default(),
            definitions: Vec::new(),
            plan: None,
            synchronizer: StateSynchronizer::new(),
            reconciler: DynamicResourceReconciler::new(),
            tree: ObjectTreeManager::new(catalog),
            seeded: false,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn selection(&self) -> &EffectiveSelection {
        &self.selection
    }

    pub fn plan(&self) -> Option<&QueryPlan> {
        self.plan.as_ref()
    }

    pub fn tree(&self) -> &ObjectTreeManager {
        &self.tree
    }

    pub fn reconciler(&self) -> &DynamicResourceReconciler {
        &self.reconciler
    }

    /// Apply a (new) raw domain selection.
    ///
    /// Replaces the effective selection and query plan wholesale, removes
    /// objects of domains that are no longer selected and creates the
    /// state layout of newly selected ones. On first use the catalog is
    /// validated and the object inventory is seeded from the store.
    pub async fn configure<T: AsRef<str>>(&mut self, raw: &[T]) -> Result<(), CoreError> {
        if !self.seeded {
            self.catalog.validate()?;
        }
        let selection = expand_selection(self.catalog, raw);
        let definitions = selection.definitions(self.catalog);
        let plan = build_query_plan(&definitions);

        let store = Arc::clone(&self.store);
        if !self.seeded {
            let existing = self.tree.initialize(store.as_ref()).await?;
            debug!(existing, "object inventory seeded from store");
            self.seeded = true;
        }

        self.tree
            .cleanup_unselected_domains(store.as_ref(), &selection)
            .await;
        self.reconciler.apply_selection(&selection);
        self.synchronizer.forget_unselected(&selection);

        self.tree
            .ensure_container(store.as_ref(), INFO_PREFIX, "Connection info")
            .await?;
        self.tree
            .ensure_leaf(store.as_ref(), CONNECTION_STATE, &CONNECTION)
            .await?;
        self.tree
            .ensure_leaf(store.as_ref(), LAST_POLL_STATE, &LAST_POLL)
            .await?;
        let created = self
            .synchronizer
            .initialize_once(store.as_ref(), &mut self.tree, &definitions)
            .await?;

        info!(
            domains = selection.len(),
            roots = plan.as_ref().map_or(0, |p| p.roots().count()),
            created,
            "selection configured"
        );
        self.selection = selection;
        self.definitions = definitions;
        self.plan = plan;
        Ok(())
    }

    /// Map one response into the state tree.
    pub async fn process_cycle(&mut self, data: &Map<String, Value>) -> CycleReport {
        let store = Arc::clone(&self.store);
        let cycle = self.tree.begin_cycle();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for definition in self.definitions.iter().copied() {
            match self
                .synchronizer
                .apply(store.as_ref(), &mut self.tree, definition, data)
                .await
            {
                SyncOutcome::Applied { .. } => applied.push(definition.id),
                SyncOutcome::Skipped { .. } => skipped.push(definition.id),
            }
        }

        let mut resources = BTreeMap::new();
        for category in DynamicResourceReconciler::active_categories(&self.selection) {
            let outcome = self
                .reconciler
                .reconcile(store.as_ref(), &mut self.tree, category, data)
                .await;
            resources.insert(category, outcome);
        }

        debug!(cycle, applied = applied.len(), skipped = skipped.len(), "cycle processed");
        CycleReport {
            cycle,
            finished_at: Utc::now(),
            applied,
            skipped,
            resources,
        }
    }

    /// Record connectivity. A successful poll also stamps `info.lastPoll`.
    pub async fn mark_connection(&mut self, connected: bool) {
        let store = Arc::clone(&self.store);
        if let Err(e) = self
            .tree
            .write(store.as_ref(), CONNECTION_STATE, Value::Bool(connected))
            .await
        {
            warn!(error = %e, "could not record connection state");
        }
        if connected {
            let now = Value::String(Utc::now().to_rfc3339());
            if let Err(e) = self.tree.write(store.as_ref(), LAST_POLL_STATE, now).await {
                warn!(error = %e, "could not record poll time");
            }
        }
    }
}
