// ── Dynamic resource reconciler ──
//
// Keeps each category's mirrored instance sub-trees in step with the
// collection seen in the latest response: new keys get a sub-tree, known
// keys get fresh values, vanished keys are swept away.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use super::{ResourceCategory, extract_instances};
use crate::catalog::{StateCommon, ValueKind};
use crate::error::CoreError;
use crate::selection::EffectiveSelection;
use crate::store::StateStore;
use crate::tree::ObjectTreeManager;

const COUNT: StateCommon = StateCommon {
    name: "Count",
    kind: ValueKind::Number,
    role: "value",
    unit: None,
};

#[derive(Debug, Default, Clone)]
struct CategoryState {
    detected: bool,
    tracked: BTreeSet<String>,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub structural_change: bool,
    /// Objects newly created in the store.
    pub created: usize,
    /// Leaf values written.
    pub written: usize,
    /// Instance keys whose sub-trees were deleted.
    pub removed: Vec<String>,
}

#[derive(Debug)]
pub struct DynamicResourceReconciler {
    states: BTreeMap<ResourceCategory, CategoryState>,
}

impl Default for DynamicResourceReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicResourceReconciler {
    pub fn new() -> Self {
        Self {
            states: ResourceCategory::iter()
                .map(|c| (c, CategoryState::default()))
                .collect(),
        }
    }

    /// Categories whose driving domain is part of `selection`.
    pub fn active_categories(selection: &EffectiveSelection) -> Vec<ResourceCategory> {
        ResourceCategory::iter()
            .filter(|c| selection.contains(c.spec().domain_id))
            .collect()
    }

    /// Reset every category whose domain left the selection, so that a
    /// later re-selection recreates its instances from scratch.
    pub fn apply_selection(&mut self, selection: &EffectiveSelection) {
        for (category, state) in &mut self.states {
            if !selection.contains(category.spec().domain_id) && state.detected {
                debug!(category = %category, "category deselected, clearing state");
                *state = CategoryState::default();
            }
        }
    }

    pub fn is_detected(&self, category: ResourceCategory) -> bool {
        self.states.get(&category).is_some_and(|s| s.detected)
    }

    /// Keys currently tracked for a category.
    pub fn tracked(&self, category: ResourceCategory) -> BTreeSet<String> {
        self.states
            .get(&category)
            .map(|s| s.tracked.clone())
            .unwrap_or_default()
    }

    /// Reconcile one category against the response.
    ///
    /// Store failures are logged per object and never abort the pass.
    pub async fn reconcile<S: StateStore>(
        &mut self,
        store: &S,
        tree: &mut ObjectTreeManager,
        category: ResourceCategory,
        data: &Map<String, Value>,
    ) -> ReconcileOutcome {
        let spec = category.spec();
        let instances = extract_instances(spec, data);
        let current: BTreeSet<String> = instances.iter().map(|i| i.key.clone()).collect();

        let state = self.states.entry(category).or_default();
        let structural_change = !state.detected
            || state.tracked.len() != current.len()
            || current.iter().any(|k| !state.tracked.contains(k));

        let mut outcome = ReconcileOutcome {
            structural_change,
            ..ReconcileOutcome::default()
        };

        if structural_change {
            if state.detected {
                debug!(category = %category, instances = current.len(), "membership changed");
            } else {
                info!(category = %category, instances = current.len(), "dynamic resources detected");
            }
            state.detected = true;
            state.tracked.clone_from(&current);

            let mut tally = |result: Result<bool, CoreError>, id: &str| match result {
                Ok(true) => outcome.created += 1,
                Ok(false) => {}
                Err(e) => warn!(category = %category, id, error = %e, "could not create object"),
            };

            let r = tree.ensure_container(store, spec.base_path, spec.base_name).await;
            tally(r, spec.base_path);
            let count = StateCommon {
                name: spec.count_name,
                ..COUNT
            };
            let r = tree.ensure_leaf(store, spec.count_id, &count).await;
            tally(r, spec.count_id);

            for instance in &instances {
                let id = spec.instance_id(&instance.key);
                let r = tree.ensure_container(store, &id, &instance.label).await;
                tally(r, &id);
                for leaf in spec.leaves {
                    let leaf_id = spec.leaf_id(&instance.key, leaf.suffix);
                    let r = tree.ensure_leaf(store, &leaf_id, &leaf.common).await;
                    tally(r, &leaf_id);
                }
            }

            if let Err(e) = tree.write(store, spec.count_id, Value::from(current.len())).await {
                warn!(category = %category, error = %e, "count write failed");
            }
        }

        for instance in instances.iter().filter(|i| state.tracked.contains(&i.key)) {
            for leaf in spec.leaves {
                let leaf_id = spec.leaf_id(&instance.key, leaf.suffix);
                match tree.write(store, &leaf_id, instance.leaf_value(leaf)).await {
                    Ok(()) => outcome.written += 1,
                    Err(e) => warn!(category = %category, id = %leaf_id, error = %e, "value write failed"),
                }
            }
        }

        outcome.removed = tree.handle_dynamic_resources(store, category, &current).await;
        if !outcome.removed.is_empty() {
            info!(category = %category, removed = ?outcome.removed, "dynamic resources removed");
        }
        outcome
    }
}
