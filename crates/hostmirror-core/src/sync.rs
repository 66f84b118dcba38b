// ── Fixed-state synchronization ──
//
// Maps the fixed fields of each selected domain from the response into
// their state ids. Object creation happens once per domain; values are
// written every cycle the domain's roots are present.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::DomainDefinition;
use crate::error::CoreError;
use crate::selection::EffectiveSelection;
use crate::store::StateStore;
use crate::tree::ObjectTreeManager;

/// Follow `path` through nested objects. `None` when a key is missing or
/// an intermediate value is not an object.
pub fn resolve_path<'a>(data: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = data.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// Result of applying one definition to one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A declared root was absent; nothing was written.
    Skipped { missing_root: &'static str },
    Applied { written: usize },
}

#[derive(Debug, Default)]
pub struct StateSynchronizer {
    initialized: HashSet<&'static str>,
}

impl StateSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every mapped state of not-yet-initialized definitions with a
    /// null value. Returns the number of objects created.
    pub async fn initialize_once<S: StateStore>(
        &mut self,
        store: &S,
        tree: &mut ObjectTreeManager,
        definitions: &[&'static DomainDefinition],
    ) -> Result<usize, CoreError> {
        let mut created = 0;
        for definition in definitions {
            if self.initialized.contains(definition.id) {
                continue;
            }
            for mapping in definition.states {
                if tree.ensure_leaf(store, mapping.id, &mapping.common).await? {
                    created += 1;
                }
            }
            self.initialized.insert(definition.id);
            debug!(domain = %definition.id, "domain states initialized");
        }
        Ok(created)
    }

    /// Drop initialization marks of domains no longer selected, so a later
    /// re-selection creates their states again.
    pub fn forget_unselected(&mut self, selection: &EffectiveSelection) {
        self.initialized.retain(|id| selection.contains(id));
    }

    /// Write every mapped value of `definition` from `data`.
    ///
    /// Skips the whole definition when any declared root is missing, which
    /// leaves the previous values in place. Individual write failures are
    /// logged and skipped.
    pub async fn apply<S: StateStore>(
        &self,
        store: &S,
        tree: &mut ObjectTreeManager,
        definition: &'static DomainDefinition,
        data: &Map<String, Value>,
    ) -> SyncOutcome {
        if let Some(missing_root) = definition.roots().find(|root| !data.contains_key(*root)) {
            debug!(domain = %definition.id, root = missing_root, "root absent, keeping last values");
            return SyncOutcome::Skipped { missing_root };
        }

        let mut written = 0;
        for mapping in definition.states {
            let raw = resolve_path(data, mapping.path).unwrap_or(&Value::Null);
            let value = match mapping.transform {
                Some(transform) => transform(raw).unwrap_or(Value::Null),
                None => raw.clone(),
            };
            match tree.write(store, mapping.id, value).await {
                Ok(()) => written += 1,
                Err(e) => warn!(domain = %definition.id, id = mapping.id, error = %e, "state write failed"),
            }
        }
        SyncOutcome::Applied { written }
    }
}
