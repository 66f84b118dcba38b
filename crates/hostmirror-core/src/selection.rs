// ── Selection expansion ──
//
// Turns raw user-chosen domain ids into the concrete set of queryable
// domains: every selected node contributes itself and all descendants that
// carry a definition. Ancestors are never pulled in.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::catalog::{Catalog, DomainDefinition, DomainNode};

/// The set of queryable domain ids in effect for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveSelection(BTreeSet<&'static str>);

impl EffectiveSelection {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Definitions of the selected domains, in id order.
    pub fn definitions(&self, catalog: &Catalog) -> Vec<&'static DomainDefinition> {
        self.iter().filter_map(|id| catalog.definition(id)).collect()
    }

    /// State-tree prefixes owned by the selected domains.
    pub fn allowed_prefixes(&self, catalog: &Catalog) -> Vec<&'static str> {
        self.definitions(catalog)
            .into_iter()
            .flat_map(DomainDefinition::state_prefixes)
            .collect()
    }
}

impl FromIterator<&'static str> for EffectiveSelection {
    fn from_iter<I: IntoIterator<Item = &'static str>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn collect_queryable(catalog: &Catalog, node: &'static DomainNode, out: &mut BTreeSet<&'static str>) {
    if catalog.is_queryable(node.id) {
        out.insert(node.id);
    }
    for child in node.children {
        collect_queryable(catalog, child, out);
    }
}

/// Expand raw ids into an [`EffectiveSelection`].
///
/// Unknown ids are dropped with a warning. When nothing known remains the
/// catalog defaults are used instead. Expanding an already-expanded
/// selection returns the same set.
pub fn expand_selection<S: AsRef<str>>(catalog: &Catalog, raw: &[S]) -> EffectiveSelection {
    let mut roots: Vec<&'static DomainNode> = Vec::new();
    for id in raw {
        let id = id.as_ref().trim();
        if id.is_empty() {
            continue;
        }
        match catalog.find_node(id) {
            Some(node) => roots.push(node),
            None => warn!(domain = %id, "ignoring unknown domain"),
        }
    }

    if roots.is_empty() {
        debug!("no known domains selected, using defaults");
        roots = catalog
            .default_selection()
            .into_iter()
            .filter_map(|id| catalog.find_node(id))
            .collect();
    }

    let mut selected = BTreeSet::new();
    for node in roots {
        collect_queryable(catalog, node, &mut selected);
    }
    EffectiveSelection(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(selection: &EffectiveSelection) -> Vec<&'static str> {
        selection.iter().collect()
    }

    #[test]
    fn category_expands_to_queryable_descendants() {
        let selection = expand_selection(Catalog::builtin(), &["array"]);
        assert_eq!(ids(&selection), ["array.disks", "array.status"]);
    }

    #[test]
    fn category_equals_explicit_children() {
        let catalog = Catalog::builtin();
        assert_eq!(
            expand_selection(catalog, &["system"]),
            expand_selection(catalog, &["system.info", "system.versions", "system.online"])
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let catalog = Catalog::builtin();
        let once = expand_selection(catalog, &["metrics", "docker", "vms"]);
        let raw: Vec<&str> = once.iter().collect();
        assert_eq!(expand_selection(catalog, &raw), once);
    }

    #[test]
    fn leaf_never_pulls_in_ancestors_or_siblings() {
        let selection = expand_selection(Catalog::builtin(), &["metrics.memory"]);
        assert_eq!(ids(&selection), ["metrics.memory"]);
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let selection = expand_selection(Catalog::builtin(), &["shares", "nonsense"]);
        assert_eq!(ids(&selection), ["shares"]);
    }

    #[test]
    fn empty_or_unknown_falls_back_to_defaults() {
        let catalog = Catalog::builtin();
        let defaults = expand_selection(catalog, &catalog.default_selection());
        assert_eq!(expand_selection::<&str>(catalog, &[]), defaults);
        assert_eq!(expand_selection(catalog, &["bogus", " "]), defaults);
        assert!(defaults.contains("system.online"));
    }

    #[test]
    fn prefixes_include_dynamic_bases() {
        let catalog = Catalog::builtin();
        let prefixes = expand_selection(catalog, &["docker"]).allowed_prefixes(catalog);
        assert!(prefixes.contains(&"docker.containers"));
        assert!(prefixes.contains(&"docker.containerCount"));
    }
}
