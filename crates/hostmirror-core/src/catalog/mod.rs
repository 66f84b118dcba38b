// ── Domain catalog ──
//
// Static registry of selectable domains. Nodes form the tree users pick
// from; definitions say what a queryable domain fetches and where its
// values land in the state tree. Everything here is a build-time constant.

mod builtin;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::convert::Transform;
use crate::error::CoreError;
use crate::resources::ResourceCategory;

pub use builtin::BUILTIN;

/// A selectable node in the domain tree.
///
/// Category nodes only group children; they are not queryable unless a
/// [`DomainDefinition`] with the same id exists.
#[derive(Debug)]
pub struct DomainNode {
    pub id: &'static str,
    pub label: &'static str,
    pub children: &'static [DomainNode],
    pub default_selected: bool,
}

/// One field of a remote selection, with optional nested sub-fields.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub children: &'static [FieldSpec],
}

/// A remote root field plus the sub-fields a domain needs from it.
#[derive(Debug)]
pub struct RootSelection {
    pub root: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Value type of a leaf state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Json,
}

/// Display and typing metadata for a leaf state.
#[derive(Debug, Clone, Copy)]
pub struct StateCommon {
    pub name: &'static str,
    pub kind: ValueKind,
    pub role: &'static str,
    pub unit: Option<&'static str>,
}

/// Maps one response value onto one state id.
#[derive(Debug)]
pub struct StateMapping {
    pub id: &'static str,
    /// Key sequence into the response, starting at the root field.
    pub path: &'static [&'static str],
    pub common: StateCommon,
    pub transform: Option<Transform>,
}

/// What a queryable domain fetches and populates.
#[derive(Debug)]
pub struct DomainDefinition {
    pub id: &'static str,
    pub selection: &'static [RootSelection],
    pub states: &'static [StateMapping],
    /// Variable-cardinality collections driven by this domain.
    pub resources: &'static [ResourceCategory],
}

impl DomainDefinition {
    /// Root field names this definition reads.
    pub fn roots(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.selection.iter().map(|s| s.root)
    }

    /// State-tree prefixes owned by this domain: every mapped state plus
    /// the base path and count state of each dynamic collection.
    pub fn state_prefixes(&self) -> Vec<&'static str> {
        let mut prefixes: Vec<&'static str> = self.states.iter().map(|s| s.id).collect();
        for category in self.resources {
            let spec = category.spec();
            prefixes.push(spec.base_path);
            prefixes.push(spec.count_id);
        }
        prefixes
    }
}

/// Immutable registry of domain nodes and definitions.
#[derive(Debug)]
pub struct Catalog {
    pub nodes: &'static [DomainNode],
    pub definitions: &'static [DomainDefinition],
}

impl Catalog {
    /// The catalog shipped with hostmirror.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Depth-first lookup of a node by id.
    pub fn find_node(&self, id: &str) -> Option<&'static DomainNode> {
        fn walk(nodes: &'static [DomainNode], id: &str) -> Option<&'static DomainNode> {
            nodes.iter().find_map(|n| {
                if n.id == id {
                    Some(n)
                } else {
                    walk(n.children, id)
                }
            })
        }
        walk(self.nodes, id)
    }

    pub fn definition(&self, id: &str) -> Option<&'static DomainDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn is_queryable(&self, id: &str) -> bool {
        self.definition(id).is_some()
    }

    /// Every node in depth-first order, paired with its depth.
    pub fn walk(&self) -> Vec<(usize, &'static DomainNode)> {
        fn visit(
            nodes: &'static [DomainNode],
            depth: usize,
            out: &mut Vec<(usize, &'static DomainNode)>,
        ) {
            for node in nodes {
                out.push((depth, node));
                visit(node.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(self.nodes, 0, &mut out);
        out
    }

    /// Ids of nodes flagged `default_selected`.
    pub fn default_selection(&self) -> Vec<&'static str> {
        self.walk()
            .into_iter()
            .filter(|(_, n)| n.default_selected)
            .map(|(_, n)| n.id)
            .collect()
    }

    /// Label of the node with this id, if any.
    pub fn label(&self, id: &str) -> Option<&'static str> {
        self.find_node(id).map(|n| n.label)
    }

    /// Check structural invariants: unique node ids, every definition
    /// backed by a node, no duplicate state ids across definitions.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for (_, node) in self.walk() {
            if !seen.insert(node.id) {
                return Err(CoreError::Catalog {
                    message: format!("duplicate domain node id '{}'", node.id),
                });
            }
        }

        let mut state_ids = HashSet::new();
        for def in self.definitions {
            if !seen.contains(def.id) {
                return Err(CoreError::Catalog {
                    message: format!("definition '{}' has no matching domain node", def.id),
                });
            }
            for mapping in def.states {
                if !state_ids.insert(mapping.id) {
                    return Err(CoreError::Catalog {
                        message: format!("state '{}' mapped twice", mapping.id),
                    });
                }
                if mapping.path.is_empty() {
                    return Err(CoreError::Catalog {
                        message: format!("state '{}' has an empty response path", mapping.id),
                    });
                }
            }
        }
        Ok(())
    }
}
