// ── Query plan builder ──
//
// Merges the field selections of every selected domain into one tree per
// root field and renders it as a single query document. Output is fully
// deterministic: names are ordered lexicographically at every level.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::catalog::{DomainDefinition, FieldSpec};

const ROOT_INDENT: usize = 8;
const INDENT_STEP: usize = 4;

/// A merged field selection. Leaves have no children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree {
    pub children: BTreeMap<String, FieldTree>,
}

impl FieldTree {
    /// Merge declared fields into this tree, reusing nodes whose names repeat.
    pub fn merge(&mut self, fields: &[FieldSpec]) {
        for field in fields {
            self.children
                .entry(field.name.to_owned())
                .or_default()
                .merge(field.children);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn render(&self, name: &str, depth: usize, out: &mut String) {
        let pad = " ".repeat(ROOT_INDENT + depth * INDENT_STEP);
        if self.is_leaf() {
            let _ = writeln!(out, "{pad}{name}");
            return;
        }
        let _ = writeln!(out, "{pad}{name} {{");
        for (child_name, child) in &self.children {
            child.render(child_name, depth + 1, out);
        }
        let _ = writeln!(out, "{pad}}}");
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, child) in &self.children {
            let path = format!("{prefix}.{name}");
            out.push(path.clone());
            child.collect_paths(&path, out);
        }
    }
}

/// The merged query for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    roots: BTreeMap<String, FieldTree>,
    text: String,
}

impl QueryPlan {
    /// Rendered query document.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn root(&self, name: &str) -> Option<&FieldTree> {
        self.roots.get(name)
    }

    /// Every selected field as a dotted path starting at its root.
    pub fn field_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, tree) in &self.roots {
            out.push(name.clone());
            tree.collect_paths(name, &mut out);
        }
        out
    }
}

/// Build the merged plan, or `None` when nothing is selected.
pub fn build_query_plan(definitions: &[&DomainDefinition]) -> Option<QueryPlan> {
    let mut roots: BTreeMap<String, FieldTree> = BTreeMap::new();
    for definition in definitions {
        for selection in definition.selection {
            roots
                .entry(selection.root.to_owned())
                .or_default()
                .merge(selection.fields);
        }
    }
    if roots.is_empty() {
        return None;
    }

    let mut text = String::from("query {\n");
    for (name, tree) in &roots {
        tree.render(name, 0, &mut text);
    }
    text.push('}');

    Some(QueryPlan { roots, text })
}
