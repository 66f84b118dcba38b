// ── State store abstraction ──
//
// The persisted object tree the engine mirrors into. Ids are dot-separated
// paths; containers group children, leaves hold values. The engine only
// talks to the `StateStore` trait so hosts can plug in their own backend.

mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::catalog::{StateCommon, ValueKind};

pub use memory::MemoryStore;

/// Failures reported by a [`StateStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {id}")]
    NotFound { id: String },

    #[error("Parent of '{id}' does not exist")]
    MissingParent { id: String },

    #[error("'{id}' is a container and cannot hold a value")]
    NotALeaf { id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store backend error: {message}")]
    Backend { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ObjectKind {
    Container,
    Leaf,
}

/// Display metadata attached to a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCommon {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ObjectCommon {
    /// Metadata for a container named `name`.
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_kind: None,
            role: String::new(),
            unit: None,
        }
    }
}

impl From<&StateCommon> for ObjectCommon {
    fn from(common: &StateCommon) -> Self {
        Self {
            name: common.name.to_owned(),
            value_kind: Some(common.kind),
            role: common.role.to_owned(),
            unit: common.unit.map(str::to_owned),
        }
    }
}

/// What an object should look like when created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub kind: ObjectKind,
    pub common: ObjectCommon,
}

impl ObjectSpec {
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Container,
            common: ObjectCommon::container(name),
        }
    }

    pub fn leaf(common: &StateCommon) -> Self {
        Self {
            kind: ObjectKind::Leaf,
            common: common.into(),
        }
    }
}

/// An object as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub kind: ObjectKind,
    pub common: ObjectCommon,
    #[serde(default)]
    pub value: Value,
}

/// Parent id of a dotted path, `None` for top-level ids.
pub fn parent_id(id: &str) -> Option<&str> {
    id.rsplit_once('.').map(|(parent, _)| parent)
}

/// True when `id` equals `prefix` or lies below it on a segment boundary.
pub fn is_within(id: &str, prefix: &str) -> bool {
    id == prefix
        || id
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Persisted object tree the engine writes into.
///
/// Ids are relative to the store's namespace. Implementations must reject
/// objects whose parent does not exist.
pub trait StateStore: Send + Sync {
    /// Create the object if absent. Returns `true` when it was created.
    /// An existing object is left untouched.
    fn ensure_object(
        &self,
        id: &str,
        spec: &ObjectSpec,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Replace the metadata of an existing object.
    fn update_common(
        &self,
        id: &str,
        common: &ObjectCommon,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write a leaf's value.
    fn set_value(&self, id: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every object currently stored.
    fn list_objects(&self) -> impl Future<Output = Result<Vec<StoredObject>, StoreError>> + Send;

    /// Delete an object and everything below it. Returns how many objects
    /// were removed; deleting a missing id removes nothing.
    fn delete_recursive(&self, id: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;
}
