//! Domain selection and state-tree synchronization between
//! `hostmirror-api` and a persisted object store.
//!
//! This crate owns the engine that mirrors a remote GraphQL server into a
//! hierarchical state tree:
//!
//! - **[`Catalog`]**: static registry of selectable domains and what each
//!   one fetches and populates.
//!
//! - **[`expand_selection`]** turns raw user-chosen ids into an
//!   [`EffectiveSelection`]; **[`build_query_plan`]** merges the selected
//!   domains into one deterministic [`QueryPlan`].
//!
//! - **[`SyncEngine`]**: per-session state. Maps fixed fields through the
//!   [`StateSynchronizer`] and variable-cardinality collections through
//!   the [`DynamicResourceReconciler`], with object lifecycle owned by the
//!   [`ObjectTreeManager`].
//!
//! - **[`Poller`]**: fetch → process → sleep loop with cooperative
//!   shutdown via [`PollerHandle`].
//!
//! - **[`StateStore`]**: the persistence seam. [`MemoryStore`] is the
//!   in-process implementation with JSON snapshot support.

pub mod catalog;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod poller;
pub mod query;
pub mod resources;
pub mod selection;
pub mod store;
pub mod sync;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::{Catalog, DomainDefinition, DomainNode, StateCommon, ValueKind};
pub use config::{MIN_POLL_INTERVAL_SECS, PollerConfig, TlsVerification};
pub use engine::{CycleReport, SyncEngine};
pub use error::CoreError;
pub use poller::{Poller, PollerHandle, ReportReceiver};
pub use query::{FieldTree, QueryPlan, build_query_plan};
pub use resources::{CategorySpec, DynamicResourceReconciler, ReconcileOutcome, ResourceCategory};
pub use selection::{EffectiveSelection, expand_selection};
pub use store::{MemoryStore, ObjectKind, StateStore, StoreError, StoredObject};
pub use sync::{StateSynchronizer, SyncOutcome};
pub use tree::{ObjectTreeManager, TrackedObject};
