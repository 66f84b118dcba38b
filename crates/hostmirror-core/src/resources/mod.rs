// ── Dynamic resource categories ──
//
// Variable-cardinality collections discovered at query time. Each category
// is described by a static `CategorySpec`: where its items live in the
// response, how a stable key is derived from an item, and which leaf
// states each instance gets.

mod reconciler;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{StateCommon, ValueKind};
use crate::convert::{self, Transform};
use crate::sync::resolve_path;

pub use reconciler::{DynamicResourceReconciler, ReconcileOutcome};

/// Closed set of dynamic collection kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceCategory {
    PerCore,
    ArrayMember,
    Workload,
    Volume,
    VirtualMachine,
}

impl ResourceCategory {
    pub fn spec(self) -> &'static CategorySpec {
        match self {
            Self::PerCore => &PER_CORE,
            Self::ArrayMember => &ARRAY_MEMBER,
            Self::Workload => &WORKLOAD,
            Self::Volume => &VOLUME,
            Self::VirtualMachine => &VIRTUAL_MACHINE,
        }
    }
}

/// Where one list of items sits in the response.
#[derive(Debug)]
pub struct Collection {
    pub path: &'static [&'static str],
    /// Role label prefixed to keys when a category spans several lists.
    pub role: Option<&'static str>,
}

/// How an item's stable key is derived.
#[derive(Debug, Clone, Copy)]
pub enum KeyStrategy {
    /// Position in the list.
    Position,
    /// An explicit integer field, falling back to position.
    IndexField(&'static str),
    /// A name field, sanitized for use as a path segment.
    Name(&'static str),
}

/// How an instance's display label is derived.
#[derive(Debug, Clone, Copy)]
pub enum LabelRule {
    /// `"{prefix} {key}"`.
    Prefixed(&'static str),
    /// Value of a name-like field, falling back to the key.
    Field(&'static str),
}

/// Where a leaf reads its value from.
#[derive(Debug, Clone, Copy)]
pub enum LeafSource {
    Field(&'static str),
    /// The whole item; used by transforms combining several fields.
    Item,
    /// The instance label.
    Label,
}

#[derive(Debug)]
pub struct LeafSpec {
    pub suffix: &'static str,
    pub source: LeafSource,
    pub common: StateCommon,
    pub transform: Option<Transform>,
}

/// Dispatch entry for one [`ResourceCategory`].
#[derive(Debug)]
pub struct CategorySpec {
    pub category: ResourceCategory,
    /// Domain whose selection enables this category.
    pub domain_id: &'static str,
    /// Container holding one sub-tree per instance.
    pub base_path: &'static str,
    pub base_name: &'static str,
    pub count_id: &'static str,
    pub count_name: &'static str,
    pub collections: &'static [Collection],
    pub key: KeyStrategy,
    pub label: LabelRule,
    pub leaves: &'static [LeafSpec],
}

impl CategorySpec {
    /// Number of path segments a key occupies below `base_path`.
    pub fn key_depth(&self) -> usize {
        if self.collections.iter().any(|c| c.role.is_some()) {
            2
        } else {
            1
        }
    }

    pub fn instance_id(&self, key: &str) -> String {
        format!("{}.{key}", self.base_path)
    }

    pub fn leaf_id(&self, key: &str, suffix: &str) -> String {
        format!("{}.{key}.{suffix}", self.base_path)
    }

    /// Recover the instance key from any id inside an instance sub-tree.
    pub fn key_for_id(&self, id: &str) -> Option<String> {
        let rest = id.strip_prefix(self.base_path)?.strip_prefix('.')?;
        let segments: Vec<&str> = rest.split('.').collect();
        if segments.len() < self.key_depth() {
            return None;
        }
        Some(segments[..self.key_depth()].join("."))
    }
}

/// One collection member observed in the current response.
#[derive(Debug, Clone)]
pub struct ResourceInstance<'a> {
    pub key: String,
    pub label: String,
    pub data: &'a Value,
}

impl ResourceInstance<'_> {
    /// Value for a leaf, transformed; `Null` when missing or invalid.
    pub fn leaf_value(&self, leaf: &LeafSpec) -> Value {
        let label = Value::String(self.label.clone());
        let raw = match leaf.source {
            LeafSource::Field(name) => self.data.get(name).unwrap_or(&Value::Null),
            LeafSource::Item => self.data,
            LeafSource::Label => &label,
        };
        match leaf.transform {
            Some(transform) => transform(raw).unwrap_or(Value::Null),
            None => raw.clone(),
        }
    }
}

/// Replace every character other than ASCII alphanumerics, `-` and `_`.
pub fn sanitize_key(raw: &str) -> String {
    let key: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() { "_".into() } else { key }
}

struct Candidate<'a> {
    role: Option<&'static str>,
    base_key: String,
    raw: String,
    label: Option<String>,
    data: &'a Value,
}

/// Extract every instance of a category from the response.
///
/// Keys depend on item content (or list position for positional
/// categories), never on the order of items. When sanitizing makes two
/// names collide, suffixes `_2`, `_3`, … are handed out in order of the
/// raw names across the colliding siblings. A suffixed key therefore moves
/// when a sibling it collided with disappears, and that instance is
/// re-created under its new key.
pub fn extract_instances<'a>(
    spec: &CategorySpec,
    data: &'a Map<String, Value>,
) -> Vec<ResourceInstance<'a>> {
    let mut candidates = Vec::new();
    for collection in spec.collections {
        let Some(items) = resolve_path(data, collection.path).and_then(Value::as_array) else {
            continue;
        };
        for (pos, item) in items.iter().enumerate() {
            let raw = match spec.key {
                KeyStrategy::Position => pos.to_string(),
                KeyStrategy::IndexField(field) => item
                    .get(field)
                    .and_then(convert::to_f64_lossy)
                    .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                    .map_or_else(|| pos.to_string(), |n| format!("{n:.0}")),
                KeyStrategy::Name(field) => item
                    .get(field)
                    .and_then(convert::first_name)
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_else(|| format!("item{pos}")),
            };
            let label = match spec.label {
                LabelRule::Field(field) => item
                    .get(field)
                    .and_then(convert::first_name)
                    .and_then(|v| v.as_str().map(str::to_owned)),
                LabelRule::Prefixed(prefix) => Some(format!("{prefix} {raw}")),
            };
            candidates.push(Candidate {
                role: collection.role,
                base_key: sanitize_key(&raw),
                raw,
                label,
                data: item,
            });
        }
    }

    candidates.sort_by(|a, b| {
        (a.role, &a.base_key, &a.raw).cmp(&(b.role, &b.base_key, &b.raw))
    });

    let mut used = BTreeSet::new();
    let mut instances = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut key = candidate.base_key.clone();
        let mut suffix = 2;
        while used.contains(&(candidate.role, key.clone())) {
            key = format!("{}_{suffix}", candidate.base_key);
            suffix += 1;
        }
        used.insert((candidate.role, key.clone()));

        let full_key = match candidate.role {
            Some(role) => format!("{role}.{key}"),
            None => key,
        };
        instances.push(ResourceInstance {
            label: candidate.label.unwrap_or_else(|| full_key.clone()),
            key: full_key,
            data: candidate.data,
        });
    }
    instances
}

// ── Dispatch table ─────────────────────────────────────────────────

const fn percent(name: &'static str) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::Number,
        role: "value",
        unit: Some("%"),
    }
}

const fn gigabytes(name: &'static str) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::Number,
        role: "value",
        unit: Some("GB"),
    }
}

const fn text(name: &'static str) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::String,
        role: "text",
        unit: None,
    }
}

const fn indicator(name: &'static str) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::Boolean,
        role: "indicator",
        unit: None,
    }
}

static PER_CORE: CategorySpec = CategorySpec {
    category: ResourceCategory::PerCore,
    domain_id: "metrics.cpu",
    base_path: "metrics.cpu.cores",
    base_name: "CPU cores",
    count_id: "metrics.cpu.coreCount",
    count_name: "CPU core count",
    collections: &[Collection {
        path: &["metrics", "cpu", "cpus"],
        role: None,
    }],
    key: KeyStrategy::Position,
    label: LabelRule::Prefixed("Core"),
    leaves: &[
        LeafSpec {
            suffix: "percentTotal",
            source: LeafSource::Field("percentTotal"),
            common: percent("Load"),
            transform: Some(convert::round2_value),
        },
        LeafSpec {
            suffix: "percentUser",
            source: LeafSource::Field("percentUser"),
            common: percent("User load"),
            transform: Some(convert::round2_value),
        },
        LeafSpec {
            suffix: "percentSystem",
            source: LeafSource::Field("percentSystem"),
            common: percent("System load"),
            transform: Some(convert::round2_value),
        },
    ],
};

static ARRAY_MEMBER: CategorySpec = CategorySpec {
    category: ResourceCategory::ArrayMember,
    domain_id: "array.disks",
    base_path: "array.members",
    base_name: "Array members",
    count_id: "array.memberCount",
    count_name: "Array member count",
    collections: &[
        Collection {
            path: &["array", "parities"],
            role: Some("parity"),
        },
        Collection {
            path: &["array", "disks"],
            role: Some("data"),
        },
        Collection {
            path: &["array", "caches"],
            role: Some("cache"),
        },
    ],
    key: KeyStrategy::IndexField("idx"),
    label: LabelRule::Field("name"),
    leaves: &[
        LeafSpec {
            suffix: "name",
            source: LeafSource::Label,
            common: text("Name"),
            transform: None,
        },
        LeafSpec {
            suffix: "device",
            source: LeafSource::Field("device"),
            common: text("Device"),
            transform: None,
        },
        LeafSpec {
            suffix: "status",
            source: LeafSource::Field("status"),
            common: text("Status"),
            transform: None,
        },
        LeafSpec {
            suffix: "temp",
            source: LeafSource::Field("temp"),
            common: StateCommon {
                name: "Temperature",
                kind: ValueKind::Number,
                role: "value.temperature",
                unit: Some("°C"),
            },
            transform: Some(convert::round2_value),
        },
        LeafSpec {
            suffix: "sizeGb",
            source: LeafSource::Field("size"),
            common: gigabytes("Size"),
            transform: Some(convert::kilobytes_to_gb_value),
        },
        LeafSpec {
            suffix: "fsFreeGb",
            source: LeafSource::Field("fsFree"),
            common: gigabytes("Filesystem free"),
            transform: Some(convert::kilobytes_to_gb_value),
        },
        LeafSpec {
            suffix: "fsUsedGb",
            source: LeafSource::Field("fsUsed"),
            common: gigabytes("Filesystem used"),
            transform: Some(convert::kilobytes_to_gb_value),
        },
        LeafSpec {
            suffix: "fsUsedPercent",
            source: LeafSource::Item,
            common: percent("Filesystem used"),
            transform: Some(convert::fs_used_percent),
        },
    ],
};

static WORKLOAD: CategorySpec = CategorySpec {
    category: ResourceCategory::Workload,
    domain_id: "docker.containers",
    base_path: "docker.containers",
    base_name: "Containers",
    count_id: "docker.containerCount",
    count_name: "Container count",
    collections: &[Collection {
        path: &["docker", "containers"],
        role: None,
    }],
    key: KeyStrategy::Name("names"),
    label: LabelRule::Field("names"),
    leaves: &[
        LeafSpec {
            suffix: "name",
            source: LeafSource::Label,
            common: text("Name"),
            transform: None,
        },
        LeafSpec {
            suffix: "image",
            source: LeafSource::Field("image"),
            common: text("Image"),
            transform: None,
        },
        LeafSpec {
            suffix: "state",
            source: LeafSource::Field("state"),
            common: text("State"),
            transform: None,
        },
        LeafSpec {
            suffix: "status",
            source: LeafSource::Field("status"),
            common: text("Status"),
            transform: None,
        },
        LeafSpec {
            suffix: "autoStart",
            source: LeafSource::Field("autoStart"),
            common: indicator("Auto start"),
            transform: None,
        },
        LeafSpec {
            suffix: "running",
            source: LeafSource::Field("state"),
            common: indicator("Running"),
            transform: Some(convert::is_running),
        },
    ],
};

static VOLUME: CategorySpec = CategorySpec {
    category: ResourceCategory::Volume,
    domain_id: "shares",
    base_path: "shares.list",
    base_name: "Shares",
    count_id: "shares.count",
    count_name: "Share count",
    collections: &[Collection {
        path: &["shares"],
        role: None,
    }],
    key: KeyStrategy::Name("name"),
    label: LabelRule::Field("name"),
    leaves: &[
        LeafSpec {
            suffix: "name",
            source: LeafSource::Label,
            common: text("Name"),
            transform: None,
        },
        LeafSpec {
            suffix: "comment",
            source: LeafSource::Field("comment"),
            common: text("Comment"),
            transform: None,
        },
        LeafSpec {
            suffix: "freeGb",
            source: LeafSource::Field("free"),
            common: gigabytes("Free"),
            transform: Some(convert::kilobytes_to_gb_value),
        },
        LeafSpec {
            suffix: "usedGb",
            source: LeafSource::Field("used"),
            common: gigabytes("Used"),
            transform: Some(convert::kilobytes_to_gb_value),
        },
        LeafSpec {
            suffix: "usedPercent",
            source: LeafSource::Item,
            common: percent("Used"),
            transform: Some(convert::share_used_percent),
        },
    ],
};

static VIRTUAL_MACHINE: CategorySpec = CategorySpec {
    category: ResourceCategory::VirtualMachine,
    domain_id: "vms",
    base_path: "vms.list",
    base_name: "Virtual machines",
    count_id: "vms.count",
    count_name: "Virtual machine count",
    collections: &[Collection {
        path: &["vms", "domain"],
        role: None,
    }],
    key: KeyStrategy::Name("name"),
    label: LabelRule::Field("name"),
    leaves: &[
        LeafSpec {
            suffix: "name",
            source: LeafSource::Label,
            common: text("Name"),
            transform: None,
        },
        LeafSpec {
            suffix: "uuid",
            source: LeafSource::Field("uuid"),
            common: text("UUID"),
            transform: None,
        },
        LeafSpec {
            suffix: "state",
            source: LeafSource::Field("state"),
            common: text("State"),
            transform: None,
        },
        LeafSpec {
            suffix: "running",
            source: LeafSource::Field("state"),
            common: indicator("Running"),
            transform: Some(convert::is_running),
        },
    ],
};
