// Builtin domain catalog.
//
// Node ids double as state-tree prefixes: a domain's states live under its
// category path, dynamic collections under the base paths declared in
// `resources::CategorySpec`.

use super::{
    Catalog, DomainDefinition, DomainNode, FieldSpec, RootSelection, StateCommon, StateMapping,
    ValueKind,
};
use crate::convert;
use crate::resources::ResourceCategory;

pub static BUILTIN: Catalog = Catalog {
    nodes: NODES,
    definitions: DEFINITIONS,
};

const NODES: &[DomainNode] = &[
    DomainNode {
        id: "system",
        label: "System",
        default_selected: false,
        children: &[
            DomainNode {
                id: "system.info",
                label: "Operating system and CPU",
                children: &[],
                default_selected: true,
            },
            DomainNode {
                id: "system.versions",
                label: "Software versions",
                children: &[],
                default_selected: false,
            },
            DomainNode {
                id: "system.online",
                label: "Online status",
                children: &[],
                default_selected: true,
            },
        ],
    },
    DomainNode {
        id: "metrics",
        label: "Metrics",
        default_selected: false,
        children: &[
            DomainNode {
                id: "metrics.cpu",
                label: "CPU load (total and per core)",
                children: &[],
                default_selected: true,
            },
            DomainNode {
                id: "metrics.memory",
                label: "Memory usage",
                children: &[],
                default_selected: true,
            },
        ],
    },
    DomainNode {
        id: "array",
        label: "Array",
        default_selected: false,
        children: &[
            DomainNode {
                id: "array.status",
                label: "Array state and capacity",
                children: &[],
                default_selected: true,
            },
            DomainNode {
                id: "array.disks",
                label: "Array members (data, parity, cache)",
                children: &[],
                default_selected: false,
            },
        ],
    },
    DomainNode {
        id: "docker",
        label: "Docker",
        default_selected: false,
        children: &[DomainNode {
            id: "docker.containers",
            label: "Containers",
            children: &[],
            default_selected: false,
        }],
    },
    DomainNode {
        id: "shares",
        label: "Shares",
        children: &[],
        default_selected: false,
    },
    DomainNode {
        id: "vms",
        label: "Virtual machines",
        children: &[],
        default_selected: false,
    },
];

// ── Common metadata shorthands ─────────────────────────────────────

const fn text(name: &'static str) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::String,
        role: "text",
        unit: None,
    }
}

const fn value(name: &'static str, unit: Option<&'static str>) -> StateCommon {
    StateCommon {
        name,
        kind: ValueKind::Number,
        role: "value",
        unit,
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

const GB: Option<&str> = Some("GB");
const PERCENT: Option<&str> = Some("%");

// ── Definitions ────────────────────────────────────────────────────

const DISK_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "idx", children: &[] },
    FieldSpec { name: "name", children: &[] },
    FieldSpec { name: "device", children: &[] },
    FieldSpec { name: "size", children: &[] },
    FieldSpec { name: "status", children: &[] },
    FieldSpec { name: "temp", children: &[] },
    FieldSpec { name: "fsSize", children: &[] },
    FieldSpec { name: "fsFree", children: &[] },
    FieldSpec { name: "fsUsed", children: &[] },
];

const DEFINITIONS: &[DomainDefinition] = &[
    DomainDefinition {
        id: "system.info",
        selection: &[RootSelection {
            root: "info",
            fields: &[
                FieldSpec {
                    name: "os",
                    children: &[
                        FieldSpec { name: "platform", children: &[] },
                        FieldSpec { name: "distro", children: &[] },
                        FieldSpec { name: "release", children: &[] },
                        FieldSpec { name: "uptime", children: &[] },
                        FieldSpec { name: "hostname", children: &[] },
                    ],
                },
                FieldSpec {
                    name: "cpu",
                    children: &[
                        FieldSpec { name: "manufacturer", children: &[] },
                        FieldSpec { name: "brand", children: &[] },
                        FieldSpec { name: "cores", children: &[] },
                        FieldSpec { name: "threads", children: &[] },
                    ],
                },
            ],
        }],
        states: &[
            StateMapping {
                id: "system.info.hostname",
                path: &["info", "os", "hostname"],
                common: text("Hostname"),
                transform: None,
            },
            StateMapping {
                id: "system.info.platform",
                path: &["info", "os", "platform"],
                common: text("Platform"),
                transform: None,
            },
            StateMapping {
                id: "system.info.distro",
                path: &["info", "os", "distro"],
                common: text("Distribution"),
                transform: None,
            },
            StateMapping {
                id: "system.info.release",
                path: &["info", "os", "release"],
                common: text("Release"),
                transform: Some(convert::as_text),
            },
            StateMapping {
                id: "system.info.uptime",
                path: &["info", "os", "uptime"],
                common: text("Up since"),
                transform: None,
            },
            StateMapping {
                id: "system.info.cpu.brand",
                path: &["info", "cpu", "brand"],
                common: text("CPU model"),
                transform: None,
            },
            StateMapping {
                id: "system.info.cpu.manufacturer",
                path: &["info", "cpu", "manufacturer"],
                common: text("CPU manufacturer"),
                transform: None,
            },
            StateMapping {
                id: "system.info.cpu.cores",
                path: &["info", "cpu", "cores"],
                common: value("Physical cores", None),
                transform: None,
            },
            StateMapping {
                id: "system.info.cpu.threads",
                path: &["info", "cpu", "threads"],
                common: value("Threads", None),
                transform: None,
            },
        ],
        resources: &[],
    },
    DomainDefinition {
        id: "system.versions",
        selection: &[RootSelection {
            root: "info",
            fields: &[FieldSpec {
                name: "versions",
                children: &[FieldSpec {
                    name: "core",
                    children: &[
                        FieldSpec { name: "unraid", children: &[] },
                        FieldSpec { name: "kernel", children: &[] },
                        FieldSpec { name: "api", children: &[] },
                    ],
                }],
            }],
        }],
        states: &[
            StateMapping {
                id: "system.versions.os",
                path: &["info", "versions", "core", "unraid"],
                common: text("OS version"),
                transform: Some(convert::as_text),
            },
            StateMapping {
                id: "system.versions.kernel",
                path: &["info", "versions", "core", "kernel"],
                common: text("Kernel version"),
                transform: Some(convert::as_text),
            },
            StateMapping {
                id: "system.versions.api",
                path: &["info", "versions", "core", "api"],
                common: text("API version"),
                transform: Some(convert::as_text),
            },
        ],
        resources: &[],
    },
    DomainDefinition {
        id: "system.online",
        selection: &[RootSelection {
            root: "online",
            fields: &[],
        }],
        states: &[StateMapping {
            id: "system.online",
            path: &["online"],
            common: indicator("Server online"),
            transform: None,
        }],
        resources: &[],
    },
    DomainDefinition {
        id: "metrics.cpu",
        selection: &[RootSelection {
            root: "metrics",
            fields: &[FieldSpec {
                name: "cpu",
                children: &[
                    FieldSpec { name: "percentTotal", children: &[] },
                    FieldSpec {
                        name: "cpus",
                        children: &[
                            FieldSpec { name: "percentTotal", children: &[] },
                            FieldSpec { name: "percentUser", children: &[] },
                            FieldSpec { name: "percentSystem", children: &[] },
                        ],
                    },
                ],
            }],
        }],
        states: &[StateMapping {
            id: "metrics.cpu.percentTotal",
            path: &["metrics", "cpu", "percentTotal"],
            common: value("CPU load", PERCENT),
            transform: Some(convert::round2_value),
        }],
        resources: &[ResourceCategory::PerCore],
    },
    DomainDefinition {
        id: "metrics.memory",
        selection: &[RootSelection {
            root: "metrics",
            fields: &[FieldSpec {
                name: "memory",
                children: &[
                    FieldSpec { name: "total", children: &[] },
                    FieldSpec { name: "used", children: &[] },
                    FieldSpec { name: "free", children: &[] },
                    FieldSpec { name: "available", children: &[] },
                    FieldSpec { name: "percentTotal", children: &[] },
                ],
            }],
        }],
        states: &[
            StateMapping {
                id: "metrics.memory.totalGb",
                path: &["metrics", "memory", "total"],
                common: value("Memory total", GB),
                transform: Some(convert::bytes_to_gb_value),
            },
            StateMapping {
                id: "metrics.memory.usedGb",
                path: &["metrics", "memory", "used"],
                common: value("Memory used", GB),
                transform: Some(convert::bytes_to_gb_value),
            },
            StateMapping {
                id: "metrics.memory.freeGb",
                path: &["metrics", "memory", "free"],
                common: value("Memory free", GB),
                transform: Some(convert::bytes_to_gb_value),
            },
            StateMapping {
                id: "metrics.memory.availableGb",
                path: &["metrics", "memory", "available"],
                common: value("Memory available", GB),
                transform: Some(convert::bytes_to_gb_value),
            },
            StateMapping {
                id: "metrics.memory.percentTotal",
                path: &["metrics", "memory", "percentTotal"],
                common: value("Memory load", PERCENT),
                transform: Some(convert::round2_value),
            },
        ],
        resources: &[],
    },
    DomainDefinition {
        id: "array.status",
        selection: &[RootSelection {
            root: "array",
            fields: &[
                FieldSpec { name: "state", children: &[] },
                FieldSpec {
                    name: "capacity",
                    children: &[FieldSpec {
                        name: "kilobytes",
                        children: &[
                            FieldSpec { name: "free", children: &[] },
                            FieldSpec { name: "used", children: &[] },
                            FieldSpec { name: "total", children: &[] },
                        ],
                    }],
                },
            ],
        }],
        states: &[
            StateMapping {
                id: "array.state",
                path: &["array", "state"],
                common: text("Array state"),
                transform: None,
            },
            StateMapping {
                id: "array.capacity.totalGb",
                path: &["array", "capacity", "kilobytes", "total"],
                common: value("Capacity total", GB),
                transform: Some(convert::kilobytes_to_gb_value),
            },
            StateMapping {
                id: "array.capacity.usedGb",
                path: &["array", "capacity", "kilobytes", "used"],
                common: value("Capacity used", GB),
                transform: Some(convert::kilobytes_to_gb_value),
            },
            StateMapping {
                id: "array.capacity.freeGb",
                path: &["array", "capacity", "kilobytes", "free"],
                common: value("Capacity free", GB),
                transform: Some(convert::kilobytes_to_gb_value),
            },
            StateMapping {
                id: "array.capacity.usedPercent",
                path: &["array", "capacity", "kilobytes"],
                common: value("Capacity used", PERCENT),
                transform: Some(convert::used_total_percent),
            },
        ],
        resources: &[],
    },
    DomainDefinition {
        id: "array.disks",
        selection: &[RootSelection {
            root: "array",
            fields: &[
                FieldSpec { name: "disks", children: DISK_FIELDS },
                FieldSpec { name: "parities", children: DISK_FIELDS },
                FieldSpec { name: "caches", children: DISK_FIELDS },
            ],
        }],
        states: &[],
        resources: &[ResourceCategory::ArrayMember],
    },
    DomainDefinition {
        id: "docker.containers",
        selection: &[RootSelection {
            root: "docker",
            fields: &[FieldSpec {
                name: "containers",
                children: &[
                    FieldSpec { name: "id", children: &[] },
                    FieldSpec { name: "names", children: &[] },
                    FieldSpec { name: "image", children: &[] },
                    FieldSpec { name: "state", children: &[] },
                    FieldSpec { name: "status", children: &[] },
                    FieldSpec { name: "autoStart", children: &[] },
                ],
            }],
        }],
        states: &[],
        resources: &[ResourceCategory::Workload],
    },
    DomainDefinition {
        id: "shares",
        selection: &[RootSelection {
            root: "shares",
            fields: &[
                FieldSpec { name: "name", children: &[] },
                FieldSpec { name: "comment", children: &[] },
                FieldSpec { name: "free", children: &[] },
                FieldSpec { name: "used", children: &[] },
                FieldSpec { name: "size", children: &[] },
            ],
        }],
        states: &[],
        resources: &[ResourceCategory::Volume],
    },
    DomainDefinition {
        id: "vms",
        selection: &[RootSelection {
            root: "vms",
            fields: &[FieldSpec {
                name: "domain",
                children: &[
                    FieldSpec { name: "uuid", children: &[] },
                    FieldSpec { name: "name", children: &[] },
                    FieldSpec { name: "state", children: &[] },
                ],
            }],
        }],
        states: &[],
        resources: &[ResourceCategory::VirtualMachine],
    },
];
