#![allow(clippy::unwrap_used)]
// End-to-end tests for `SyncEngine` against an in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};

use hostmirror_core::{
    Catalog, CoreError, DomainDefinition, DomainNode, MemoryStore, ObjectKind, ResourceCategory,
    StateStore, SyncEngine,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn engine() -> SyncEngine<MemoryStore> {
    SyncEngine::new(Catalog::builtin(), Arc::new(MemoryStore::new("hostmirror.0")))
}

fn response(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn workloads(names: &[&str]) -> Map<String, Value> {
    let containers: Vec<Value> = names
        .iter()
        .map(|n| {
            json!({
                "id": format!("id-{n}"),
                "names": [format!("/{n}")],
                "image": format!("{n}:latest"),
                "state": "RUNNING",
                "status": "Up 2 hours",
                "autoStart": true
            })
        })
        .collect();
    response(json!({ "docker": { "containers": containers } }))
}

fn ids_under(store: &MemoryStore, prefix: &str) -> BTreeSet<String> {
    store
        .snapshot()
        .into_iter()
        .map(|o| o.id)
        .filter(|id| id.starts_with(prefix))
        .collect()
}

// ── Selection and planning ──────────────────────────────────────────

#[tokio::test]
async fn test_array_selection_plans_status_and_members() {
    let mut engine = engine();
    engine.configure(&["array"]).await.unwrap();

    let selected: Vec<&str> = engine.selection().iter().collect();
    assert_eq!(selected, ["array.disks", "array.status"]);

    let plan = engine.plan().unwrap();
    assert_eq!(plan.roots().collect::<Vec<_>>(), ["array"]);
    assert!(plan.text().starts_with("query {\n        array {\n"));
    assert!(plan.text().ends_with("\n}"));
}

#[tokio::test]
async fn test_configure_creates_full_layout_before_data() {
    let mut engine = engine();
    engine.configure(&["system.info"]).await.unwrap();
    let store = engine.store();

    assert_eq!(store.value("system.info.hostname"), Some(Value::Null));
    assert_eq!(store.get("system.info.cpu").unwrap().kind, ObjectKind::Container);
    assert!(store.contains("info.connection"));
    assert!(store.contains("info.lastPoll"));
}

// ── Fixed states ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cycle_writes_fixed_states_and_skips_absent_roots() {
    let mut engine = engine();
    engine.configure(&["system.online", "metrics.memory"]).await.unwrap();

    let report = engine
        .process_cycle(&response(json!({
            "online": true,
            "metrics": { "memory": {
                "total": 17_179_869_184_u64,
                "used": "4294967296",
                "free": 0,
                "available": null,
                "percentTotal": 25.0
            }}
        })))
        .await;
    assert_eq!(report.applied, ["metrics.memory", "system.online"]);
    let store = engine.store();
    assert_eq!(store.value("system.online"), Some(json!(true)));
    assert_eq!(store.value("metrics.memory.totalGb"), Some(json!(16.0)));
    assert_eq!(store.value("metrics.memory.usedGb"), Some(json!(4.0)));
    assert_eq!(store.value("metrics.memory.availableGb"), Some(Value::Null));

    let report = engine.process_cycle(&response(json!({ "online": false }))).await;
    assert_eq!(report.skipped, ["metrics.memory"]);
    assert_eq!(engine.store().value("metrics.memory.totalGb"), Some(json!(16.0)));
    assert_eq!(engine.store().value("system.online"), Some(json!(false)));
}

// ── Dynamic resources ───────────────────────────────────────────────

#[tokio::test]
async fn test_workload_membership_change() {
    let mut engine = engine();
    engine.configure(&["docker"]).await.unwrap();

    engine.process_cycle(&workloads(&["web", "db"])).await;
    assert!(engine.store().contains("docker.containers.web"));
    assert!(engine.store().contains("docker.containers.db"));

    let report = engine.process_cycle(&workloads(&["web", "cache"])).await;
    let outcome = &report.resources[&ResourceCategory::Workload];
    assert!(outcome.structural_change);
    assert_eq!(outcome.removed, ["db"]);

    let store = engine.store();
    assert!(!store.contains("docker.containers.db"));
    assert!(ids_under(store, "docker.containers.db").is_empty());
    assert_eq!(store.value("docker.containers.cache.image"), Some(json!("cache:latest")));
    assert_eq!(store.value("docker.containers.web.running"), Some(json!(true)));
    assert_eq!(store.value("docker.containerCount"), Some(json!(2)));
}

#[tokio::test]
async fn test_tracking_converges_to_last_key_set() {
    let mut engine = engine();
    engine.configure(&["docker.containers"]).await.unwrap();

    for names in [&["a", "b", "c"][..], &["c", "d"], &["b"], &["d", "b", "e"]] {
        engine.process_cycle(&workloads(names)).await;
    }

    let expected: BTreeSet<String> = ["b", "d", "e"].iter().map(|s| (*s).to_owned()).collect();
    assert_eq!(engine.reconciler().tracked(ResourceCategory::Workload), expected);
    assert_eq!(engine.tree().tracked_keys(ResourceCategory::Workload), expected);
}

#[tokio::test]
async fn test_reappearing_key_gets_fresh_subtree() {
    let mut engine = engine();
    engine.configure(&["vms"]).await.unwrap();
    let vm = |name: &str, state: &str| json!({ "uuid": format!("u-{name}"), "name": name, "state": state });

    engine
        .process_cycle(&response(json!({ "vms": { "domain": [vm("win", "RUNNING")] } })))
        .await;
    engine
        .process_cycle(&response(json!({ "vms": { "domain": [] } })))
        .await;
    assert!(!engine.store().contains("vms.list.win"));

    let report = engine
        .process_cycle(&response(json!({ "vms": { "domain": [vm("win", "SHUTOFF")] } })))
        .await;
    assert!(report.resources[&ResourceCategory::VirtualMachine].created > 0);
    assert_eq!(engine.store().value("vms.list.win.running"), Some(json!(false)));
}

#[tokio::test]
async fn test_array_members_keyed_by_role_and_index() {
    let mut engine = engine();
    engine.configure(&["array.disks"]).await.unwrap();

    engine
        .process_cycle(&response(json!({ "array": {
            "parities": [{ "idx": 0, "name": "parity", "temp": 31 }],
            "disks": [
                { "idx": 1, "name": "disk1", "fsSize": 1000, "fsUsed": 250, "fsFree": 750 },
                { "idx": 2, "name": "disk2", "fsSize": 0, "fsUsed": 0 }
            ],
            "caches": []
        }})))
        .await;

    let store = engine.store();
    assert_eq!(store.value("array.memberCount"), Some(json!(3)));
    assert_eq!(store.value("array.members.parity.0.temp"), Some(json!(31.0)));
    assert_eq!(store.value("array.members.data.1.fsUsedPercent"), Some(json!(25.0)));
    assert_eq!(store.value("array.members.data.2.fsUsedPercent"), Some(Value::Null));
    assert_eq!(store.get("array.members.data.1").unwrap().common.name, "disk1");
}

#[tokio::test]
async fn test_per_core_positions() {
    let mut engine = engine();
    engine.configure(&["metrics.cpu"]).await.unwrap();

    engine
        .process_cycle(&response(json!({ "metrics": { "cpu": {
            "percentTotal": 12.346,
            "cpus": [{ "percentTotal": 10.0 }, { "percentTotal": 14.691 }]
        }}})))
        .await;

    let store = engine.store();
    assert_eq!(store.value("metrics.cpu.percentTotal"), Some(json!(12.35)));
    assert_eq!(store.value("metrics.cpu.coreCount"), Some(json!(2)));
    assert_eq!(store.value("metrics.cpu.cores.1.percentTotal"), Some(json!(14.69)));
    assert_eq!(store.get("metrics.cpu.cores.0").unwrap().common.name, "Core 0");
}

// ── Reconfiguration ─────────────────────────────────────────────────

#[tokio::test]
async fn test_deselection_cleans_up_and_reselection_recreates() {
    let mut engine = engine();
    engine.configure(&["docker", "shares"]).await.unwrap();
    engine
        .process_cycle(&response(json!({
            "docker": { "containers": [{ "names": ["/web"], "state": "running" }] },
            "shares": [{ "name": "media", "free": 10, "used": 30 }]
        })))
        .await;
    assert!(engine.store().contains("shares.list.media"));

    engine.configure(&["docker"]).await.unwrap();
    let store = engine.store();
    assert!(ids_under(store, "shares").is_empty());
    assert!(store.contains("docker.containers.web"));
    assert!(!engine.reconciler().is_detected(ResourceCategory::Volume));

    engine.configure(&["docker", "shares"]).await.unwrap();
    let report = engine
        .process_cycle(&response(json!({
            "docker": { "containers": [{ "names": ["/web"], "state": "running" }] },
            "shares": [{ "name": "media", "free": 10, "used": 30 }]
        })))
        .await;
    assert!(report.resources[&ResourceCategory::Volume].structural_change);
    assert_eq!(engine.store().value("shares.list.media.usedPercent"), Some(json!(75.0)));
}

#[tokio::test]
async fn test_restart_resumes_from_persisted_tree() {
    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    {
        let mut engine = SyncEngine::new(Catalog::builtin(), Arc::clone(&store));
        engine.configure(&["docker", "vms"]).await.unwrap();
        engine.process_cycle(&workloads(&["web", "db"])).await;
    }

    let mut engine = SyncEngine::new(Catalog::builtin(), Arc::clone(&store));
    engine.configure(&["docker"]).await.unwrap();
    assert_eq!(engine.tree().tracked_keys(ResourceCategory::Workload).len(), 2);
    assert!(ids_under(&store, "vms").is_empty());

    engine.process_cycle(&workloads(&["web"])).await;
    assert!(!store.contains("docker.containers.db"));
    let objects = store.list_objects().await.unwrap();
    assert!(objects.iter().all(|o| !o.id.starts_with("docker.containers.db")));
}

#[tokio::test]
async fn test_connection_marking() {
    let mut engine = engine();
    engine.configure(&["system.online"]).await.unwrap();

    engine.mark_connection(false).await;
    assert_eq!(engine.store().value("info.connection"), Some(json!(false)));
    assert_eq!(engine.store().value("info.lastPoll"), Some(Value::Null));

    engine.mark_connection(true).await;
    assert_eq!(engine.store().value("info.connection"), Some(json!(true)));
    assert!(engine.store().value("info.lastPoll").unwrap().is_string());
}

// ── Catalog integrity ───────────────────────────────────────────────

static DUPLICATE_NODES: Catalog = Catalog {
    nodes: &[
        DomainNode {
            id: "system",
            label: "System",
            children: &[],
            default_selected: true,
        },
        DomainNode {
            id: "system",
            label: "System again",
            children: &[],
            default_selected: false,
        },
    ],
    definitions: &[DomainDefinition {
        id: "system",
        selection: &[],
        states: &[],
        resources: &[],
    }],
};

#[tokio::test]
async fn test_invalid_catalog_is_rejected_before_any_write() {
    let store = Arc::new(MemoryStore::new("hostmirror.0"));
    let mut engine = SyncEngine::new(&DUPLICATE_NODES, Arc::clone(&store));

    let err = engine.configure(&["system"]).await.unwrap_err();
    assert!(
        matches!(err, CoreError::Catalog { ref message } if message.contains("duplicate")),
        "got: {err:?}"
    );
    assert!(store.is_empty());
}
