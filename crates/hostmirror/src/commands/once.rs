//! `once`: a single poll cycle, printed as a state listing.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use hostmirror_core::store::is_within;
use hostmirror_core::{Catalog, MemoryStore, ObjectKind, Poller, StoredObject};

use crate::cli::{GlobalOpts, OnceArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StateView<'a> {
    id: &'a str,
    kind: ObjectKind,
    name: &'a str,
    value: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
}

impl<'a> From<&'a StoredObject> for StateView<'a> {
    fn from(o: &'a StoredObject) -> Self {
        Self {
            id: &o.id,
            kind: o.kind,
            name: &o.common.name,
            value: &o.value,
            unit: o.common.unit.as_deref(),
        }
    }
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "State")]
    id: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Name")]
    name: String,
}

pub async fn handle(args: &OnceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global, &args.selection.domains)?;
    let poller_config = config::poller_config(&cfg, global)?;
    config::require_complete(&poller_config, global)?;

    let store = Arc::new(MemoryStore::new(cfg.state.namespace.clone()));
    let mut poller = Poller::new(poller_config, Catalog::builtin(), Arc::clone(&store));
    let report = poller.run_once().await?;
    tracing::debug!(
        cycle = report.cycle,
        skipped = ?report.skipped,
        "cycle finished"
    );

    let objects: Vec<StoredObject> = store
        .snapshot()
        .into_iter()
        .filter(|o| args.containers || o.kind == ObjectKind::Leaf)
        .filter(|o| args.prefix.as_deref().is_none_or(|p| is_within(&o.id, p)))
        .collect();
    let views: Vec<StateView<'_>> = objects.iter().map(StateView::from).collect();

    let out = output::render_list(
        global.output,
        &views,
        |v| StateRow {
            id: v.id.to_owned(),
            value: output::display_value(v.value),
            unit: v.unit.unwrap_or_default().to_owned(),
            name: v.name.to_owned(),
        },
        |v| format!("{}={}", v.id, output::display_value(v.value)),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
