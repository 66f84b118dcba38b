//! `run`: poll until interrupted, persisting the tree after every cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use hostmirror_core::{Catalog, MemoryStore, Poller, PollerConfig};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global, &args.selection.domains)?;
    let mut poller_config = config::poller_config(&cfg, global)?;
    if let Some(secs) = args.interval {
        poller_config.interval = PollerConfig::clamp_interval(secs);
    }
    config::require_complete(&poller_config, global)?;

    let snapshot: PathBuf = args
        .state_file
        .unwrap_or_else(|| cfg.state.snapshot_path());
    let store = Arc::new(MemoryStore::load_snapshot(
        cfg.state.namespace.clone(),
        &snapshot,
    )?);
    info!(
        path = %snapshot.display(),
        objects = store.len(),
        "state snapshot loaded"
    );

    let handle = Poller::new(poller_config, Catalog::builtin(), Arc::clone(&store)).spawn();
    let mut reports = handle.reports();

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let cycle = reports.borrow_and_update().as_ref().map(|r| r.cycle);
                if let Err(e) = store.save_snapshot(&snapshot) {
                    warn!(error = %e, ?cycle, "failed to persist state snapshot");
                }
            }
        }
    }

    handle.shutdown(SHUTDOWN_TIMEOUT).await;
    store.save_snapshot(&snapshot)?;
    info!(path = %snapshot.display(), objects = store.len(), "state snapshot saved");
    Ok(())
}
