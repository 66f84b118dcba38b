// ── Poller ──
//
// Drives the sync engine on a fixed cadence: fetch, process, sleep,
// repeat. Cycles never overlap. Cancellation abandons the pending sleep
// but lets an in-flight cycle finish.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use hostmirror_api::{GraphqlClient, TlsMode, TransportConfig};

use crate::catalog::Catalog;
use crate::config::{PollerConfig, TlsVerification};
use crate::engine::{CycleReport, SyncEngine};
use crate::error::CoreError;
use crate::store::StateStore;

/// Latest cycle report, `None` until the first cycle completes.
pub type ReportReceiver = watch::Receiver<Option<Arc<CycleReport>>>;

pub struct Poller<S> {
    config: PollerConfig,
    engine: SyncEngine<S>,
    client: Option<GraphqlClient>,
    configured: bool,
    reports: watch::Sender<Option<Arc<CycleReport>>>,
}

impl<S: StateStore + 'static> Poller<S> {
    pub fn new(config: PollerConfig, catalog: &'static Catalog, store: Arc<S>) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            config,
            engine: SyncEngine::new(catalog, store),
            client: None,
            configured: false,
            reports,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn engine(&self) -> &SyncEngine<S> {
        &self.engine
    }

    pub fn subscribe(&self) -> ReportReceiver {
        self.reports.subscribe()
    }

    fn client(&mut self) -> Result<&GraphqlClient, CoreError> {
        if self.client.is_none() {
            let (address, api_key) = required(&self.config)?;
            let transport = TransportConfig {
                tls: tls_mode(&self.config.tls),
                timeout: self.config.timeout,
            };
            let client = GraphqlClient::from_api_key(address.as_str(), api_key, &transport)?;
            debug!(endpoint = %client.endpoint(), "graphql client ready");
            self.client = Some(client);
        }
        self.client.as_ref().ok_or(CoreError::MissingConfig { field: "address" })
    }

    async fn ensure_configured(&mut self) -> Result<(), CoreError> {
        if !self.configured {
            let domains = self.config.domains.clone();
            self.engine.configure(&domains).await?;
            self.configured = true;
        }
        Ok(())
    }

    /// Run exactly one fetch-and-process cycle.
    ///
    /// A failed fetch marks the connection down and returns the error;
    /// nothing else in the state tree is touched.
    pub async fn run_once(&mut self) -> Result<Arc<CycleReport>, CoreError> {
        self.ensure_configured().await?;
        let text = self
            .engine
            .plan()
            .map(|p| p.text().to_owned())
            .ok_or_else(|| CoreError::Config {
                message: "no queryable domains selected".into(),
            })?;

        let fetched = match self.client() {
            Ok(client) => client.query(&text).await.map_err(CoreError::from),
            Err(e) => Err(e),
        };
        let data = match fetched {
            Ok(data) => data,
            Err(e) => {
                self.engine.mark_connection(false).await;
                return Err(e);
            }
        };

        let report = Arc::new(self.engine.process_cycle(&data).await);
        self.engine.mark_connection(true).await;
        self.reports.send_replace(Some(Arc::clone(&report)));
        Ok(report)
    }

    /// Poll until `cancel` fires.
    ///
    /// An incomplete configuration is logged once and the poller idles
    /// until cancelled. Cycle failures are logged and the next cycle is
    /// still scheduled.
    pub async fn run(mut self, cancel: CancellationToken) {
        if let Some(field) = self.config.missing_field() {
            error!(field, "server configuration incomplete, poller idle");
            cancel.cancelled().await;
            return;
        }

        let interval = self.config.interval;
        info!(interval_secs = interval.as_secs(), "poller started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.run_once().await {
                Ok(report) => debug!(cycle = report.cycle, "poll cycle complete"),
                Err(e) if e.is_transient() => warn!(error = %e, "poll cycle failed"),
                Err(e) => error!(error = %e, "poll cycle failed"),
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!("poller stopped");
    }

    /// Spawn the poll loop on the runtime.
    pub fn spawn(self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let reports = self.subscribe();
        let task = tokio::spawn(self.run(cancel.clone()));
        PollerHandle {
            cancel,
            task,
            reports,
        }
    }
}

fn required(config: &PollerConfig) -> Result<(&Url, &SecretString), CoreError> {
    let address = config
        .address
        .as_ref()
        .ok_or(CoreError::MissingConfig { field: "address" })?;
    let api_key = config
        .api_key
        .as_ref()
        .ok_or(CoreError::MissingConfig { field: "api_key" })?;
    Ok((address, api_key))
}

fn tls_mode(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

/// Handle to a spawned poller.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    reports: ReportReceiver,
}

impl PollerHandle {
    pub fn reports(&self) -> ReportReceiver {
        self.reports.clone()
    }

    /// Cancel the loop and wait up to `timeout` for it to finish.
    /// Returns `false` when the timeout elapsed first.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "poller task panicked");
                true
            }
            Err(_) => {
                warn!(?timeout, "poller did not stop in time");
                false
            }
        }
    }
}
