//! Wires store, dispatcher, connectivity source and orchestrator together
//! from the effective configuration.

use crate::config::Config;
use crate::core::cache::StoreInvalidator;
use crate::core::connectivity::{ConnectivitySource, ManualSource, TcpProbe};
use crate::core::dispatcher::{ActionDispatcher, HttpDispatcher};
use crate::core::orchestrator::SyncOrchestrator;
use crate::core::report::{ConsoleReporter, SyncReporter};
use crate::core::retry::RetryPolicy;
use crate::db::store::QueueStore;
use crate::errors::AppResult;
use std::sync::Arc;

pub struct SyncEngine {
    pub store: Arc<QueueStore>,
    pub source: Arc<dyn ConnectivitySource>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl SyncEngine {
    /// Production wiring: HTTP dispatcher, TCP probe (or a forced-offline
    /// source), console notifications.
    pub fn from_config(cfg: &Config, offline: bool) -> AppResult<Self> {
        let store = Arc::new(QueueStore::open(&cfg.database)?);
        let dispatcher: Arc<dyn ActionDispatcher> = Arc::new(HttpDispatcher::new(cfg)?);
        let source: Arc<dyn ConnectivitySource> = if offline {
            Arc::new(ManualSource::new(false))
        } else {
            Arc::new(TcpProbe::from_base_url(
                &cfg.api_base_url,
                cfg.request_timeout(),
            )?)
        };
        Ok(Self::assemble(
            cfg,
            store,
            dispatcher,
            source,
            Arc::new(ConsoleReporter),
        ))
    }

    pub fn assemble(
        cfg: &Config,
        store: Arc<QueueStore>,
        dispatcher: Arc<dyn ActionDispatcher>,
        source: Arc<dyn ConnectivitySource>,
        reporter: Arc<dyn SyncReporter>,
    ) -> Self {
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&store),
            dispatcher,
            RetryPolicy::new(cfg.max_attempts),
        )
        .with_cache(Arc::new(StoreInvalidator::new(Arc::clone(&store))))
        .with_reporter(reporter);

        Self {
            store,
            source,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub async fn probe(&self) -> bool {
        self.source.probe().await
    }
}
