pub mod api;
pub mod auth;
pub mod config;
pub mod db;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::db::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
