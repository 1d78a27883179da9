//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::services::{AutomationService, ScheduleController};

/// Everything the REST handlers reach into. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub automation: Arc<AutomationService>,
    pub scheduler: Arc<ScheduleController>,
    pub prometheus: PrometheusHandle,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(
        automation: Arc<AutomationService>,
        scheduler: Arc<ScheduleController>,
        prometheus: PrometheusHandle,
    ) -> Self {
        Self {
            automation,
            scheduler,
            prometheus,
            started_at: Arc::new(Instant::now()),
        }
    }
}
