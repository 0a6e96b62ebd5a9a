use std::sync::Arc;

use crate::service::StatsService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatsService>,
    /// Count used when a report URL omits its count segment.
    pub default_report_items: usize,
}
