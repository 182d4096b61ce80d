//! Prometheus metrics recorder.
//!
//! The recorder is process-wide, so it is installed once and every
//! [`AppState`](crate::app::AppState) shares the same handle.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Handle for rendering `/metrics`, installing the recorder on first use.
/// `None` when another recorder already owns the global slot.
pub fn metrics_handle() -> Option<PrometheusHandle> {
    METRICS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}
