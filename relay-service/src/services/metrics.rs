//! Prometheus metrics for relay-service.
//!
//! Request counters come from the shared middleware; the counters below track
//! relay outcomes.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEVICES_REGISTERED_TOTAL: &str = "relay_devices_registered_total";
pub const NOTIFICATIONS_TOTAL: &str = "relay_notifications_total";

/// Installs the global Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}", e);
        }
    }
}

/// Metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_registration() {
    counter!(DEVICES_REGISTERED_TOTAL).increment(1);
}

/// `status` is `sent`, `not_found` or `failed`.
pub fn record_notification(status: &'static str) {
    counter!(NOTIFICATIONS_TOTAL, "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_harmless() {
        record_registration();
        record_notification("sent");
    }

    #[test]
    fn init_is_idempotent() {
        init_metrics();
        init_metrics();
        assert!(get_metrics().is_ascii());
    }
}
