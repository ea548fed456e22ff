use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder once per process.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            // Another recorder owns the global slot; render an empty local one.
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            PrometheusBuilder::new().build_recorder().handle()
        }
    });
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a recharge submission by outcome (`success`, `declined`, ...).
pub fn record_submission(outcome: &'static str) {
    metrics::counter!("recharge_submissions_total", "outcome" => outcome).increment(1);
}

/// Add a recorded recharge amount, in whole currency units.
pub fn record_amount(amount: i64) {
    metrics::counter!("recharge_amount_total").increment(u64::try_from(amount).unwrap_or(0));
}
