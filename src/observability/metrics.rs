//! Metrics collection.
//!
//! Prometheus-compatible counters and histograms with label cardinality
//! protection. Label values always come from closed sets; plugin validator
//! ids are bucketed so a plugin directory cannot grow the label space.

use std::sync::Mutex;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::validators::BUILTIN_IDS;

/// Handle of the recorder installed by [`init_metrics`].
static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Label used for every non-built-in validator id.
pub const PLUGIN_VALIDATOR_LABEL: &str = "__plugin__";

/// Sanitizes a validator id for use as a metrics label.
///
/// Built-in ids are kept; anything else is bucketed.
#[must_use]
pub fn sanitize_validator_label(validator: &str) -> &str {
    let lowered = validator.to_ascii_lowercase();
    BUILTIN_IDS
        .iter()
        .find(|id| **id == lowered)
        .copied()
        .unwrap_or(PLUGIN_VALIDATOR_LABEL)
}

/// Installs the global Prometheus recorder without an HTTP listener.
///
/// The returned handle renders the exposition text for the host to serve
/// or write out. Subsequent calls return the same handle.
///
/// # Errors
///
/// Returns [`BuildError`] if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let mut slot = HANDLE
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        tracing::debug!("metrics already initialized, reusing handle");
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    *slot = Some(handle.clone());
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "settings_guard_validations_total",
        "Validator evaluations by validator and outcome"
    );
    describe_counter!(
        "settings_guard_environments_total",
        "Environments processed by outcome"
    );
    describe_histogram!(
        "settings_guard_environment_duration_ms",
        "Per-environment pipeline duration in milliseconds"
    );
    describe_counter!(
        "settings_guard_path_cache_total",
        "Path resolution cache lookups by result"
    );
    describe_counter!(
        "settings_guard_security_denials_total",
        "Rejected inputs by kind"
    );
    describe_counter!(
        "settings_guard_plugins_skipped_total",
        "Plugin candidates skipped during discovery by reason"
    );
    describe_counter!(
        "settings_guard_critical_errors_total",
        "Process-fatal failures observed"
    );
}

/// Outcome of a single validator evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The value satisfied the condition.
    Pass,
    /// The value violated the condition.
    Fail,
    /// The condition itself was unusable.
    Misconfigured,
}

impl CheckOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Misconfigured => "misconfigured",
        }
    }
}

/// Records a validator evaluation.
pub fn record_validation(validator: &str, outcome: CheckOutcome) {
    counter!(
        "settings_guard_validations_total",
        "validator" => sanitize_validator_label(validator).to_owned(),
        "outcome" => outcome.label(),
    )
    .increment(1);
}

/// Records the outcome of one environment pipeline.
///
/// `outcome` is one of `valid`, `invalid`, `error` or `critical`.
pub fn record_environment(outcome: &'static str, duration: Duration) {
    counter!("settings_guard_environments_total", "outcome" => outcome).increment(1);
    histogram!("settings_guard_environment_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Records a path cache lookup (`hit`, `miss` or `stale`).
pub fn record_path_cache(result: &'static str) {
    counter!("settings_guard_path_cache_total", "result" => result).increment(1);
}

/// Records a rejected input (`path_escape`, `symlink_escape`,
/// `path_too_long` or `limit_exceeded`).
pub fn record_security_denial(kind: &'static str) {
    counter!("settings_guard_security_denials_total", "kind" => kind).increment(1);
}

/// Records a skipped plugin candidate.
pub fn record_plugin_skipped(reason: &'static str) {
    counter!("settings_guard_plugins_skipped_total", "reason" => reason).increment(1);
}

/// Records a critical failure.
pub fn record_critical_error() {
    counter!("settings_guard_critical_errors_total").increment(1);
}
