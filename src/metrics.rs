use metrics::{counter, histogram};
use tracing::trace;

// Each helper leaves a trace event and feeds the Prometheus recorder
// served at `/metrics`.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "gtinsync.metrics",
        route = route,
        "requests_total_inc"
    );
    counter!("gtinsync_requests_total", "route" => route).increment(1);
}

pub fn row_outcome(phase: &'static str, outcome: &'static str) {
    trace!(
        target = "gtinsync.metrics",
        phase = phase,
        outcome = outcome,
        "rows_total_inc"
    );
    counter!("gtinsync_rows_total", "phase" => phase, "outcome" => outcome).increment(1);
}

pub fn phase_elapsed(phase: &'static str, elapsed_ms: u128) {
    trace!(
        target = "gtinsync.metrics",
        phase = phase,
        elapsed_ms = elapsed_ms as u64,
        "phase_elapsed"
    );
    histogram!("gtinsync_phase_elapsed_ms", "phase" => phase).record(elapsed_ms as f64);
}
