use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct SettlerTelemetry {
    inner: Arc<Inner>,
}

struct Inner {
    runs_total: Counter<u64>,
    runs_joined_total: Counter<u64>,
    lock_failures_total: Counter<u64>,
    wallets_locked_total: Counter<u64>,
    requests_deduplicated_total: Counter<u64>,
    submissions_total: Counter<u64>,
    request_failures_total: Counter<u64>,
    retries_total: Counter<u64>,
    escalations_total: Counter<u64>,
    persistence_after_submit_total: Counter<u64>,
    misconfigured_networks_total: Counter<u64>,

    run_ms: Histogram<u64>,
    submit_ms: Histogram<u64>,
}

impl SettlerTelemetry {
    pub fn new() -> Self {
        let meter = global::meter("settler");

        let runs_total = meter
            .u64_counter("settler.runs_total")
            .with_description("Total settlement runs executed")
            .build();
        let runs_joined_total = meter
            .u64_counter("settler.runs_joined_total")
            .with_description("Triggers that waited for an active run instead of starting one")
            .build();
        let lock_failures_total = meter
            .u64_counter("settler.lock_failures_total")
            .with_description("Eligibility transactions that failed and aborted the run")
            .build();
        let wallets_locked_total = meter
            .u64_counter("settler.wallets_locked_total")
            .with_description("Pending transaction locks created")
            .build();
        let requests_deduplicated_total = meter
            .u64_counter("settler.requests_deduplicated_total")
            .with_description("Eligible requests skipped because their wallet was already used this run")
            .build();
        let submissions_total = meter
            .u64_counter("settler.submissions_total")
            .with_description("Submit-result transactions accepted by the network")
            .build();
        let request_failures_total = meter
            .u64_counter("settler.request_failures_total")
            .with_description("Request-scoped failures partitioned by kind")
            .build();
        let retries_total = meter
            .u64_counter("settler.retries_total")
            .with_description("Requests whose retry counter was incremented")
            .build();
        let escalations_total = meter
            .u64_counter("settler.escalations_total")
            .with_description("Requests flagged for manual review")
            .build();
        let persistence_after_submit_total = meter
            .u64_counter("settler.persistence_after_submit_total")
            .with_description("Submitted transactions whose outcome could not be recorded")
            .build();
        let misconfigured_networks_total = meter
            .u64_counter("settler.misconfigured_networks_total")
            .with_description("Network handlers skipped for an unsupported network")
            .build();

        let run_ms = meter
            .u64_histogram("settler.run_ms")
            .with_description("Settlement run duration")
            .with_unit("ms")
            .build();
        let submit_ms = meter
            .u64_histogram("settler.submit_ms")
            .with_description("Build, sign and submit latency per request")
            .with_unit("ms")
            .build();

        Self {
            inner: Arc::new(Inner {
                runs_total,
                runs_joined_total,
                lock_failures_total,
                wallets_locked_total,
                requests_deduplicated_total,
                submissions_total,
                request_failures_total,
                retries_total,
                escalations_total,
                persistence_after_submit_total,
                misconfigured_networks_total,
                run_ms,
                submit_ms,
            }),
        }
    }

    pub fn run_done(&self, ms: u64, ok: bool) {
        let attrs = [KeyValue::new("ok", ok)];
        self.inner.runs_total.add(1, &attrs);
        self.inner.run_ms.record(ms, &attrs);
    }

    pub fn run_joined(&self) {
        self.inner.runs_joined_total.add(1, &[]);
    }

    pub fn lock_failed(&self) {
        self.inner.lock_failures_total.add(1, &[]);
    }

    pub fn wallets_locked(&self, n: usize) {
        self.inner.wallets_locked_total.add(n as u64, &[]);
    }

    pub fn deduplicated(&self, network: &'static str, n: usize) {
        let attrs = [KeyValue::new("network", network)];
        self.inner.requests_deduplicated_total.add(n as u64, &attrs);
    }

    pub fn submitted(&self, network: &'static str, ms: u64) {
        let attrs = [KeyValue::new("network", network)];
        self.inner.submissions_total.add(1, &attrs);
        self.inner.submit_ms.record(ms, &attrs);
    }

    pub fn request_failed(&self, network: &'static str, kind: &'static str) {
        let attrs = [
            KeyValue::new("network", network),
            KeyValue::new("kind", kind),
        ];
        self.inner.request_failures_total.add(1, &attrs);
    }

    pub fn retried(&self) {
        self.inner.retries_total.add(1, &[]);
    }

    pub fn escalated(&self) {
        self.inner.escalations_total.add(1, &[]);
    }

    pub fn persistence_after_submit(&self) {
        self.inner.persistence_after_submit_total.add(1, &[]);
    }

    pub fn misconfigured_network(&self) {
        self.inner.misconfigured_networks_total.add(1, &[]);
    }
}

impl Default for SettlerTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
