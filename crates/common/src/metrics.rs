use std::sync::{Arc, OnceLock};

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};

#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    calls: CounterVec,
    call_failures: CounterVec,
    calls_active: GaugeVec,
    rows_in: CounterVec,
    rows_out: CounterVec,
    bundles_in: CounterVec,
    bundles_out: CounterVec,
    call_seconds: HistogramVec,
    capability_requests: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    pub fn call_started(&self, function: &str) {
        self.inner.calls.with_label_values(&[function]).inc();
        self.inner.calls_active.with_label_values(&[function]).inc();
    }

    pub fn call_finished(
        &self,
        function: &str,
        rows_in: u64,
        rows_out: u64,
        bundles_in: u64,
        bundles_out: u64,
        secs: f64,
    ) {
        let labels = [function];
        self.inner.calls_active.with_label_values(&labels).dec();
        self.inner
            .rows_in
            .with_label_values(&labels)
            .inc_by(rows_in as f64);
        self.inner
            .rows_out
            .with_label_values(&labels)
            .inc_by(rows_out as f64);
        self.inner
            .bundles_in
            .with_label_values(&labels)
            .inc_by(bundles_in as f64);
        self.inner
            .bundles_out
            .with_label_values(&labels)
            .inc_by(bundles_out as f64);
        self.inner
            .call_seconds
            .with_label_values(&labels)
            .observe(secs.max(0.0));
    }

    pub fn call_failed(&self, function: &str, kind: &str, secs: f64) {
        self.inner.calls_active.with_label_values(&[function]).dec();
        self.inner
            .call_failures
            .with_label_values(&[function, kind])
            .inc();
        self.inner
            .call_seconds
            .with_label_values(&[function])
            .observe(secs.max(0.0));
    }

    /// Rejections that happen before a function is selected (bad header, unknown id).
    pub fn call_rejected(&self, kind: &str) {
        self.inner
            .call_failures
            .with_label_values(&["<none>", kind])
            .inc();
    }

    pub fn inc_capability_requests(&self) {
        self.inner.capability_requests.inc();
    }

    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let calls = counter_vec(
            &registry,
            "sse_calls_total",
            "Streaming calls started per function",
            &["function"],
        );
        let call_failures = counter_vec(
            &registry,
            "sse_call_failures_total",
            "Streaming calls that ended with an error",
            &["function", "kind"],
        );
        let calls_active = gauge_vec(
            &registry,
            "sse_calls_active",
            "Streaming calls currently executing",
            &["function"],
        );
        let rows_in = counter_vec(
            &registry,
            "sse_rows_in_total",
            "Rows received per function",
            &["function"],
        );
        let rows_out = counter_vec(
            &registry,
            "sse_rows_out_total",
            "Rows sent per function",
            &["function"],
        );
        let bundles_in = counter_vec(
            &registry,
            "sse_bundles_in_total",
            "Bundles received per function",
            &["function"],
        );
        let bundles_out = counter_vec(
            &registry,
            "sse_bundles_out_total",
            "Bundles sent per function",
            &["function"],
        );
        let call_seconds = histogram_vec(
            &registry,
            "sse_call_seconds",
            "Wall time of a streaming call",
            &["function"],
        );
        let capability_requests = IntCounter::new(
            "sse_capability_requests_total",
            "Capability discovery requests",
        )
        .expect("int counter");
        registry
            .register(Box::new(capability_requests.clone()))
            .expect("register counter");

        Self {
            registry,
            calls,
            call_failures,
            calls_active,
            rows_in,
            rows_out,
            bundles_in,
            bundles_out,
            call_seconds,
            capability_requests,
        }
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    let g = GaugeVec::new(Opts::new(name, help), labels).expect("gauge vec");
    registry
        .register(Box::new(g.clone()))
        .expect("register gauge");
    g
}

fn histogram_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let h = HistogramVec::new(HistogramOpts::new(name, help), labels).expect("histogram vec");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::MetricsRegistry;

    #[test]
    fn renders_prometheus_text() {
        let m = MetricsRegistry::new();
        m.call_started("SumOfRows");
        m.call_finished("SumOfRows", 10, 10, 2, 2, 0.01);
        let text = m.render_prometheus();
        assert!(text.contains("sse_rows_out_total"));
        assert!(text.contains("SumOfRows"));
    }

    #[test]
    fn renders_all_metric_families() {
        let m = MetricsRegistry::new();
        m.call_started("SumOfColumn");
        m.call_finished("SumOfColumn", 3, 1, 1, 1, 0.002);
        m.call_started("TwoNormRanking");
        m.call_failed("TwoNormRanking", "row_shape", 0.001);
        m.call_rejected("unknown_function");
        m.inc_capability_requests();
        let text = m.render_prometheus();

        assert!(text.contains("sse_calls_total"));
        assert!(text.contains("sse_call_failures_total"));
        assert!(text.contains("sse_calls_active"));
        assert!(text.contains("sse_rows_in_total"));
        assert!(text.contains("sse_rows_out_total"));
        assert!(text.contains("sse_bundles_in_total"));
        assert!(text.contains("sse_bundles_out_total"));
        assert!(text.contains("sse_call_seconds"));
        assert!(text.contains("sse_capability_requests_total 1"));
        assert!(text.contains("row_shape"));
        assert!(text.contains("unknown_function"));
    }
}
