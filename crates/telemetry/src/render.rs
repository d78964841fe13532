use crate::MetricsSnapshot;

/// Renders a snapshot as Prometheus exposition text, one `provider` label
/// applied to every metric, using the exact names named in spec §6.
pub fn render_prometheus(snapshot: &MetricsSnapshot, provider: &str) -> String {
    let mut out = String::new();

    push_counter(
        &mut out,
        "clasp_requests_total",
        "Total number of requests handled",
        provider,
        snapshot.requests_total,
    );
    push_counter(
        &mut out,
        "clasp_requests_successful",
        "Total number of successful requests",
        provider,
        snapshot.requests_successful,
    );
    push_counter(
        &mut out,
        "clasp_requests_errors",
        "Total number of failed requests",
        provider,
        snapshot.requests_errors,
    );
    push_counter(
        &mut out,
        "clasp_requests_streaming",
        "Total number of streamed requests",
        provider,
        snapshot.requests_streaming,
    );
    push_counter(
        &mut out,
        "clasp_requests_tool_calls",
        "Total number of tool calls observed",
        provider,
        snapshot.requests_tool_calls,
    );
    push_gauge(
        &mut out,
        "clasp_latency_total_ms",
        "Cumulative request latency in milliseconds",
        provider,
        snapshot.latency_total_ms as f64,
    );
    push_gauge(
        &mut out,
        "clasp_uptime_seconds",
        "Seconds since process start",
        provider,
        snapshot.uptime_seconds,
    );
    push_gauge(
        &mut out,
        "clasp_latency_avg_ms",
        "Average request latency in milliseconds",
        provider,
        snapshot.latency_avg_ms,
    );
    push_gauge(
        &mut out,
        "clasp_requests_per_second",
        "Average request throughput since process start",
        provider,
        snapshot.requests_per_second,
    );

    out
}

fn push_counter(out: &mut String, name: &str, help: &str, provider: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name}{{provider=\"{provider}\"}} {value}\n"));
}

fn push_gauge(out: &mut String, name: &str, help: &str, provider: &str, value: f64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} gauge\n"));
    out.push_str(&format!("{name}{{provider=\"{provider}\"}} {value}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_help_type_and_label_per_metric() {
        let snapshot = MetricsSnapshot {
            requests_total: 1,
            requests_successful: 1,
            requests_errors: 0,
            requests_streaming: 0,
            requests_tool_calls: 0,
            latency_total_ms: 10,
            latency_avg_ms: 10.0,
            uptime_seconds: 1.0,
            requests_per_second: 1.0,
            cache_hits: 0,
            cache_misses: 0,
            cache_hit_rate: 0.0,
            rate_limited: 0,
            circuit_breaker_trips: 0,
        };

        let text = render_prometheus(&snapshot, "openai");
        assert!(text.contains("# HELP clasp_requests_total"));
        assert!(text.contains("# TYPE clasp_requests_total counter"));
        assert!(text.contains(r#"clasp_requests_total{provider="openai"} 1"#));
    }
}
