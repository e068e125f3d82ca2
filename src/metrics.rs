//! Prometheus metrics for HTTP request instrumentation.
//!
//! Metrics live in an [`HttpMetrics`] registry that is created once at startup
//! and handed to the metrics middleware and the `/metrics` handler. The
//! registry owns its own Prometheus recorder instead of installing a global
//! one, so tests can build isolated registries side by side.
//!
//! # Available Metrics
//!
//! ## Gauges
//! - `http_reqs_in_flight` - Requests currently executing (labels: method, path)
//!
//! ## Counters
//! - `http_status_code_count` - Completed requests (labels: method, path, status_code)
//!
//! ## Histograms
//! - `http_request_duration_seconds` - Request duration (labels: method, path, status_code)
//!
//! # Label Cardinality
//!
//! `path` is always the templated route (`/person/{id}`), never the raw
//! request path. Requests that match no route share [`UNMATCHED_ROUTE`].
//! `method` is one of the standard HTTP methods; extension methods share
//! [`OTHER_METHOD`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use bungalow::metrics::HttpMetrics;
//!
//! let metrics = HttpMetrics::new();
//! {
//!     let _in_flight = metrics.track_in_flight("GET", "/person/{id}");
//!     // ... serve the request ...
//! }
//! metrics.record_response("GET", "/person/{id}", 200, Duration::from_millis(3));
//! println!("{}", metrics.render());
//! ```

use std::time::Duration;

use axum::http::Method;
use metrics::{
    Gauge, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::warn;

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQS_IN_FLIGHT: &str = "http_reqs_in_flight";
    pub const HTTP_STATUS_CODE_COUNT: &str = "http_status_code_count";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
}

/// Route label used for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Method label used for every non-standard request method.
pub const OTHER_METHOD: &str = "other";

const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Label value for `method`, drawn from a fixed set.
pub fn method_label(method: &Method) -> &'static str {
    STANDARD_METHODS
        .iter()
        .find(|standard| **standard == method.as_str())
        .copied()
        .unwrap_or(OTHER_METHOD)
}

/// Histogram buckets for request duration, in seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Registry of HTTP request metrics.
///
/// All recording goes through atomics inside the Prometheus recorder, so a
/// shared `Arc<HttpMetrics>` is safe to use from any number of requests.
pub struct HttpMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMetrics {
    /// Create a registry and describe every metric it records.
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )
            .unwrap_or_else(|e| {
                warn!(error = %e, "Invalid duration buckets, falling back to summaries");
                PrometheusBuilder::new()
            });

        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        let metrics = Self { recorder, handle };

        metrics.with_recorder(|| {
            describe_gauge!(
                names::HTTP_REQS_IN_FLIGHT,
                "Current number of in flight requests."
            );
            describe_counter!(
                names::HTTP_STATUS_CODE_COUNT,
                "Number of response status codes per endpoint."
            );
            describe_histogram!(
                names::HTTP_REQUEST_DURATION_SECONDS,
                "HTTP request duration in seconds."
            );
        });

        metrics
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.recorder, f)
    }

    /// Increment the in-flight gauge for `(method, path)`.
    ///
    /// The gauge is decremented when the returned guard is dropped, which
    /// also happens while unwinding from a panic or when the request future
    /// is cancelled.
    #[must_use = "the in-flight gauge is decremented when the guard is dropped"]
    pub fn track_in_flight(&self, method: &str, path: &str) -> InFlightGuard {
        let gauge = self.with_recorder(|| {
            gauge!(names::HTTP_REQS_IN_FLIGHT, "method" => method.to_string(), "path" => path.to_string())
        });
        gauge.increment(1.0);
        InFlightGuard { gauge }
    }

    /// Record a completed request.
    pub fn record_response(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.with_recorder(|| {
            counter!(names::HTTP_STATUS_CODE_COUNT, "method" => method.to_string(), "path" => path.to_string(), "status_code" => status.clone())
                .increment(1);
            histogram!(names::HTTP_REQUEST_DURATION_SECONDS, "method" => method.to_string(), "path" => path.to_string(), "status_code" => status)
                .record(duration.as_secs_f64());
        });
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Decrements the in-flight gauge exactly once, on drop.
pub struct InFlightGuard {
    gauge: Gauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}
