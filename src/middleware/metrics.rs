use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use futures::FutureExt;

use super::Recorder;
use crate::metrics::{HttpMetrics, UNMATCHED_ROUTE, method_label};

/// Track the request in the in-flight gauge while it runs, then count its
/// status and record its duration.
///
/// Labels use the matched route template, so `/person/1` and `/person/2`
/// share one series, and a bounded method label. The in-flight gauge is
/// released by a drop guard and therefore also balances when an inner handler
/// panics or the request is cancelled. A panicking request is counted as the
/// 500 that recovery answers with, then the panic continues outward.
pub async fn track_metrics(
    State(metrics): State<Arc<HttpMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = method_label(request.method());
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |p| p.as_str().to_string());

    let _in_flight = metrics.track_in_flight(method, &path);
    let start = Instant::now();

    let mut recorder = Recorder::new();
    let outcome = AssertUnwindSafe(recorder.run(next, request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(response) => {
            metrics.record_response(method, &path, recorder.status().as_u16(), start.elapsed());
            response
        }
        Err(payload) => {
            metrics.record_response(
                method,
                &path,
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                start.elapsed(),
            );
            panic::resume_unwind(payload)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::Method;
    use axum::middleware::{from_fn, from_fn_with_state};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::names;

    fn router(metrics: Arc<HttpMetrics>) -> Router {
        Router::new()
            .route("/person/{id}", get(|| async { StatusCode::NO_CONTENT }))
            .route_layer(from_fn_with_state(metrics, track_metrics))
    }

    #[tokio::test]
    async fn test_labels_use_route_template() {
        let metrics = Arc::new(HttpMetrics::new());

        for id in ["1", "2"] {
            let response = router(metrics.clone())
                .oneshot(
                    Request::builder()
                        .uri(format!("/person/{id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let rendered = metrics.render();
        let count_line = rendered
            .lines()
            .find(|line| line.starts_with(names::HTTP_STATUS_CODE_COUNT))
            .unwrap();
        assert!(count_line.contains("path=\"/person/{id}\""));
        assert!(count_line.contains("status_code=\"204\""));
        assert!(count_line.ends_with(" 2"));
        assert!(!rendered.contains("/person/1"));
    }

    async fn explode() -> StatusCode {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_request_is_counted_as_500() {
        let metrics = Arc::new(HttpMetrics::new());
        let app = Router::new()
            .route("/boom", get(explode))
            .route_layer(from_fn_with_state(metrics.clone(), track_metrics))
            .layer(from_fn(crate::middleware::recover::recover));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let rendered = metrics.render();
        let count_line = rendered
            .lines()
            .find(|line| line.starts_with(names::HTTP_STATUS_CODE_COUNT))
            .unwrap();
        assert!(count_line.contains("path=\"/boom\""));
        assert!(count_line.contains("status_code=\"500\""));
        assert!(count_line.ends_with(" 1"));
    }

    #[tokio::test]
    async fn test_extension_methods_share_one_label() {
        let metrics = Arc::new(HttpMetrics::new());
        let app = Router::new()
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(from_fn_with_state(metrics.clone(), track_metrics));

        for i in 0..10 {
            let method = Method::from_bytes(format!("X{i}").as_bytes()).unwrap();
            app.clone()
                .oneshot(Request::builder().method(method).uri("/nope").body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        let rendered = metrics.render();
        let counters: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with(names::HTTP_STATUS_CODE_COUNT))
            .collect();
        assert_eq!(counters.len(), 1);
        assert!(counters[0].contains("method=\"other\""));
        assert!(counters[0].ends_with(" 10"));
        assert!(!rendered.contains("X0"));
    }
}
