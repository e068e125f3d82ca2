//! Debug-level request dumps.

use std::fmt::Write as _;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use thiserror::Error;
use tracing::{Level, debug};

use crate::error::AppError;

/// Why a request could not be dumped.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
}

/// Render `request` as HTTP/1.x wire text and return it together with an
/// equivalent request whose body can still be read.
///
/// At most `limit` bytes of body are buffered. The returned request carries
/// the buffered bytes, so the downstream handler observes exactly what the
/// client sent.
///
/// # Errors
///
/// [`DumpError::TooLarge`] once the body passes `limit`, and
/// [`DumpError::Body`] if the body stream fails.
pub async fn dump_request(request: Request, limit: usize) -> Result<(String, Request), DumpError> {
    let (parts, body) = request.into_parts();
    let bytes = read_body(body, limit).await?;

    let mut dump = render_head(&parts);
    dump.push_str(&String::from_utf8_lossy(&bytes));

    Ok((dump, Request::from_parts(parts, Body::from(bytes))))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, DumpError> {
    let mut stream = body.into_data_stream();
    let mut buffered = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buffered.len() + chunk.len() > limit {
            return Err(DumpError::TooLarge { limit });
        }
        buffered.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffered))
}

fn render_head(parts: &Parts) -> String {
    let mut head = String::new();
    let _ = write!(head, "{} {} {:?}\r\n", parts.method, parts.uri, parts.version);
    for (name, value) in &parts.headers {
        let _ = write!(
            head,
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        );
    }
    head.push_str("\r\n");
    head
}

/// Log a dump of the request at debug level, then run the rest of the chain.
///
/// The body is only buffered when debug logging is enabled. A body over the
/// limit is answered with 413, the same answer the body extractors give when
/// debug logging is off. A body that fails to read is answered with 500.
/// Either way the request never reaches the handler.
pub async fn log_request(State(limit): State<usize>, request: Request, next: Next) -> Response {
    if !tracing::enabled!(Level::DEBUG) {
        return next.run(request).await;
    }

    match dump_request(request, limit).await {
        Ok((dump, request)) => {
            debug!(request = %dump, "Received request");
            next.run(request).await
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::Method;

    use super::*;

    #[tokio::test]
    async fn test_dump_renders_wire_format() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/person")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"firstName":"A"}"#))
            .unwrap();

        let (dump, _) = dump_request(request, 1024).await.unwrap();

        assert_eq!(
            dump,
            "POST /person HTTP/1.1\r\ncontent-type: application/json\r\n\r\n{\"firstName\":\"A\"}"
        );
    }

    #[tokio::test]
    async fn test_dump_preserves_body_for_downstream() {
        let request = Request::builder()
            .uri("/echo")
            .body(Body::from("payload"))
            .unwrap();

        let (_, request) = dump_request(request, 1024).await.unwrap();

        let bytes = to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }

    #[tokio::test]
    async fn test_dump_rejects_oversized_body() {
        let request = Request::builder()
            .uri("/echo")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();

        let err = dump_request(request, 16).await.unwrap_err();
        assert!(matches!(err, DumpError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_dump_accepts_body_at_limit() {
        let request = Request::builder()
            .uri("/echo")
            .body(Body::from(vec![b'x'; 16]))
            .unwrap();

        let (dump, _) = dump_request(request, 16).await.unwrap();
        assert!(dump.ends_with(&"x".repeat(16)));
    }
}
