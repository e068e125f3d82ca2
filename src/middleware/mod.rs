//! Composable request/response middleware.
//!
//! A [`Middleware`] turns a [`Handler`] into another [`Handler`]. A
//! [`Middlewares`] chain wraps a terminal handler so that the first unit in
//! the chain is the outermost wrapper:
//!
//! ```text
//! [m0, m1, m2].wrap(h) == m0(m1(m2(h)))
//!
//! Request  → m0 → m1 → m2 → h
//! Response ← m0 ← m1 ← m2 ← h
//! ```
//!
//! # Standard Chain
//!
//! ```text
//! Request → Recover → Metrics → Log Response → Log Request → Handler
//!              ↓          ↓            ↓              ↓
//!          500 on panic  gauge +   status/duration  debug dump
//!                        counter       (info)
//! ```
//!
//! Units are plain `async fn(Request, Next) -> Response` functions lifted with
//! [`axum::middleware::from_fn`]; any other tower [`Layer`] can be lifted with
//! [`Middleware::from_layer`].

pub mod log_request;
pub mod log_response;
pub mod metrics;
pub mod recorder;
pub mod recover;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

pub use log_request::{DumpError, dump_request};
pub use recorder::Recorder;

use crate::metrics::HttpMetrics;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A type-erased request handler.
pub type Handler = BoxCloneSyncService<Request, Response, Infallible>;

/// A function from [`Handler`] to [`Handler`].
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    wrap: Arc<dyn Fn(Handler) -> Handler + Send + Sync>,
}

impl Middleware {
    /// Create a middleware from a handler transformer.
    pub fn new<F>(name: &'static str, wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self {
            name,
            wrap: Arc::new(wrap),
        }
    }

    /// Lift a tower [`Layer`] into a middleware.
    pub fn from_layer<L>(name: &'static str, layer: L) -> Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(name, move |inner| BoxCloneSyncService::new(layer.layer(inner)))
    }

    /// Contain panics raised by inner handlers. See [`recover::recover`].
    pub fn recover() -> Self {
        Self::from_layer("recover", from_fn(recover::recover))
    }

    /// Record in-flight and completion metrics into `registry`.
    /// See [`metrics::track_metrics`].
    pub fn metrics(registry: Arc<HttpMetrics>) -> Self {
        Self::from_layer("metrics", from_fn_with_state(registry, metrics::track_metrics))
    }

    /// Dump every inbound request at debug level, buffering at most
    /// `body_limit` bytes of body. See [`log_request::log_request`].
    pub fn log_request(body_limit: usize) -> Self {
        Self::from_layer(
            "log_request",
            from_fn_with_state(body_limit, log_request::log_request),
        )
    }

    /// Log status and duration of every response. See [`log_response::log_response`].
    pub fn log_response() -> Self {
        Self::from_layer("log_response", from_fn(log_response::log_response))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wrap `handler`.
    pub fn apply(&self, handler: Handler) -> Handler {
        (self.wrap)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}

/// An ordered middleware chain; the first unit is the outermost wrapper.
#[derive(Clone, Default, Debug)]
pub struct Middlewares {
    units: Vec<Middleware>,
}

impl Middlewares {
    /// An empty chain. Wrapping with it leaves the handler's behaviour unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain every route is served through: recover, metrics, log response, log request.
    pub fn standard(registry: Arc<HttpMetrics>, body_limit: usize) -> Self {
        Self::new()
            .with(Middleware::recover())
            .with(Middleware::metrics(registry))
            .with(Middleware::log_response())
            .with(Middleware::log_request(body_limit))
    }

    /// Append `middleware` as the innermost unit so far.
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.units.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Wrap `handler` so requests traverse the chain front to back.
    ///
    /// The chain holds no per-handler state, so one chain can wrap any number
    /// of handlers independently.
    pub fn wrap<S>(&self, handler: S) -> Handler
    where
        S: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse + 'static,
        S::Future: Send + 'static,
    {
        let terminal = BoxCloneSyncService::new(
            handler.map_response(|response: S::Response| response.into_response()),
        );

        self.units
            .iter()
            .rev()
            .fold(terminal, |inner, middleware| middleware.apply(inner))
    }
}

impl FromIterator<Middleware> for Middlewares {
    fn from_iter<I: IntoIterator<Item = Middleware>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Middlewares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.units.iter().map(Middleware::name).collect();
        f.write_str(&names.join(" -> "))
    }
}
