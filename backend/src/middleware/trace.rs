//! Request trace identifiers.
//!
//! Every request runs inside a task-local [`TraceId`]. A caller may supply
//! one through the `trace-id` request header (load generators do this to
//! correlate a burst of claims); otherwise a fresh UUID is minted. The id is
//! recorded on the `http_request` span, copied into domain errors, and echoed
//! back in the `trace-id` response header.
//!
//! Task-locals do not follow `tokio::spawn`. Wrap spawned work in
//! [`TraceId::scope`] when it should keep the caller's id.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tokio::task_local;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

/// Header carrying the trace identifier, inbound and outbound.
pub const TRACE_ID_HEADER: &str = "trace-id";

task_local! {
    static CURRENT: TraceId;
}

/// Identifier correlating one HTTP request with its logs and error payload.
///
/// # Examples
/// ```
/// use seckill::middleware::trace::TraceId;
///
/// let id: TraceId = "3f2c1a8e-0b7d-4c55-9a61-2d4f0e6b7c90".parse().unwrap_or_default();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceId(Uuid);

impl TraceId {
    fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identifier of the request currently being served, if any.
    pub fn current() -> Option<Self> {
        CURRENT.try_with(|id| *id).ok()
    }

    /// Run `fut` with `trace_id` as the current identifier.
    pub async fn scope<Fut: Future>(trace_id: Self, fut: Fut) -> Fut::Output {
        CURRENT.scope(trace_id, fut).await
    }

    /// Reuse a well-formed inbound header, or mint a new id.
    fn for_request(req: &ServiceRequest) -> Self {
        let Some(raw) = req.headers().get(TRACE_ID_HEADER) else {
            return Self::mint();
        };
        match raw.to_str().ok().and_then(|value| value.parse().ok()) {
            Some(id) => id,
            None => {
                debug!("ignoring malformed inbound trace id");
                Self::mint()
            }
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Middleware factory installing a [`TraceId`] around each request.
///
/// ```
/// use actix_web::App;
/// use seckill::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, inner: S) -> Self::Future {
        ready(Ok(TraceService { inner }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceService<S> {
    inner: S,
}

impl<S, B> Service<ServiceRequest> for TraceService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = TraceId::for_request(&req);
        let span = info_span!(
            "http_request",
            %trace_id,
            method = %req.method(),
            path = %req.path(),
        );
        let pending = self.inner.call(req);
        let traced = async move {
            let mut response = pending.await?;
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(error) => warn!(%error, "trace id is not a valid header value"),
            }
            Ok(response)
        };
        Box::pin(TraceId::scope(trace_id, traced.instrument(span)))
    }
}
