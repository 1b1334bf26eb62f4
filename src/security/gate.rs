//! The security gate: an explicit, ordered list of request filters.
//!
//! # Data Flow
//! ```text
//! request
//!     → AuditFilter        (log security-looking paths, always continues)
//!     → OriginFilter       (allow-list in Production Mode, CORS preflight)
//!     → RateLimitFilter    (global window)
//!     → RateLimitFilter    (API window, API prefix only)
//!     → Continue           → route classification
//! ```
//!
//! Each filter returns `Continue` or `Handled(response)`; the first
//! `Handled` ends the chain. Filters may also stage response headers
//! (CORS, `RateLimit-*`) that are merged into whichever response is sent.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EdgeConfig;
use crate::http::request::{client_address, ClientAddress};
use crate::http::response::EdgeRejection;
use crate::observability::metrics;
use crate::routing::PathPrefixMatcher;
use crate::security::audit;
use crate::security::origin::{self, OriginDecision, OriginPolicy};
use crate::security::rate_limit::{FixedWindowLimiter, LimitScope, RateDecision};

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// What a filter sees of the request.
pub struct GateContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub client: &'a str,
    /// Headers to merge into the final response.
    pub response_headers: HeaderMap,
}

impl<'a> GateContext<'a> {
    pub fn new(method: &'a Method, path: &'a str, headers: &'a HeaderMap, client: &'a str) -> Self {
        Self {
            method,
            path,
            headers,
            client,
            response_headers: HeaderMap::new(),
        }
    }
}

/// Outcome of one filter.
#[derive(Debug)]
pub enum Verdict {
    Continue,
    Handled(Response),
}

/// One step of the gate.
pub trait RequestFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &mut GateContext<'_>) -> Verdict;
}

/// Logs security-relevant paths. Never rejects.
pub struct AuditFilter;

impl RequestFilter for AuditFilter {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn check(&self, ctx: &mut GateContext<'_>) -> Verdict {
        if audit::is_security_event(ctx.path) {
            let user_agent = ctx
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok());
            audit::log_security_event(ctx.method.as_str(), ctx.path, ctx.client, user_agent);
        }
        Verdict::Continue
    }
}

/// Enforces the origin allow-list and answers CORS preflights.
pub struct OriginFilter {
    policy: OriginPolicy,
}

impl OriginFilter {
    pub fn new(policy: OriginPolicy) -> Self {
        Self { policy }
    }
}

impl RequestFilter for OriginFilter {
    fn name(&self) -> &'static str {
        "origin"
    }

    fn check(&self, ctx: &mut GateContext<'_>) -> Verdict {
        match self.policy.check(ctx.headers.get(header::ORIGIN)) {
            OriginDecision::NoOrigin => Verdict::Continue,
            OriginDecision::Allowed(value) => {
                origin::cors_headers(value, &mut ctx.response_headers);
                if origin::is_preflight(ctx.method, ctx.headers) {
                    origin::preflight_headers(&mut ctx.response_headers);
                    return Verdict::Handled(StatusCode::NO_CONTENT.into_response());
                }
                Verdict::Continue
            }
            OriginDecision::Rejected(origin) => {
                tracing::warn!(origin = %origin, path = %ctx.path, client = %ctx.client, "Origin not allowed");
                metrics::record_origin_rejected();
                Verdict::Handled(EdgeRejection::OriginNotAllowed { origin }.into_response())
            }
        }
    }
}

/// Charges requests against one fixed-window limiter.
pub struct RateLimitFilter {
    limiter: Arc<FixedWindowLimiter>,
    /// Only requests under this prefix are counted; `None` counts everything.
    only_under: Option<PathPrefixMatcher>,
    /// Exact path never counted (liveness probe).
    exempt_path: String,
}

impl RateLimitFilter {
    pub fn new(limiter: Arc<FixedWindowLimiter>, only_under: Option<PathPrefixMatcher>, exempt_path: String) -> Self {
        Self {
            limiter,
            only_under,
            exempt_path,
        }
    }
}

impl RequestFilter for RateLimitFilter {
    fn name(&self) -> &'static str {
        match self.limiter.scope() {
            LimitScope::Global => "rate_limit_global",
            LimitScope::ApiOnly => "rate_limit_api",
        }
    }

    fn check(&self, ctx: &mut GateContext<'_>) -> Verdict {
        if ctx.path == self.exempt_path {
            return Verdict::Continue;
        }
        if let Some(prefix) = &self.only_under {
            if !prefix.matches_path(ctx.path) {
                return Verdict::Continue;
            }
        }

        let decision = self.limiter.hit(ctx.client, Instant::now());
        let state = decision.state();
        ctx.response_headers.insert(RATELIMIT_LIMIT, HeaderValue::from(state.limit));
        ctx.response_headers.insert(RATELIMIT_REMAINING, HeaderValue::from(state.remaining));
        ctx.response_headers
            .insert(RATELIMIT_RESET, HeaderValue::from(state.retry_after_secs()));

        match decision {
            RateDecision::Allowed(_) => Verdict::Continue,
            RateDecision::Limited(state) => {
                let scope = self.limiter.scope();
                tracing::warn!(client = %ctx.client, scope = scope.as_str(), path = %ctx.path, "Rate limit exceeded");
                metrics::record_rate_limited(scope.as_str());
                Verdict::Handled(
                    EdgeRejection::RateLimited {
                        scope,
                        retry_after_secs: state.retry_after_secs(),
                    }
                    .into_response(),
                )
            }
        }
    }
}

/// Global and API limiters, shared with the background sweeper.
#[derive(Clone)]
pub struct RateLimiters {
    pub global: Arc<FixedWindowLimiter>,
    pub api: Arc<FixedWindowLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &EdgeConfig) -> Self {
        Self {
            global: Arc::new(FixedWindowLimiter::new(LimitScope::Global, config.rate_limit.global)),
            api: Arc::new(FixedWindowLimiter::new(LimitScope::ApiOnly, config.rate_limit.api)),
        }
    }

    pub fn all(&self) -> Vec<Arc<FixedWindowLimiter>> {
        vec![self.global.clone(), self.api.clone()]
    }
}

/// Ordered filter chain run before any routing.
pub struct SecurityGate {
    filters: Vec<Box<dyn RequestFilter>>,
    trust_proxy: bool,
}

impl SecurityGate {
    pub fn new(filters: Vec<Box<dyn RequestFilter>>, trust_proxy: bool) -> Self {
        Self { filters, trust_proxy }
    }

    /// The standard chain: audit, origin, global limit, API limit.
    pub fn from_config(config: &EdgeConfig, limiters: &RateLimiters) -> Self {
        let mut filters: Vec<Box<dyn RequestFilter>> = vec![
            Box::new(AuditFilter),
            Box::new(OriginFilter::new(OriginPolicy::new(
                config.security.allowed_origins.iter().cloned(),
                config.mode,
            ))),
        ];

        if config.rate_limit.enabled {
            let exempt = config.api.liveness_path();
            filters.push(Box::new(RateLimitFilter::new(limiters.global.clone(), None, exempt.clone())));
            filters.push(Box::new(RateLimitFilter::new(
                limiters.api.clone(),
                Some(PathPrefixMatcher::new(config.api.prefix.clone())),
                exempt,
            )));
        }

        Self::new(filters, config.security.trust_proxy)
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order until one handles the request.
    pub fn evaluate(&self, ctx: &mut GateContext<'_>) -> Verdict {
        for filter in &self.filters {
            if let Verdict::Handled(response) = filter.check(ctx) {
                tracing::debug!(filter = filter.name(), status = %response.status(), "Request handled by security gate");
                return Verdict::Handled(response);
            }
        }
        Verdict::Continue
    }
}

fn merge_headers(target: &mut HeaderMap, staged: HeaderMap) {
    for (name, value) in staged.iter() {
        if name == header::VARY {
            target.append(name.clone(), value.clone());
        } else {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Middleware running the [`SecurityGate`].
pub async fn security_gate_middleware(
    State(gate): State<Arc<SecurityGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_address(&request, gate.trust_proxy);

    let (verdict, staged) = {
        let mut ctx = GateContext::new(request.method(), request.uri().path(), request.headers(), &client);
        let verdict = gate.evaluate(&mut ctx);
        (verdict, ctx.response_headers)
    };

    let mut response = match verdict {
        Verdict::Handled(response) => response,
        Verdict::Continue => {
            request.extensions_mut().insert(ClientAddress(client));
            next.run(request).await
        }
    };
    merge_headers(response.headers_mut(), staged);
    response
}
