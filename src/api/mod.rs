//! HTTP API serving usage data to the dashboard widget
//!
//! Every route is a GET under `<base_url>/climb-usage-extension/<suffix>`:
//!
//! ```text
//! get-example     {data}
//! get-env         {user, group}
//! limits          {max_memory, cpu_limit}
//! current-memory  {value}
//! cpu-usage       {value}
//! resources       {memory_now, cpu_now, memory_max, cpus}
//! disk-usage      [{label, id_prefix, data: {total, used, free, percent}}]
//! has-gpu         {has_gpu}
//! gpu-info        {name}
//! gpu-stats       {name, utilization_gpu, utilization_memory, memory_used, memory_total}
//! metrics         Prometheus text format
//! ```

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, MethodRouter};
use axum::Router;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use self::auth::require_auth;
use self::handlers::*;
use crate::metrics::{REQUESTS_TOTAL, REQUEST_DURATION, REQUEST_ERRORS_TOTAL};
use crate::usage::UsageSampler;

pub use self::error::ApiError;

/// Path segment all routes are mounted under
pub const NAMESPACE: &str = "climb-usage-extension";

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    /// The one sampler for this process (owns the shared CPU window)
    pub sampler: Arc<UsageSampler>,
    /// Token required on every request (None disables auth)
    pub auth_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(sampler: UsageSampler, auth_token: Option<String>) -> Self {
        Self {
            sampler: Arc::new(sampler),
            auth_token: auth_token.map(Arc::from),
        }
    }
}

/// Route table: path suffix → handler
pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("get-example", get(get_example)),
        ("get-env", get(get_env)),
        ("limits", get(get_limits)),
        ("current-memory", get(get_current_memory)),
        ("cpu-usage", get(get_cpu_usage)),
        ("resources", get(get_resources)),
        ("disk-usage", get(get_disk_usage)),
        ("has-gpu", get(get_has_gpu)),
        ("gpu-info", get(get_gpu_info)),
        ("gpu-stats", get(get_gpu_stats)),
        ("metrics", get(get_metrics)),
    ]
}

/// Join URL path segments with exactly one `/` between them and a leading `/`
///
/// `url_path_join("/user/jdoe/", "climb-usage-extension", "limits")` →
/// `/user/jdoe/climb-usage-extension/limits`
pub fn url_path_join(base: &str, namespace: &str, suffix: &str) -> String {
    let mut path = String::from("/");
    for segment in [base, namespace, suffix] {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment);
    }
    path
}

/// Build the API router with all routes, request tracking and auth.
pub fn router(state: AppState, base_url: &str) -> Router {
    let mut router = Router::new();
    for (suffix, handler) in routes() {
        router = router.route(&url_path_join(base_url, NAMESPACE, suffix), handler);
    }

    router
        .layer(from_fn_with_state(state.clone(), require_auth))
        // Outermost, so rejected requests are counted too
        .layer(from_fn(track_request))
        .with_state(state)
}

/// Per-request span, request counters and latency histogram.
async fn track_request(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| path.as_str().rsplit('/').next())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "request",
        request_id = %Uuid::now_v7(),
        endpoint = %endpoint,
    );

    async move {
        let start = Instant::now();
        REQUESTS_TOTAL.with_label_values(&[&endpoint]).inc();

        let response = next.run(request).await;

        let elapsed = start.elapsed();
        REQUEST_DURATION
            .with_label_values(&[&endpoint])
            .observe(elapsed.as_secs_f64());
        if response.status().is_server_error() {
            REQUEST_ERRORS_TOTAL.with_label_values(&[&endpoint]).inc();
        }

        debug!(
            status = response.status().as_u16(),
            elapsed_us = elapsed.as_micros() as u64,
            "Request handled"
        );
        response
    }
    .instrument(span)
    .await
}
