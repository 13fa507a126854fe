use crate::metrics::{MetricsCollector, RequestTimer};
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reject::Rejection;
use warp::reply::Response;
use warp::Filter;

struct RequestContext {
    path: String,
    method: Method,
    timer: RequestTimer,
}

/// Wraps a route tree with request logging and request metrics.
pub fn with_request_logging<F>(
    filter: F,
    metrics: MetricsCollector,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(move |path: FullPath, method: Method| {
            tracing::debug!(path = %path.as_str(), method = %method, "incoming request");
            RequestContext {
                path: path.as_str().to_string(),
                method,
                timer: RequestTimer::new(metrics.clone()),
            }
        })
        .and(filter)
        .map(|ctx: RequestContext, response: Response| {
            let status = response.status();
            let failed = status.is_client_error() || status.is_server_error();
            let duration_ms = ctx.timer.finish(failed);
            log_response(status, &ctx.path, ctx.method.as_str(), duration_ms);
            response
        })
}

pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u64) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(status = code, path, method, duration_ms, "server error");
    } else if status.is_client_error() {
        tracing::warn!(status = code, path, method, duration_ms, "client error");
    } else {
        tracing::info!(status = code, path, method, duration_ms, "response sent");
    }
}
