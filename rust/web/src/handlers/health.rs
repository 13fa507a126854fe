use crate::metrics::MetricsCollector;
use serde::Serialize;
use warp::reply::Json;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
}

pub fn health() -> Json {
    warp::reply::json(&HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn metrics(metrics: &MetricsCollector) -> Json {
    warp::reply::json(&metrics.snapshot())
}
