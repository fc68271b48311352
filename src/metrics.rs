//! Prometheus metrics for hybrid retrieval.
//!
//! Exposes:
//! - `atlas_grag_retrieval_duration_seconds` (histogram by mode)
//! - `atlas_grag_retrieval_total` (counter by mode)
//! - `atlas_grag_stage_degraded_total` (counter by stage)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static RETRIEVAL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 10ms up to ~80 seconds.
    let buckets =
        prometheus::exponential_buckets(0.01, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "atlas_grag_retrieval_duration_seconds",
        "Hybrid retrieval duration in seconds",
        &["mode"],
        buckets
    )
    .expect("failed to register retrieval duration histogram")
});

static RETRIEVAL_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "atlas_grag_retrieval_total",
        "Total retrieval calls by mode",
        &["mode"]
    )
    .expect("failed to register retrieval counter")
});

static STAGE_DEGRADED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "atlas_grag_stage_degraded_total",
        "Retrieval stages that fell back to an empty result",
        &["stage"]
    )
    .expect("failed to register degraded stage counter")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&RETRIEVAL_DURATION);
    Lazy::force(&RETRIEVAL_TOTAL);
    Lazy::force(&STAGE_DEGRADED);
}

/// Record a finished retrieval call.
pub fn record_retrieval(mode: &'static str, duration: Duration) {
    init_collectors();
    RETRIEVAL_DURATION
        .with_label_values(&[mode])
        .observe(duration.as_secs_f64());
    RETRIEVAL_TOTAL.with_label_values(&[mode]).inc();
}

/// Record a stage that degraded to an empty result.
pub fn record_degraded(stage: &'static str) {
    init_collectors();
    STAGE_DEGRADED.with_label_values(&[stage]).inc();
}

/// Current degrade count for a stage.
pub fn degraded_count(stage: &'static str) -> u64 {
    init_collectors();
    STAGE_DEGRADED.with_label_values(&[stage]).get()
}

fn plain_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ));
    }

    let mut response = plain_response(StatusCode::OK, Bytes::from(buffer));
    if let Ok(content_type) = hyper::header::HeaderValue::from_str(encoder.format_type()) {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
