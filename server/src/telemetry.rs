//! Console logging plus optional OpenTelemetry export, and the per-request
//! HTTP span.
//!
//! If `OTEL_EXPORTER_OTLP_ENDPOINT` is set and reachable, traces and logs are
//! sent to the collector as well. Otherwise only the fmt layer is installed.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::Router;
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const DEFAULT_SERVICE_NAME: &str = "recipes-server";

/// Requests to these routes get a trace-level span and no completion log.
const QUIET_PATHS: &[&str] = &["/ping"];

/// Keeps the OTLP providers alive. Call `shutdown` before exiting so batched
/// spans and logs are flushed.
#[derive(Default)]
pub struct TelemetryGuard {
    providers: Option<(SdkTracerProvider, SdkLoggerProvider)>,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        if let Some((traces, logs)) = self.providers {
            if let Err(e) = traces.shutdown() {
                eprintln!("failed to shut down trace provider: {e}");
            }
            if let Err(e) = logs.shutdown() {
                eprintln!("failed to shut down log provider: {e}");
            }
        }
    }
}

fn collector_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

pub fn init_telemetry() -> anyhow::Result<TelemetryGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let Some(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
        tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only");
        return Ok(TelemetryGuard::default());
    };

    if !collector_reachable(&endpoint) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
        tracing::info!(
            "OpenTelemetry endpoint {} not reachable, using console logging only",
            endpoint
        );
        return Ok(TelemetryGuard::default());
    }

    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.clone())
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;
    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();
    let tracer = trace_provider.tracer(DEFAULT_SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(trace_provider.clone());

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;
    let log_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(OpenTelemetryTracingBridge::new(&log_provider))
        .try_init()?;

    tracing::info!(
        "OpenTelemetry enabled, exporting traces and logs to {} as {}",
        endpoint,
        service_name
    );

    Ok(TelemetryGuard {
        providers: Some((trace_provider, log_provider)),
    })
}

fn request_span<B>(request: &Request<B>) -> Span {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or(request.uri().path());

    if QUIET_PATHS.contains(&path) {
        tracing::trace_span!("http_request")
    } else {
        tracing::info_span!("http_request", method = %request.method(), path = %path)
    }
}

fn log_response<B>(response: &Response<B>, latency: Duration, span: &Span) {
    if span.metadata().map(|m| *m.level()) == Some(Level::TRACE) {
        return;
    }
    let status = response.status().as_u16();
    let latency_ms = latency.as_millis();
    if status >= 500 {
        tracing::error!(status, %latency_ms, "request failed with server error");
    } else {
        tracing::info!(status, %latency_ms, "request completed");
    }
}

fn log_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    tracing::error!(%error, latency_ms = %latency.as_millis(), "request failed");
}

/// Wrap `router` so every request runs in an `http_request` span and its
/// outcome is logged.
pub fn with_http_tracing(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(request_span::<Body>)
            .on_request(())
            .on_response(log_response::<Body>)
            .on_failure(log_failure),
    )
}
