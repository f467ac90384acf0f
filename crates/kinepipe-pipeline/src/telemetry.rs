//! Diagnostics for a pipeline run.
//!
//! stdout belongs to the run summary the user reads, so every log line goes
//! to stderr.  Each executed stage opens a `stage` span (see
//! [`StageSelector::execute`][crate::selector::StageSelector::execute]); with
//! a collector configured, those spans are shipped over OTLP/HTTP so a
//! multi-hour calibration-to-kinematics run can be inspected stage by stage.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Filter directives, `info` when unset. |
//! | `KINEPIPE_LOG_FORMAT` | `json` for one JSON object per line, anything else for compact text. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Collector URL; no spans leave the process without it. |
//!
//! ```rust,no_run
//! let _telemetry = kinepipe_pipeline::init_tracing("kinepipe");
//! // ... run stages; pending spans are flushed when `_telemetry` drops.
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the stderr log format.
pub const LOG_FORMAT_ENV: &str = "KINEPIPE_LOG_FORMAT";

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `json` (any case) picks JSON; an unset or unrecognised value keeps the
    /// compact text format.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Install the process-wide subscriber for the binary named `service_name`.
///
/// Call once, before the first stage runs.  Keep the returned guard alive for
/// the whole run.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_setting(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    let provider = std::env::var(OTLP_ENDPOINT_ENV)
        .ok()
        .and_then(|endpoint| span_exporter(service_name, endpoint));
    let spans = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(service_name.to_string())));

    let subscriber = tracing_subscriber::registry().with(filter).with(spans);
    match format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }

    TracerProviderGuard(provider)
}

/// Flushes exported stage spans when dropped.  Holds nothing when no
/// collector is configured.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when stage spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("kinepipe: could not flush stage spans: {e}");
        }
    }
}

/// A span pipeline to `endpoint`, or `None` (after a note on stderr) if the
/// exporter rejects the configuration.  A failed collector never stops a run.
fn span_exporter(service_name: &str, endpoint: String) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("kinepipe: span export disabled: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Stages run on the main thread with no async runtime, so export inline.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}
