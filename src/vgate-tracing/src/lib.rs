use anyhow::Result;
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_stdout::SpanExporter;
use std::borrow::Cow;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{prelude::*, Registry};

/// Where finished spans go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanExport {
    Off,
    Stdout,
    Otlp(String),
}

impl SpanExport {
    /// `""` turns export off, `"stdout"` prints spans, anything else is an
    /// OTLP/HTTP endpoint.
    pub fn from_endpoint(endpoint: &str) -> Self {
        match endpoint.trim() {
            "" => SpanExport::Off,
            "stdout" => SpanExport::Stdout,
            url => SpanExport::Otlp(url.to_string()),
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Plain,
    Pretty,
    Json,
}

/// Flushes and shuts the tracer provider down when dropped.
#[must_use = "dropping the guard stops span export"]
pub struct TracingGuard {
    provider: Option<sdktrace::SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("tracer provider shutdown failed: {e}");
            }
        }
    }
}

fn provider(service_name: &str, export: &SpanExport) -> Result<Option<sdktrace::SdkTracerProvider>> {
    let resource = Resource::builder()
        .with_service_name(Cow::Owned(service_name.to_string()))
        .with_attributes(vec![KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build();

    let provider = match export {
        SpanExport::Off => return Ok(None),
        SpanExport::Otlp(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint.as_str())
                .build()?;

            sdktrace::SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(resource)
                .build()
        }
        SpanExport::Stdout => sdktrace::SdkTracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_resource(resource)
            .build(),
    };
    Ok(Some(provider))
}

/// Install the global subscriber: `EnvFilter` from `filter`, a fmt layer on
/// stderr, and an OpenTelemetry layer when spans are exported.
pub fn init(service_name: &str, export: SpanExport, filter: &str, format: Format) -> Result<TracingGuard> {
    let provider = provider(service_name, &export)?;
    let otel_layer = provider
        .as_ref()
        .map(|p| OpenTelemetryLayer::new(p.tracer(Cow::Owned(service_name.to_string()))));

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    // Boxed so the three layouts unify.
    let fmt_layer: Box<dyn tracing_subscriber::Layer<Registry> + Send + Sync> = match format {
        Format::Json => Box::new(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_filter(filter),
        ),
        Format::Pretty => Box::new(fmt::layer().pretty().with_writer(std::io::stderr).with_filter(filter)),
        Format::Plain => Box::new(fmt::layer().with_writer(std::io::stderr).with_filter(filter)),
    };

    let subscriber = Registry::default().with(fmt_layer).with(otel_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(TracingGuard { provider })
}
