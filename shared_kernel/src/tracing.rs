use opentelemetry::global;
use opentelemetry::sdk::propagation::BaggagePropagator;
use opentelemetry::sdk::propagation::TextMapCompositePropagator;
use opentelemetry::sdk::propagation::TraceContextPropagator;
use opentelemetry::sdk::trace;
use opentelemetry::sdk::Resource;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

const LOG_FORMAT_VAR: &str = "LOG_FORMAT";
const OTLP_EXPORTER_VAR: &str = "OTLP_EXPORTER_ENABLED";

/// Installs the global subscriber. Lines are human readable unless
/// `LOG_FORMAT=json`; spans are exported over OTLP only when
/// `OTLP_EXPORTER_ENABLED` is set, since the job usually runs without a collector.
pub fn config_telemetry(service_name: &'static str) {
    // Needed to forward ordinary log statements (lettre, reqwest) to our tracing subscriber.
    tracing_log::LogTracer::init().expect("Failed to initialize log tracer");

    let json_output = std::env::var(LOG_FORMAT_VAR)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let json_layer = json_output.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_names(true)
    });
    let plain_layer = (!json_output).then(|| fmt::layer().with_target(false));

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer);

    let otel_layer = std::env::var(OTLP_EXPORTER_VAR).ok().map(|_| {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_env())
            .with_trace_config(trace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", service_name),
            ])))
            .install_batch(opentelemetry::runtime::TokioCurrentThread)
            .expect("Failed to initialize otlp tracer.");
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing::subscriber::set_global_default(subscriber.with(otel_layer))
        .expect("Failed to install `tracing` subscriber");

    let composite_propagator = TextMapCompositePropagator::new(vec![
        Box::new(BaggagePropagator::new()),
        Box::new(TraceContextPropagator::new()),
    ]);
    global::set_text_map_propagator(composite_propagator);
}

pub fn shutdown_global_tracer_provider() {
    global::shutdown_tracer_provider();
}
