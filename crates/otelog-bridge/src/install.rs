//! Subscriber and tracer provider installation.

use crate::bridge::ContextBridge;
use crate::config::BridgeConfig;
use crate::convert::SpanEventConverter;
use crate::layer::BridgeLayer;
use crate::processor::SpanEventProcessor;
use crate::sink::SinkRegistry;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use otelog_core::{Error, Result};
use std::sync::Arc;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Handle to an installed bridge.
#[derive(Debug)]
pub struct Installed {
    bridge: Arc<ContextBridge>,
    provider: TracerProvider,
}

impl Installed {
    pub fn bridge(&self) -> &ContextBridge {
        &self.bridge
    }

    pub fn tracer_provider(&self) -> &TracerProvider {
        &self.provider
    }

    /// Shut down the installed tracer provider, ending span event forwarding.
    pub fn shutdown(self) -> Result<()> {
        self.provider
            .shutdown()
            .map_err(|e| Error::Install(e.to_string()))
    }
}

/// Build the tracer provider for `config`.
///
/// When span event forwarding is enabled the provider carries a
/// [`SpanEventProcessor`] targeting `config.sink_name`.
pub fn build_tracer_provider(
    config: &BridgeConfig,
    registry: &SinkRegistry,
    bridge: Arc<ContextBridge>,
) -> Result<TracerProvider> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    let mut builder = TracerProvider::builder().with_resource(resource);

    if config.forward_span_events {
        let converter = SpanEventConverter::builder()
            .logger_name(config.logger_name.clone())
            .default_level(config.default_level)
            .bridge(bridge)
            .build()?;

        let processor = SpanEventProcessor::builder()
            .converter(converter)
            .target_sink_name(config.sink_name.clone())
            .registry(registry.clone())
            .build()?;

        builder = builder.with_span_processor(processor);
    }

    Ok(builder.build())
}

/// Install the bridge as the global `tracing` subscriber.
///
/// Log events are enriched and written to the sink named by
/// `config.sink_name`; the same sink receives forwarded span events.
/// `tracing` events are not recorded as span events, so each log reaches the
/// sink once. `RUST_LOG` takes precedence over `config.filter`.
///
/// The global tracer provider is only replaced once the subscriber is set.
pub fn install(config: &BridgeConfig, registry: &SinkRegistry) -> Result<Installed> {
    let sink = registry.get(&config.sink_name)?;
    let bridge = Arc::new(config.bridge());

    let provider = build_tracer_provider(config, registry, bridge.clone())?;
    let tracer = provider.tracer("otelog");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let telemetry_layer = tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_filter(filter_fn(|metadata| metadata.is_span()));

    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry_layer)
        .with(BridgeLayer::shared(bridge.clone(), sink))
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Install(e.to_string()))?;

    global::set_tracer_provider(provider.clone());
    tracing::debug!(sink = %config.sink_name, "otelog bridge installed");

    Ok(Installed { bridge, provider })
}
