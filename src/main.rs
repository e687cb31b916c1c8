use clap::Parser;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use repo_growth::infrastructures::adapters::primary::cli;
use repo_growth::infrastructures::config::{AppConfig, Cli};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() -> anyhow::Result<Option<SdkTracerProvider>> {
    // Spans are only exported when a collector is configured
    let provider = if env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create OTLP exporter: {}", e))?;
        Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(otlp_exporter)
                .build(),
        )
    } else {
        None
    };

    let telemetry = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("repo-growth")));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(telemetry)
        .with(fmt_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::try_from(Cli::parse())?;
    let provider = init_tracing()?;

    let result = {
        info_span!("initialize").in_scope(|| {
            info!(
                concurrency = config.concurrency,
                api_url = %config.github_api_url,
                "Application starting"
            );
        });

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling remaining lookups");
                on_interrupt.cancel();
            }
        });

        cli::run(config, cancel).await
    };

    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to flush traces: {e}");
        }
    }

    result
}
