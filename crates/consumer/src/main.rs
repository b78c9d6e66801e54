use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use relay_common::config::AppConfig;
use relay_consumer::consumer::Consumer;
use relay_consumer::queue::SqsQueue;
use relay_dispatcher::dispatcher::ActionDispatcher;
use relay_dispatcher::outcome::OutcomeNotifier;
use relay_dispatcher::pipeline::Pipeline;
use relay_notifier::SmtpNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing: RUST_LOG wins, otherwise LOG_LEVEL for our crates
    let level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "relay_consumer={level},relay_dispatcher={level},relay_notifier={level}"
            ))
        }))
        .json()
        .init();

    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing::info!("Incident relay consumer starting...");

    let config = AppConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    let root = tracing::info_span!("relay", queue = %config.queue.queue_name);

    tracing::info!(
        queue = %config.queue.queue_name,
        region = %config.queue.region,
        "Subscribing to queue"
    );
    let queue = SqsQueue::connect(&config.queue).await?;

    let notifier =
        SmtpNotifier::new(&config.smtp).with_span(tracing::info_span!(parent: &root, "notifier"));
    let dispatcher = ActionDispatcher::new(&config.dispatch)?
        .with_span(tracing::info_span!(parent: &root, "dispatcher"));
    let outcome = OutcomeNotifier::new(Arc::new(notifier))
        .with_span(tracing::info_span!(parent: &root, "outcome"));

    let consumer = Consumer::new(
        queue,
        Pipeline::new(dispatcher, outcome),
        config.queue.receive_error_backoff,
    )
    .with_span(tracing::info_span!(parent: &root, "consumer"));

    // Run until Ctrl+C; an in-flight message is redelivered after its visibility timeout
    tokio::select! {
        _ = consumer.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("Incident relay consumer stopped.");
    Ok(())
}
