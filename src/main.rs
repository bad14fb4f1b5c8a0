use std::sync::Arc;

use anyhow::Context;

use whatsapp_assist::cache::RedisCache;
use whatsapp_assist::channels::EvolutionDispatcher;
use whatsapp_assist::config::AppConfig;
use whatsapp_assist::conversation::TransitionEngine;
use whatsapp_assist::llm::create_provider;
use whatsapp_assist::pipeline::{ReplyGenerator, WebhookProcessor};
use whatsapp_assist::server::{AppState, app_routes};
use whatsapp_assist::store::{ConversationStore, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  See .env.example for the required variables.");
        std::process::exit(1);
    });

    eprintln!("WhatsApp Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Relay instance: {}", config.relay.instance);
    eprintln!(
        "   Webhook: http://{}:{}/webhook\n",
        config.server.bind_addr, config.server.port
    );

    // One client for every outbound call, with a finite timeout
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn ConversationStore> = Arc::new(
        LibSqlBackend::connect(&config.database)
            .await
            .context("failed to open conversation store")?,
    );
    let cache = Arc::new(
        RedisCache::connect(&config.cache)
            .await
            .context("failed to connect to Redis")?,
    );
    let llm = create_provider(&config.llm, http.clone());
    let dispatcher = Arc::new(EvolutionDispatcher::new(http, &config.relay));

    let processor = Arc::new(WebhookProcessor::new(
        store.clone(),
        cache,
        TransitionEngine::with_leave_triggers(&config.leave_trigger_words),
        ReplyGenerator::new(llm, config.assistant_name.clone()),
        dispatcher,
    ));

    let app = app_routes(AppState::new(processor, store));

    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "Webhook server started");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
