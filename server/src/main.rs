use parrot_core::api::{self, AppState};
use parrot_core::{
    AppConfig, AudioProbe, AudioStore, ParamResolver, SpeechClient, SynthesisPipeline,
};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,parrot_core=info,parrot_server=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Configuration comes entirely from the environment
    let cfg = AppConfig::default();

    let store = Arc::new(AudioStore::open(cfg.store.clone())?);
    let probe = AudioProbe::new(cfg.probe.clone());
    let resolver = ParamResolver::new(cfg.resolver.clone())?;
    let synthesizer = Arc::new(SpeechClient::new(cfg.synthesis.clone())?);
    let pipeline = Arc::new(SynthesisPipeline::new(
        synthesizer,
        resolver,
        Arc::clone(&store),
        probe,
        cfg.synthesis.default_voice.clone(),
        cfg.synthesis.default_model.clone(),
    ));

    let app = api::router(AppState {
        pipeline,
        store: Arc::clone(&store),
    });

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        target: "server",
        url = %format!("http://{}", addr),
        "Text-to-speech server ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&store)))
        .await?;

    Ok(())
}

async fn shutdown_signal(store: Arc<AudioStore>) {
    signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!(target: "server", "Shutting down...");
    // Pending deferred deletes are cancelled rather than left detached
    store.shutdown();
}
