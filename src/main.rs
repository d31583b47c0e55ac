use anyhow::Context;
use crop_predictor::{router, ModelStore, Predictor, ServiceConfig, ServiceContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    let addr = config.bind_addr()?;

    let store = ModelStore::new(&config.model_dir);
    tracing::info!("model path: {}", store.model_path().display());
    tracing::info!("scaler path: {}", store.scaler_path().display());

    // Artifacts are loaded (or trained) before the listener accepts anything.
    let ctx = ServiceContext::new();
    let training = config.training.clone();
    let loaded = tokio::task::spawn_blocking(move || store.load_or_train(&training))
        .await
        .context("model loading task panicked")?;
    match loaded {
        Ok(artifacts) => {
            tracing::info!(
                "loaded model ({} trees) and scaler",
                artifacts.model.n_trees()
            );
            ctx.install(Predictor::from_artifacts(artifacts));
        }
        Err(e) => tracing::error!("error loading model files: {}; serving degraded", e),
    }

    let app = router(ctx);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
