use std::sync::Arc;

use certifica::{config, state, storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certifica=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    storage::ensure_dir(&config.certificates_dir)?;

    let state = Arc::new(state::AppState::new(config.clone())?);
    tracing::info!(
        "Payload cipher {} ready, writing certificates to {}",
        state.cipher.profile(),
        config.certificates_dir.display()
    );

    let app = certifica::app(state);

    let addr = config.bind_addr();
    tracing::info!("Certifica listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
