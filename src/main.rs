use oceanwatch::{app, config::AppConfig, config::AppEnv, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "oceanwatch=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(config.env == AppEnv::Production);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let port = config.port;
    let state = AppState::init(config).await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let db = state.db.clone();
    let app = app::build_app(state);
    app::serve(app, port).await?;

    // Graceful shutdown already drained in-flight requests; now release the pool.
    db.close().await;
    tracing::info!("server closed");

    Ok(())
}
