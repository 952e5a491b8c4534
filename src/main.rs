mod app;
mod auth;
mod config;
mod geoip;
mod openapi;
mod state;
#[cfg(test)]
mod test_support;
mod users;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "geoauth=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    if let Err(e) = auth::jwt::parse_ttl(&config.jwt.ttl) {
        tracing::warn!(error = %e, "JWT_EXPIRATION is invalid; logins will fail until it is fixed");
    }

    let (host, port) = (config.app_host.clone(), config.app_port);
    let app_state = AppState::init(config).await?;

    app::serve(app::build_app(app_state), &host, port).await
}
