use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kiosk_backend::{
    config::AppConfig,
    db,
    delivery::{MailTransport, SmtpMailTransport},
    matcher::ExactMatcher,
    routes,
    s3::build_client,
    state::AppState,
    storage::S3Storage,
    store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(
        component = "api",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        drive_api_key = config.google_api_key.is_some(),
        "loaded kiosk configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let applied = db::run_migrations(&pool)?;
    info!(applied, "database migrations applied");

    let s3_client = build_client(&config).await?;
    let storage = Arc::new(S3Storage::new(s3_client, config.s3_bucket.clone()));
    let mailer = build_mailer(&config);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("SERVER_HOST and SERVER_PORT must form a socket address")?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        config,
        storage,
        Arc::new(ExactMatcher),
        mailer,
    )?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "kiosk backend listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_mailer(config: &AppConfig) -> Option<Arc<dyn MailTransport>> {
    if let Err(err) = config.mail.validate() {
        warn!(error = %err.message(), "mail delivery disabled");
        return None;
    }
    match SmtpMailTransport::from_config(&config.mail) {
        Ok(transport) => Some(Arc::new(transport)),
        Err(err) => {
            warn!(error = %err, "failed to build mail transport");
            None
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
