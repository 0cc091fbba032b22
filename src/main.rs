use actix_web::{middleware::Compress, App, HttpServer};
use utoipa_swagger_ui::SwaggerUi;

use blacklist::app_config::AppConfig;
use blacklist::openapi::ApiDoc;
use blacklist::rate_limit::RateLimiterFacade;
use blacklist::render::{ChatSink, LogSink, RelaySink};
use blacklist::repo::Repo;
use blacklist::{config, AppState, Lifecycle};
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars()?;

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping blacklist service");
    let cfg = AppConfig::from_env();

    #[cfg(all(feature = "file-store", not(feature = "postgres-store")))]
    let repo: Arc<dyn Repo> = {
        let repo = blacklist::repo::file::FileRepo::open(&cfg.data_dir)?;
        info!("Using JSON file repository backend at {}", cfg.data_dir.display());
        Arc::new(repo)
    };

    #[cfg(feature = "postgres-store")]
    let repo: Arc<dyn Repo> = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = cfg
            .database_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_lazy(&db_url)?;
        let repo = blacklist::repo::pg::PgRepo::new(pool);
        repo.migrate().await?;
        info!("Using Postgres repository backend");
        Arc::new(repo)
    };

    let sink: Arc<dyn ChatSink> = match cfg.chat_relay_url.as_deref() {
        Some(url) => {
            info!("Rendering through chat relay at {url}");
            Arc::new(RelaySink::new(url)?)
        }
        None => {
            info!("No CHAT_RELAY_URL, rendering payloads to the log only");
            Arc::new(LogSink)
        }
    };

    let settings = repo.get_settings().await?;
    info!("Bot set up: {}, error webhook: {}", settings.is_set_up(), settings.error_webhook_url.is_some());

    let service = Arc::new(Lifecycle::new(repo, sink, cfg.lifecycle.clone()));
    let state = AppState::new(service, Some(RateLimiterFacade::from_env()));

    let openapi = ApiDoc::openapi();
    info!("OpenAPI document generated");

    let bind_addr = cfg.bind_addr.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .app_data(actix_web::web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)?;

    info!("Listening on http://{bind_addr}");

    server.run().await?;
    Ok(())
}

/// Validate that required environment variables are set
fn validate_env_vars() -> anyhow::Result<()> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("Missing required environment variable JWT_SECRET"))?;
    if secret.len() < 32 {
        anyhow::bail!("JWT_SECRET must be at least 32 characters long for security");
    }
    Ok(())
}
