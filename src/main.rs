use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use comic_reader::config::Settings;
use comic_reader::openapi::ApiDoc;
use comic_reader::rate_limit::{InMemoryRateLimiter, RateLimiterFacade};
use comic_reader::repo::Repo;
use comic_reader::storage::build_media_store;
use comic_reader::{config, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // .env is a development convenience; deployments set the environment directly
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };
    info!("Bootstrapping comic reader");
    info!("Frontend URL: {}", settings.frontend_url.as_deref().unwrap_or("(none)"));
    info!("Languages: default={} supported={:?}", settings.locale.default_language, settings.locale.supported);

    let repo = match build_repo(&settings).await {
        Ok(r) => r,
        Err(e) => {
            error!("repository init failed: {e:#}");
            std::process::exit(1);
        }
    };
    let media_store = match build_media_store(&settings.data_dir).await {
        Ok(s) => s,
        Err(e) => {
            error!("media store init failed: {e:#}");
            std::process::exit(1);
        }
    };

    let limiter = RateLimiterFacade::new(
        InMemoryRateLimiter::new(settings.rate_limit_enabled),
        settings.rate_limits.clone(),
    );
    let state = AppState::from_settings(repo, media_store, &settings).with_rate_limiter(limiter);
    let openapi = ApiDoc::openapi();
    info!("OpenAPI document generated");

    let frontend = settings.frontend_url.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);
        if let Some(front) = frontend.as_deref() {
            cors = cors.allowed_origin(front);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(settings.bind_addr.as_str())?;

    info!("Listening on http://{}", settings.bind_addr);
    server.run().await
}

#[cfg(feature = "postgres-store")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use anyhow::Context;
    use comic_reader::repo::pg::PgRepo;
    use sqlx::postgres::PgPoolOptions;

    let url = settings.database_url.as_deref().context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
    let repo = PgRepo::new(pool);
    repo.migrate().await?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use comic_reader::repo::inmem::InMemRepo;

    let path = std::path::Path::new(&settings.data_dir).join("state.json");
    info!("Using in-memory repository backend (snapshot {})", path.display());
    Ok(Arc::new(InMemRepo::with_snapshot(path)))
}
