//! services/api/src/bin/api.rs

use aikido_live_core::{
    CatalogSnapshot, ContainerHandle, DocumentRepository, DocumentStore, EmailNotifier, Outbox,
    PortError, UsersDocument,
};
use api_lib::{
    adapters::{InMemoryDocumentStore, LogNotifier, PgDocumentStore, SmtpNotifier},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{extract::DefaultBodyLimit, Router};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const MEMORY_DATABASE: &str = "aikido";
const MEMORY_CONTAINER: &str = "documents";

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect the Document Store ---
    let (store, pool): (Arc<dyn DocumentStore>, Option<PgPool>) = match &config.store {
        StoreBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let pg = PgDocumentStore::new(pool.clone());
            info!("Running database migrations...");
            pg.run_migrations().await?;
            info!("Database migrations complete.");
            (Arc::new(pg), Some(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory document store; data is lost on restart");
            let memory =
                InMemoryDocumentStore::new().with_container(MEMORY_DATABASE, MEMORY_CONTAINER);
            (Arc::new(memory), None)
        }
    };

    // --- 3. Discover the Catalog & Resolve the Working Container ---
    let catalog = CatalogSnapshot::discover(store.as_ref()).await?;
    let container: Option<ContainerHandle> = match catalog.resolve(config.container.as_ref()) {
        Ok(handle) => {
            info!(container = %handle, "Using document container");
            Some(handle)
        }
        Err(PortError::StoreNotInitialized(reason)) => {
            error!("Document store is not initialized: {}", reason);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let repo = Arc::new(
        DocumentRepository::new(store, container, config.document_ids.clone())
            .with_write_policy(config.write_policy),
    );
    match repo.ensure_users().await {
        Ok(UsersDocument::Existing) => {}
        Ok(UsersDocument::Created) => info!("Created an empty users document"),
        Ok(UsersDocument::NotSaved) => warn!("The users document could not be created"),
        Err(e) => error!("Failed to ensure the users document: {}", e),
    }

    // --- 4. Start the Email Outbox ---
    let notifier: Arc<dyn EmailNotifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp, repo.clone())?),
        None => {
            warn!("SMTP is not configured; emails will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let (outbox, _outbox_worker) = Outbox::spawn(notifier);

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), repo, outbox));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let secure_cookies = config.public_base_url.scheme() == "https";
    let api_router = match pool {
        Some(pool) => {
            let session_store = PostgresStore::new(pool);
            session_store.migrate().await?;
            router(app_state, session_store, secure_cookies)
        }
        None => {
            warn!("Sessions are kept in memory; everyone is signed out on restart");
            router(app_state, MemoryStore::default(), secure_cookies)
        }
    };
    let api_router = api_router
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
