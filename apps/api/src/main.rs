use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interview_api::config::{Config, StorageBackend};
use interview_api::db::create_pool;
use interview_api::questions::memory::InMemoryQuestionBank;
use interview_api::questions::postgres::PgQuestionBank;
use interview_api::questions::QuestionBank;
use interview_api::routes::build_router;
use interview_api::sessions::authority::SessionAuthority;
use interview_api::sessions::memory::InMemorySessionAuthority;
use interview_api::sessions::postgres::PgSessionAuthority;
use interview_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interview API v{}", env!("CARGO_PKG_VERSION"));

    let (authority, questions) = build_backend(&config.storage).await?;

    // Build app state
    let state = AppState {
        authority,
        questions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the practice web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the session authority and question bank for the configured backend.
async fn build_backend(
    storage: &StorageBackend,
) -> Result<(Arc<dyn SessionAuthority>, Arc<dyn QuestionBank>)> {
    match storage {
        StorageBackend::Postgres { database_url } => {
            let db = create_pool(database_url).await?;
            info!("PostgreSQL pool ready, migrations applied");

            let bank: Arc<dyn QuestionBank> = Arc::new(PgQuestionBank::new(db.clone()));
            let authority = Arc::new(PgSessionAuthority::new(db, bank.clone()));
            Ok((authority, bank))
        }
        StorageBackend::Memory { question_bank_path } => {
            let bank: Arc<dyn QuestionBank> =
                Arc::new(InMemoryQuestionBank::from_path(question_bank_path)?);
            info!(
                "In-memory backend seeded from {}",
                question_bank_path.display()
            );

            let authority = Arc::new(InMemorySessionAuthority::new(bank.clone()));
            Ok((authority, bank))
        }
    }
}
