use snipshare::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    rbac::AccessPolicy,
    repository::{PostgresRepository, SnippetRepo, UserRepo},
    service::{SnippetService, UserService},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, policy, services, server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter: RUST_LOG wins, with sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "snipshare=debug,tower_http=info,axum=trace".into());

    // 3. Log format by environment: pretty locally, JSON for aggregators.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database pool.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // One durable repository serves both contracts; each service gets its
    // own trait-object handle.
    let pg = Arc::new(PostgresRepository::new(pool));
    let user_repo: UserRepo = pg.clone();
    let snippet_repo: SnippetRepo = pg;

    // 5. Authorization policy: built once, immutable, injected everywhere.
    let policy = Arc::new(AccessPolicy::defaults());

    let users = Arc::new(UserService::new(user_repo.clone(), policy.clone()));
    let snippets = Arc::new(SnippetService::new(snippet_repo, policy));

    // 6. Unified state assembly.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        users,
        snippets,
        user_repo,
        config,
    };

    // 7. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind listener");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("Swagger UI available at /swagger-ui");

    axum::serve(listener, app).await.expect("http server error");
}
