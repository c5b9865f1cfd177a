use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod analytics;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;
mod store;
mod throttle;

use config::Config;
use services::generation::{FallbackPolicy, GenerationClient};
use throttle::ThrottleState;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub generator: GenerationClient,
    pub fallback_policy: Arc<FallbackPolicy>,
    pub throttle: ThrottleState,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitlens_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let generator = GenerationClient::new(&config);

    let state = AppState {
        db,
        config: config.clone(),
        generator,
        fallback_policy: Arc::new(FallbackPolicy::default()),
        throttle: ThrottleState::new(),
    };

    // Diagnosis creation spends upstream generation quota; throttle it per IP.
    let diagnosis_routes = Router::new()
        .route("/api/diagnosis", post(handlers::diagnosis::create_diagnosis))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            throttle::throttle_diagnosis,
        ));

    let api_routes = Router::new()
        // Habit definitions
        .route("/api/habits", get(handlers::habits::list_habits))
        .route("/api/habits", post(handlers::habits::create_habit))
        .route("/api/habits/:id", get(handlers::habits::get_habit))
        .route("/api/habits/:id", put(handlers::habits::update_habit))
        .route("/api/habits/:id", delete(handlers::habits::delete_habit))
        // Habit logs
        .route("/api/habit-logs", post(handlers::habit_logs::upsert_habit_log))
        .route("/api/habit-logs", get(handlers::habit_logs::list_habit_logs))
        .route(
            "/api/habit-logs/:id",
            delete(handlers::habit_logs::delete_habit_log),
        )
        // Daily wellbeing records
        .route(
            "/api/daily-records",
            post(handlers::daily_records::upsert_daily_record),
        )
        .route(
            "/api/daily-records",
            get(handlers::daily_records::list_daily_records),
        )
        // Analytics & diagnosis
        .route("/api/analytics/stats", get(handlers::analytics::get_stats))
        .route(
            "/api/diagnosis/latest",
            get(handlers::diagnosis::latest_diagnosis),
        )
        .merge(diagnosis_routes);

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    // Purge stale throttle entries in the background
    throttle::spawn_cleanup_worker(state.throttle.clone());

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Client IP is needed for the diagnosis throttle
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
