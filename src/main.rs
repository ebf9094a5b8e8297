use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealmind_api::{
    config::Config,
    db,
    middleware::auth::JwtSecret,
    routes,
    services::{completion::OpenAiClient, email::EmailService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured — email features disabled");
    }

    let completion = Arc::new(OpenAiClient::new(&config));
    if config.openai_api_key.is_some() {
        info!("Completion service configured (model: {})", config.openai_model);
    } else {
        info!("OPENAI_API_KEY not set — new plans will be created empty");
    }

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        completion,
        email,
    };

    // CORS: allow the configured app origin; localhost is always allowed for
    // local development.
    let cors_origin = {
        let base = config.app_base_url.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let o = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            o.starts_with("http://localhost")
                || o.starts_with("http://127.0.0.1")
                || o == base
        })
    };

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        // Meal plans
        .route(
            "/meal-plans",
            get(routes::plans::list_plans).post(routes::plans::create_plan),
        )
        .route(
            "/meal-plans/{id}",
            patch(routes::plans::update_meal).delete(routes::plans::delete_plan),
        )
        // Grocery lists
        .route(
            "/meal-plans/{id}/grocery-list",
            get(routes::grocery::get_grocery_list).patch(routes::grocery::update_grocery_list),
        )
        .route(
            "/meal-plans/{id}/grocery-list/regenerate",
            post(routes::grocery::regenerate_grocery_list),
        )
        // Email
        .route("/meal-plans/{id}/email", post(routes::email::send_plan_email))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("MealMind API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
