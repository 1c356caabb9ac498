//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiChatAdapter},
    config::Config,
    error::ApiError,
    web::{
        delete_session_handler, health_handler, identify_user, list_sessions_handler,
        login_handler, logout_handler, require_auth, rest::ApiDoc, session_messages_handler,
        signup_handler, state::AppState, ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use chat_core::ports::{AccountStore, ConversationStore, NoopConversationStore};
use chat_core::SessionController;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Select the Conversation Store ---
    let (store, accounts): (Arc<dyn ConversationStore>, Option<Arc<dyn AccountStore>>) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let store: Arc<dyn ConversationStore> = db_adapter.clone();
                let accounts: Arc<dyn AccountStore> = db_adapter;
                (store, Some(accounts))
            }
            None => {
                warn!("DATABASE_URL is not set. Running in memory-only mode: chat history will not be saved.");
                let store: Arc<dyn ConversationStore> = Arc::new(NoopConversationStore);
                (store, None)
            }
        };

    // --- 3. Initialize the Model Adapter ---
    let mut openai_config = OpenAIConfig::new().with_api_key(&config.model_api_key);
    if let Some(api_base) = &config.model_api_base {
        openai_config = openai_config.with_api_base(api_base);
    }
    let openai_client = Client::with_config(openai_config);
    let model = Arc::new(OpenAiChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));
    info!("Using chat model {}", config.chat_model);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        controller: SessionController::new(store, model),
        accounts,
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Chat routes, protected only when accounts are mandatory
    let mut chat_routes = Router::new()
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{session_id}", delete(delete_session_handler))
        .route("/sessions/{session_id}/messages", get(session_messages_handler))
        .route("/ws", get(ws_handler));
    if config.auth_required {
        info!("Authentication is required for chat routes.");
        chat_routes = chat_routes.layer(axum_middleware::from_fn(require_auth));
    }

    // Combine API routes; `identify_user` runs before everything else
    let api_router = Router::new()
        .merge(public_routes)
        .merge(chat_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            identify_user,
        ))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
