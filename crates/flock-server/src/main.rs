use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use flock_api::auth::{self, AppState, AppStateInner};
use flock_api::middleware::require_auth;
use flock_api::{admin, chats, posts, users};
use flock_db::Database;
use flock_gateway::connection;
use flock_gateway::dispatcher::Dispatcher;

/// Process configuration, read once at startup and passed explicitly into
/// the state the token codec and session gate run against.
struct Config {
    host: String,
    port: u16,
    jwt_secret: String,
    db_path: PathBuf,
    upload_dir: PathBuf,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("FLOCK_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("FLOCK_PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()?,
            jwt_secret: std::env::var("FLOCK_JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            db_path: std::env::var("FLOCK_DB_PATH")
                .unwrap_or_else(|_| "flock.db".into())
                .into(),
            upload_dir: std::env::var("FLOCK_UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
        })
    }
}

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flock=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        jwt_secret: config.jwt_secret.clone(),
        upload_dir: config.upload_dir.clone(),
    });

    let gateway_state = GatewayState {
        dispatcher: Dispatcher::new(),
        db,
        jwt_secret: config.jwt_secret.clone(),
    };

    // Routes
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/admin/users", get(admin::list_users))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/api/user", get(users::get_me).patch(users::update_profile))
        .route("/api/user/follow/{id}", post(users::follow_user))
        .route("/api/user/unfollow/{id}", post(users::unfollow_user))
        .route("/api/user/request/{id}", post(users::send_friend_request))
        .route("/api/user/accept/{id}", post(users::accept_friend_request))
        .route("/api/user/decline/{id}", post(users::decline_friend_request))
        .route("/api/user/followers", get(users::my_followers))
        .route("/api/user/following", get(users::my_following))
        .route("/api/user/friends", get(users::my_friends))
        .route("/api/user/friend-requests", get(users::my_friend_requests))
        .route("/api/user/details/{id}", get(users::user_details))
        .route("/api/user/{id}/followers", get(users::followers_of))
        .route("/api/user/{id}/following", get(users::following_of))
        .route("/api/post", get(posts::my_posts).post(posts::create_post))
        .route("/api/post/timeline", get(posts::timeline))
        .route(
            "/api/post/{id}",
            patch(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/chat", get(chats::list_chats).post(chats::create_chat))
        .route("/api/chat/{id}", get(chats::get_chat))
        .route("/api/chat/{id}/message", post(chats::send_message))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("flock server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
    })
}
