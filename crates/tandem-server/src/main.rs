use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use tandem_api::middleware::{USER_COOKIE, require_auth};
use tandem_api::{AppState, AppStateInner, auth, partner, tasks, timer};
use tandem_gateway::connection;
use tandem_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tandem=debug,tower_http=debug".into()),
        )
        .init();

    let db_path = std::env::var("TANDEM_DB_PATH").unwrap_or_else(|_| "tandem.db".into());
    let host = std::env::var("TANDEM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TANDEM_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let db = Arc::new(tandem_db::Database::open(&PathBuf::from(&db_path))?);
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher,
    });

    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/partner/state", get(partner::partner_state))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/{task_id}/activate", post(tasks::activate_task))
        .route("/api/tasks/{task_id}", delete(tasks::delete_task))
        .route("/api/timer", get(timer::get_timer))
        .route("/api/timer/start", post(timer::start_timer))
        .route("/api/timer/pause", post(timer::pause_timer))
        .route("/api/timer/resume", post(timer::resume_timer))
        .route("/api/timer/stop", post(timer::stop_timer))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Tandem server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Identity is resolved from the cookie before the upgrade; an unknown
/// caller never gets a socket.
async fn ws_upgrade(
    State(state): State<AppState>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user_id) = jar.get(USER_COOKIE).map(|c| c.value().to_string()) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let db = state.db.clone();
    let looked_up = tokio::task::spawn_blocking(move || db.get_user_by_id(&user_id)).await;

    let user = match looked_up {
        Ok(Ok(Some(row))) => match row.into_user() {
            Ok(user) => user,
            Err(e) => {
                error!("corrupt user row behind websocket upgrade: {:#}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        Ok(Ok(None)) => return StatusCode::UNAUTHORIZED.into_response(),
        Ok(Err(e)) => {
            error!("user lookup failed during websocket upgrade: {:#}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            error!("user lookup task died during websocket upgrade: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let db = state.db.clone();
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, db, dispatcher, user))
}
