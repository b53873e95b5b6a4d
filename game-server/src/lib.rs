use sea_orm::DatabaseConnection;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::auth::SharedSecret;
use crate::config::Config;
use crate::orchestrator::SessionOrchestrator;
use crate::session_registry::{SessionError, SessionRegistry};
use crate::websocket::{AttachQuery, ConnectionRegistry, TransportSettings};
use crate::word_pool::{WordPool, WordSource};
use game_persistence::repositories::{SessionRepository, UsedWordRepository};
use game_types::{CreateSessionRequest, JoinSessionRequest, SessionCreated};

pub mod auth;
pub mod config;
pub mod orchestrator;
pub mod session_registry;
pub mod timer;
pub mod websocket;
pub mod word_pool;

/// Wires registries, word pool and timers over one database.
pub fn build_orchestrator(
    db: DatabaseConnection,
    config: &Config,
    word_source: WordSource,
) -> SessionOrchestrator {
    let sessions = Arc::new(SessionRegistry::new(
        SessionRepository::new(db.clone()),
        SharedSecret::new(&config.api_key),
        config.rules,
    ));
    let words = Arc::new(WordPool::new(word_source, UsedWordRepository::new(db)));
    let connections = Arc::new(ConnectionRegistry::new());

    SessionOrchestrator::new(sessions, words, connections, config.tick())
}

pub fn create_routes(
    orchestrator: SessionOrchestrator,
    transport: TransportSettings,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let orchestrator_filter = warp::any().map(move || orchestrator.clone());
    let transport_filter = warp::any().map(move || transport);

    // WebSocket endpoint
    let websocket = warp::path!("ws" / String)
        .and(warp::ws())
        .and(warp::query::<AttachQuery>())
        .and(orchestrator_filter.clone())
        .and(transport_filter)
        .map(
            |session_id: String,
             ws: warp::ws::Ws,
             query: AttachQuery,
             orchestrator: SessionOrchestrator,
             transport: TransportSettings| {
                ws.on_upgrade(move |socket| {
                    websocket::handle_connection(
                        socket,
                        session_id,
                        query.role,
                        orchestrator,
                        transport,
                    )
                })
            },
        );

    let create_session = warp::path("create-session")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<CreateSessionRequest>())
        .and(orchestrator_filter.clone())
        .and_then(handle_create_session);

    let join_session = warp::path("join-session")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<JoinSessionRequest>())
        .and(orchestrator_filter)
        .and_then(handle_join_session);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(create_session)
        .or(join_session)
        .or(health)
        .with(cors)
        .with(warp::log("intesa"))
}

async fn handle_create_session(
    request: CreateSessionRequest,
    orchestrator: SessionOrchestrator,
) -> Result<impl warp::Reply, warp::Rejection> {
    let reply = match orchestrator
        .create_session(request.api_key.as_deref())
        .await
    {
        Ok(session_uuid) => warp::reply::with_status(
            warp::reply::json(&SessionCreated { session_uuid }),
            StatusCode::OK,
        ),
        Err(err) => error_reply(&err),
    };
    Ok(reply)
}

async fn handle_join_session(
    request: JoinSessionRequest,
    orchestrator: SessionOrchestrator,
) -> Result<impl warp::Reply, warp::Rejection> {
    let reply = match orchestrator
        .join_session(request.api_key.as_deref(), &request.session_code)
        .await
    {
        Ok(session_uuid) => warp::reply::with_status(
            warp::reply::json(&SessionCreated { session_uuid }),
            StatusCode::OK,
        ),
        Err(err) => error_reply(&err),
    };
    Ok(reply)
}

fn error_reply(err: &SessionError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match err {
        SessionError::MissingKey => StatusCode::BAD_REQUEST,
        SessionError::Unauthorized => StatusCode::FORBIDDEN,
        SessionError::NotFound | SessionError::InvalidCode => StatusCode::NOT_FOUND,
        SessionError::Storage(e) => {
            tracing::error!("Session request failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = match err {
        // Never leak storage details to HTTP callers
        SessionError::Storage(_) => "Internal server error".to_string(),
        other => other.to_string(),
    };

    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        status,
    )
}
