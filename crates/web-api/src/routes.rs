use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use application::dto::{
    ConversationSummary, ConversationView, CreateConversationRequest, MarkSeenRequest,
    MessageListItem, MessagePosted, PostMessageRequest, SeenReceipt, UserListItem,
};

use crate::{error::ApiError, state::AppState, websocket::websocket_upgrade};

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/ws", get(websocket_upgrade))
        .nest("/api", api_routes())
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route("/conversation", post(create_conversation))
        .route("/conversation/{user_id}", get(list_conversations))
        .route("/message", post(post_message))
        .route("/message/{conversation_id}", get(list_messages))
        .route("/message/seen/{conversation_id}", put(mark_seen))
        .fallback(api_not_found)
}

/// `*` 表示允许任意来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": Utc::now(),
    }))
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "API endpoint not found" })),
    )
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserListItem>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users))
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationView>), ApiError> {
    let conversation = state
        .conversation_service
        .create_conversation(payload)
        .await?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let summaries = state.conversation_service.list_for_user(&user_id).await?;
    Ok(Json(summaries))
}

async fn post_message(
    State(state): State<AppState>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessagePosted>), ApiError> {
    let posted = state.conversation_service.post_message(payload).await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageListItem>>, ApiError> {
    let messages = state
        .conversation_service
        .list_messages(&conversation_id)
        .await?;
    Ok(Json(messages))
}

async fn mark_seen(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(payload): Json<MarkSeenRequest>,
) -> Result<Json<SeenReceipt>, ApiError> {
    let receipt = state
        .conversation_service
        .mark_seen(&conversation_id, payload)
        .await?;
    Ok(Json(receipt))
}
