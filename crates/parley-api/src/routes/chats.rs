use axum::{
    extract::{rejection::{PathRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use parley_persist::Chat;
use parley_types::Paginated;

use crate::{
    error::ApiResult,
    routes::{NumberResponse, PageParams},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub number: i64,
    pub messages_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create the next chat in an application
#[utoipa::path(
    post,
    path = "/applications/{token}/chats",
    params(
        ("token" = String, Path, description = "Application token")
    ),
    responses(
        (status = 201, description = "Chat created", body = NumberResponse),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Number allocation kept conflicting")
    ),
    tag = "chats"
)]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<(StatusCode, Json<NumberResponse>)> {
    let Path(token) = path?;

    let chat = state.persist.create_chat(&token).await?;
    tracing::info!(application_token = %token, number = chat.number, "Chat created");

    Ok((StatusCode::CREATED, Json(NumberResponse { number: chat.number })))
}

/// List chats of an application by ascending number
#[utoipa::path(
    get,
    path = "/applications/{token}/chats",
    params(
        ("token" = String, Path, description = "Application token"),
        PageParams
    ),
    responses(
        (status = 200, description = "Page of chats with paging metadata", body = Object),
        (status = 404, description = "Unknown token")
    ),
    tag = "chats"
)]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<ChatResponse>>> {
    let Path(token) = path?;
    let Query(params) = query?;
    let request = state
        .pagination
        .normalize(params.page.as_deref(), params.per_page.as_deref());

    let total = state.persist.count_chats(&token).await?;
    let chats = state
        .persist
        .list_chats(&token, request.offset(), request.limit())
        .await?;

    Ok(Json(Paginated::new(chats, request, total).map(chat_to_response)))
}

fn chat_to_response(chat: Chat) -> ChatResponse {
    ChatResponse {
        number: chat.number,
        messages_count: chat.messages_count,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }
}
