use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use parley_persist::{Message, NewMessage};
use parley_search::MessageDocument;
use parley_types::{Paginated, SearchPage};

use crate::{
    error::ApiResult,
    routes::{NumberResponse, PageParams},
    state::AppState,
};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub message: MessageParams,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MessageParams {
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub number: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Text to match against message bodies
    pub query: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Create the next message in a chat
///
/// The message is indexed for search after it is stored; an indexing
/// failure is logged and does not fail the request.
#[utoipa::path(
    post,
    path = "/applications/{token}/chats/{number}/messages",
    params(
        ("token" = String, Path, description = "Application token"),
        ("number" = i64, Path, description = "Chat number")
    ),
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message created", body = NumberResponse),
        (status = 404, description = "Unknown token or chat"),
        (status = 409, description = "Number allocation kept conflicting"),
        (status = 422, description = "Missing or blank body")
    ),
    tag = "messages"
)]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, i64)>, PathRejection>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NumberResponse>)> {
    let Path((token, chat_number)) = path?;
    let Json(req) = payload?;

    let message = state
        .persist
        .create_message(
            &token,
            chat_number,
            NewMessage {
                body: req.message.body,
            },
        )
        .await?;

    let document = MessageDocument {
        application_token: token.clone(),
        chat_number,
        message_number: message.number,
        body: message.body,
        created_at: message.created_at,
    };
    if state.search.index_message(&document).await.is_err() {
        tracing::warn!(doc_id = %document.doc_id(), "Message stored but not indexed");
    }

    tracing::info!(
        application_token = %token,
        chat_number,
        number = message.number,
        "Message created"
    );

    Ok((StatusCode::CREATED, Json(NumberResponse { number: message.number })))
}

/// List messages of a chat by ascending number
#[utoipa::path(
    get,
    path = "/applications/{token}/chats/{number}/messages",
    params(
        ("token" = String, Path, description = "Application token"),
        ("number" = i64, Path, description = "Chat number"),
        PageParams
    ),
    responses(
        (status = 200, description = "Page of messages with paging metadata", body = Object),
        (status = 404, description = "Unknown token or chat")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, i64)>, PathRejection>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<MessageResponse>>> {
    let Path((token, chat_number)) = path?;
    let Query(params) = query?;
    let request = state
        .pagination
        .normalize(params.page.as_deref(), params.per_page.as_deref());

    let total = state.persist.count_messages(&token, chat_number).await?;
    let messages = state
        .persist
        .list_messages(&token, chat_number, request.offset(), request.limit())
        .await?;

    Ok(Json(
        Paginated::new(messages, request, total).map(message_to_response),
    ))
}

/// Full-text search over the messages of one chat
#[utoipa::path(
    get,
    path = "/applications/{token}/chats/{number}/messages/search",
    params(
        ("token" = String, Path, description = "Application token"),
        ("number" = i64, Path, description = "Chat number"),
        SearchParams
    ),
    responses(
        (status = 200, description = "Matching messages: total, results, page, per_page", body = Object),
        (status = 404, description = "Unknown token or chat"),
        (status = 422, description = "Missing or blank query"),
        (status = 503, description = "Search index unavailable")
    ),
    tag = "messages"
)]
pub async fn search_messages(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, i64)>, PathRejection>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<SearchPage<MessageDocument>>> {
    let Path((token, chat_number)) = path?;
    let Query(params) = query?;
    let request = state
        .pagination
        .normalize(params.page.as_deref(), params.per_page.as_deref());

    state.persist.find_chat(&token, chat_number).await?;

    let page = state
        .search
        .search(
            &token,
            chat_number,
            params.query.as_deref().unwrap_or_default(),
            request,
        )
        .await?;

    Ok(Json(page))
}

fn message_to_response(message: Message) -> MessageResponse {
    MessageResponse {
        number: message.number,
        body: message.body,
        created_at: message.created_at,
        updated_at: message.updated_at,
    }
}
