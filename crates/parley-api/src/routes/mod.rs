pub mod applications;
pub mod chats;
pub mod health;
pub mod messages;

use axum::{
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::state::AppState;

/// Raw paging values; coerced leniently by the pagination policy
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, 1-based (default: 1)
    pub page: Option<String>,
    /// Page size (default: 20, capped at the configured maximum)
    pub per_page: Option<String>,
}

/// Body returned when a chat or message is created
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NumberResponse {
    pub number: i64,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Applications
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/applications/:token", get(applications::get_application))
        // Chats
        .route(
            "/applications/:token/chats",
            get(chats::list_chats).post(chats::create_chat),
        )
        // Messages
        .route(
            "/applications/:token/chats/:number/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/applications/:token/chats/:number/messages/search",
            get(messages::search_messages),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        applications::list_applications,
        applications::create_application,
        applications::get_application,
        chats::list_chats,
        chats::create_chat,
        messages::list_messages,
        messages::create_message,
        messages::search_messages,
    ),
    components(schemas(
        health::HealthResponse,
        applications::CreateApplicationRequest,
        applications::ApplicationParams,
        applications::ApplicationResponse,
        applications::CreatedApplicationResponse,
        chats::ChatResponse,
        messages::CreateMessageRequest,
        messages::MessageParams,
        messages::MessageResponse,
        NumberResponse,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "applications", description = "Applications and their tokens"),
        (name = "chats", description = "Numbered chats within an application"),
        (name = "messages", description = "Numbered messages within a chat, with search"),
    )
)]
pub struct ApiDoc;
