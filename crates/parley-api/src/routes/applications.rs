use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use parley_cache::application_key;
use parley_persist::{Application, NewApplication};
use parley_types::Paginated;

use crate::{
    error::{ApiError, ApiResult},
    routes::PageParams,
    state::AppState,
};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub application: ApplicationParams,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ApplicationParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub token: String,
    pub name: String,
    pub chats_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedApplicationResponse {
    pub token: String,
    pub name: String,
}

/// Create an application
#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application created", body = CreatedApplicationResponse),
        (status = 422, description = "Missing or blank name")
    ),
    tag = "applications"
)]
pub async fn create_application(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedApplicationResponse>)> {
    let Json(req) = payload?;

    let application = state
        .persist
        .create_application(NewApplication {
            name: req.application.name,
        })
        .await?;

    tracing::info!(token = %application.token, "Application created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedApplicationResponse {
            token: application.token,
            name: application.name,
        }),
    ))
}

/// List applications, newest first
#[utoipa::path(
    get,
    path = "/applications",
    params(PageParams),
    responses(
        (status = 200, description = "Page of applications with paging metadata", body = Object)
    ),
    tag = "applications"
)]
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<ApplicationResponse>>> {
    let Query(params) = query?;
    let request = state
        .pagination
        .normalize(params.page.as_deref(), params.per_page.as_deref());

    let total = state.persist.count_applications().await?;
    let applications = state
        .persist
        .list_applications(request.offset(), request.limit())
        .await?;

    Ok(Json(
        Paginated::new(applications, request, total).map(application_to_response),
    ))
}

/// Get an application by token
///
/// Served from the cache for up to the configured TTL; later changes to
/// the application are not visible until the entry expires.
#[utoipa::path(
    get,
    path = "/applications/{token}",
    params(
        ("token" = String, Path, description = "Application token")
    ),
    responses(
        (status = 200, description = "Application", body = ApplicationResponse),
        (status = 404, description = "Unknown token")
    ),
    tag = "applications"
)]
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<ApplicationResponse>> {
    let Path(token) = path?;

    let application: Application = state
        .cache
        .get_or_load(&application_key(&token), state.application_ttl, || async {
            state
                .persist
                .find_application(&token)
                .await
                .map_err(ApiError::from)
        })
        .await?;

    Ok(Json(application_to_response(application)))
}

fn application_to_response(application: Application) -> ApplicationResponse {
    ApplicationResponse {
        token: application.token,
        name: application.name,
        chats_count: application.chats_count,
        created_at: application.created_at,
        updated_at: application.updated_at,
    }
}
