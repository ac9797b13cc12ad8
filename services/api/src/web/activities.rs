//! services/api/src/web/activities.rs
//!
//! Handlers for the activity catalogue and the RSVP endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use campus_core::domain::Caller;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::protocol::{
    ActivityDto, ActivityQuery, CategoryActivityDto, CategoryDto, CreateActivityRequest,
    MessageResponse, ResponderDto, ResponseDto, SubmitResponseRequest, UpdateActivityRequest,
};
use crate::web::state::AppState;

//=========================================================================================
// Public Catalogue
//=========================================================================================

/// List activities, newest date first.
#[utoipa::path(
    get,
    path = "/activities",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Matching activities", body = [ActivityDto]),
        (status = 400, description = "Malformed filter", body = ErrorBody)
    ),
    tag = "activities"
)]
pub async fn list_activities_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<Vec<ActivityDto>>, ApiError> {
    let filter = query.into_filter()?;
    let activities = state.service.list_activities(&filter).await?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/activities/categories",
    responses((status = 200, description = "All categories", body = [CategoryDto])),
    tag = "activities"
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let categories = state.service.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    responses(
        (status = 200, description = "The activity", body = ActivityDto),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    ),
    tag = "activities"
)]
pub async fn get_activity_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ActivityDto>, ApiError> {
    let activity = state.service.get_activity(id).await?;
    Ok(Json(activity.into()))
}

//=========================================================================================
// Authenticated Views
//=========================================================================================

/// Activities of one category, with counts and the caller's own RSVP.
#[utoipa::path(
    get,
    path = "/activities/category/{id}/details",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Activities in the category", body = [CategoryActivityDto]),
        (status = 400, description = "Unknown category", body = ErrorBody),
        (status = 401, description = "Missing or expired token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn category_activities_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(category_id): ApiPath<i32>,
) -> Result<Json<Vec<CategoryActivityDto>>, ApiError> {
    let rows = state.service.category_activities(&caller, category_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Record or change the caller's RSVP for an activity.
#[utoipa::path(
    post,
    path = "/activities/{id}/responses",
    params(("id" = Uuid, Path, description = "Activity id")),
    request_body = SubmitResponseRequest,
    responses(
        (status = 200, description = "The stored response", body = ResponseDto),
        (status = 400, description = "Invalid response type", body = ErrorBody),
        (status = 401, description = "Missing or expired token", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "responses"
)]
pub async fn submit_response_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SubmitResponseRequest>,
) -> Result<Json<ResponseDto>, ApiError> {
    let recorded = state
        .service
        .submit_response(&caller, id, &req.response_type)
        .await?;
    Ok(Json(recorded.response.into()))
}

//=========================================================================================
// Administration
//=========================================================================================

#[utoipa::path(
    get,
    path = "/activities/{id}/responses",
    params(("id" = Uuid, Path, description = "Activity id")),
    responses(
        (status = 200, description = "Responses, newest first", body = [ResponderDto]),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "responses"
)]
pub async fn list_responses_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<ResponderDto>>, ApiError> {
    let rows = state.service.list_responses(&caller, id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/activities",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity created", body = ActivityDto),
        (status = 400, description = "Invalid activity", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn create_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<CreateActivityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_admin()?;
    let activity = state
        .service
        .create_activity(&caller, req.into_new_activity()?)
        .await?;
    Ok((StatusCode::CREATED, Json(ActivityDto::from(activity))))
}

/// Patch an activity. Only the documented fields are considered.
#[utoipa::path(
    put,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    request_body = UpdateActivityRequest,
    responses(
        (status = 200, description = "Activity updated", body = ActivityDto),
        (status = 400, description = "No valid updates provided", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn update_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateActivityRequest>,
) -> Result<Json<ActivityDto>, ApiError> {
    caller.require_admin()?;
    let activity = state
        .service
        .update_activity(&caller, id, req.into_patch()?)
        .await?;
    Ok(Json(activity.into()))
}

#[utoipa::path(
    delete,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    responses(
        (status = 200, description = "Activity deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn delete_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete_activity(&caller, id).await?;
    Ok(Json(MessageResponse {
        message: "Activity deleted successfully".to_string(),
    }))
}
