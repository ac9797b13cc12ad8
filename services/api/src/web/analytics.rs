//! services/api/src/web/analytics.rs
//!
//! Dashboard endpoints. Administrator rollups, the public landing-page feeds
//! and the per-student summaries.

use axum::{extract::State, Extension, Json};
use campus_core::domain::Caller;
use std::sync::Arc;

use crate::error::{ApiError, ErrorBody};
use crate::web::protocol::{
    CategoryDistributionDto, CategoryStatsDto, MonthlyDto, OverviewDto,
    PopularActivitiesResponse, RecentRegistrationsResponse, RecomputeResponse,
    StudentActivityDto, StudentStatsDto, TopActivityDto,
};
use crate::web::state::AppState;

//=========================================================================================
// Administrator Rollups
//=========================================================================================

#[utoipa::path(
    get,
    path = "/analytics/overview",
    responses(
        (status = 200, description = "Platform-wide totals", body = OverviewDto),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn overview_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<OverviewDto>, ApiError> {
    Ok(Json(state.service.overview(&caller).await?.into()))
}

/// The twelve most recent calendar months that have activities.
#[utoipa::path(
    get,
    path = "/analytics/monthly",
    responses(
        (status = 200, description = "Monthly buckets, newest first", body = [MonthlyDto]),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn monthly_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<MonthlyDto>>, ApiError> {
    let buckets = state.service.monthly(&caller).await?;
    Ok(Json(buckets.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/analytics/categories",
    responses(
        (status = 200, description = "One row per category", body = [CategoryDistributionDto]),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn category_distribution_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<CategoryDistributionDto>>, ApiError> {
    let rows = state.service.category_distribution(&caller).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/analytics/top-activities",
    responses(
        (status = 200, description = "Top activities by attendance", body = [TopActivityDto]),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn top_activities_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<TopActivityDto>>, ApiError> {
    let rows = state.service.top_activities(&caller).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Rebuild every activity's analytics from its responses.
#[utoipa::path(
    post,
    path = "/analytics/recompute",
    responses(
        (status = 200, description = "Number of activities recomputed", body = RecomputeResponse),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn recompute_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let refreshed = state.service.refresh_all_analytics(&caller).await?;
    Ok(Json(RecomputeResponse {
        recomputed: refreshed.len(),
    }))
}

//=========================================================================================
// Public Feeds
//=========================================================================================

#[utoipa::path(
    get,
    path = "/analytics/popular-activities",
    responses((status = 200, description = "Most responded-to activities", body = PopularActivitiesResponse)),
    tag = "analytics"
)]
pub async fn popular_activities_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PopularActivitiesResponse>, ApiError> {
    let rows = state.service.popular_activities().await?;
    Ok(Json(PopularActivitiesResponse {
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/analytics/recent-registrations",
    responses((status = 200, description = "Latest student responses", body = RecentRegistrationsResponse)),
    tag = "analytics"
)]
pub async fn recent_registrations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecentRegistrationsResponse>, ApiError> {
    let rows = state.service.recent_registrations().await?;
    Ok(Json(RecentRegistrationsResponse {
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

//=========================================================================================
// Per-student Summaries
//=========================================================================================

#[utoipa::path(
    get,
    path = "/analytics/student-stats",
    responses(
        (status = 200, description = "The caller's counters", body = StudentStatsDto),
        (status = 401, description = "Missing or expired token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn student_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<StudentStatsDto>, ApiError> {
    Ok(Json(state.service.student_stats(&caller).await?.into()))
}

#[utoipa::path(
    get,
    path = "/analytics/recent-student-activities",
    responses(
        (status = 200, description = "The caller's latest responses", body = [StudentActivityDto]),
        (status = 401, description = "Missing or expired token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn recent_student_activities_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<StudentActivityDto>>, ApiError> {
    let rows = state.service.recent_student_activities(&caller).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/analytics/category-stats",
    responses(
        (status = 200, description = "Per-category totals for the caller", body = [CategoryStatsDto]),
        (status = 401, description = "Missing or expired token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "analytics"
)]
pub async fn category_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<CategoryStatsDto>>, ApiError> {
    let rows = state.service.category_stats(&caller).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
