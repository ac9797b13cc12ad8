//! services/api/src/web/router.rs
//!
//! Assembles the HTTP router: public routes, token-protected routes, CORS,
//! request tracing and the Swagger UI.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    activities, analytics, auth, middleware::require_auth, rest::ApiDoc, state::AppState,
};

/// Builds the complete application router around the shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/student/register", post(auth::register_student_handler))
        .route("/auth/student/login", post(auth::login_student_handler))
        .route("/auth/admin/register", post(auth::register_admin_handler))
        .route("/auth/admin/login", post(auth::login_admin_handler))
        .route("/activities", get(activities::list_activities_handler))
        .route("/activities/categories", get(activities::list_categories_handler))
        .route("/activities/{id}", get(activities::get_activity_handler))
        .route(
            "/analytics/popular-activities",
            get(analytics::popular_activities_handler),
        )
        .route(
            "/analytics/recent-registrations",
            get(analytics::recent_registrations_handler),
        );

    // Protected routes (bearer token required); methods merge with the public
    // routes that share a path.
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/activities", post(activities::create_activity_handler))
        .route(
            "/activities/{id}",
            put(activities::update_activity_handler)
                .delete(activities::delete_activity_handler),
        )
        .route(
            "/activities/{id}/responses",
            post(activities::submit_response_handler).get(activities::list_responses_handler),
        )
        .route(
            "/activities/category/{id}/details",
            get(activities::category_activities_handler),
        )
        .route("/analytics/overview", get(analytics::overview_handler))
        .route("/analytics/monthly", get(analytics::monthly_handler))
        .route(
            "/analytics/categories",
            get(analytics::category_distribution_handler),
        )
        .route(
            "/analytics/category-distribution",
            get(analytics::category_distribution_handler),
        )
        .route("/analytics/top-activities", get(analytics::top_activities_handler))
        .route("/analytics/recompute", post(analytics::recompute_handler))
        .route("/analytics/student-stats", get(analytics::student_stats_handler))
        .route(
            "/analytics/recent-student-activities",
            get(analytics::recent_student_activities_handler),
        )
        .route("/analytics/category-stats", get(analytics::category_stats_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
