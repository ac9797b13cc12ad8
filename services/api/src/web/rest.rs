//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, shared by the server's
//! Swagger UI and the `openapi` binary.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::error::{ErrorBody, ErrorDetail};
use crate::web::{activities, analytics, auth, protocol};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_student_handler,
        auth::register_admin_handler,
        auth::login_student_handler,
        auth::login_admin_handler,
        auth::me_handler,
        auth::logout_handler,
        activities::list_activities_handler,
        activities::list_categories_handler,
        activities::get_activity_handler,
        activities::category_activities_handler,
        activities::submit_response_handler,
        activities::list_responses_handler,
        activities::create_activity_handler,
        activities::update_activity_handler,
        activities::delete_activity_handler,
        analytics::overview_handler,
        analytics::monthly_handler,
        analytics::category_distribution_handler,
        analytics::top_activities_handler,
        analytics::recompute_handler,
        analytics::popular_activities_handler,
        analytics::recent_registrations_handler,
        analytics::student_stats_handler,
        analytics::recent_student_activities_handler,
        analytics::category_stats_handler,
    ),
    components(
        schemas(
            ErrorBody,
            ErrorDetail,
            protocol::StudentRegisterRequest,
            protocol::AdminRegisterRequest,
            protocol::StudentLoginRequest,
            protocol::AdminLoginRequest,
            protocol::AuthResponse,
            protocol::UserDto,
            protocol::MessageResponse,
            protocol::CreateActivityRequest,
            protocol::UpdateActivityRequest,
            protocol::ActivityDto,
            protocol::CategoryDto,
            protocol::CategoryActivityDto,
            protocol::SubmitResponseRequest,
            protocol::ResponseDto,
            protocol::ResponderDto,
            protocol::RecomputeResponse,
            protocol::OverviewDto,
            protocol::MonthlyDto,
            protocol::CategoryDistributionDto,
            protocol::TopActivityDto,
            protocol::PopularActivityDto,
            protocol::PopularActivitiesResponse,
            protocol::RecentRegistrationDto,
            protocol::RecentRegistrationsResponse,
            protocol::StudentStatsDto,
            protocol::StudentActivityDto,
            protocol::CategoryStatsDto,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and bearer tokens."),
        (name = "activities", description = "The activity catalogue and its administration."),
        (name = "responses", description = "Student RSVPs."),
        (name = "analytics", description = "Dashboard rollups.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
