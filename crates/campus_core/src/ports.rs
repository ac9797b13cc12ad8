//! crates/campus_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete relational store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Activity, ActivityAnalytics, ActivityFilter, ActivityPatch, Caller, Category,
    CategoryActivity, CategoryDistribution, CategoryStats, MonthlyBucket, NewActivity, NewUser,
    OverviewStats, PopularActivity, RecentRegistration, RecordedResponse, ResponderEntry,
    ResponseType, StudentActivity, StudentStats, TopActivity, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email or student id is already taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_credentials_by_student_id(&self, student_id: &str)
        -> PortResult<UserCredentials>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live token to its caller, or `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Caller>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Categories ---
    async fn list_categories(&self) -> PortResult<Vec<Category>>;

    async fn category_exists(&self, category_id: i32) -> PortResult<bool>;

    // --- Activity Management ---
    async fn list_activities(&self, filter: &ActivityFilter) -> PortResult<Vec<Activity>>;

    async fn list_activity_ids(&self) -> PortResult<Vec<Uuid>>;

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity>;

    async fn create_activity(&self, created_by: Uuid, activity: &NewActivity)
        -> PortResult<Activity>;

    async fn update_activity(&self, activity_id: Uuid, patch: &ActivityPatch)
        -> PortResult<Activity>;

    /// Removes the activity together with its responses and analytics.
    async fn delete_activity(&self, activity_id: Uuid) -> PortResult<()>;

    async fn category_activities(
        &self,
        category_id: i32,
        user_id: Uuid,
    ) -> PortResult<Vec<CategoryActivity>>;

    // --- Responses and Aggregates ---
    /// Upserts the (activity, user) response and recomputes the activity's
    /// analytics as one unit of work.
    async fn record_response(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        response_type: ResponseType,
    ) -> PortResult<RecordedResponse>;

    /// Re-derives the analytics row for one activity from its full response set.
    async fn recompute_analytics(&self, activity_id: Uuid) -> PortResult<ActivityAnalytics>;

    async fn get_analytics(&self, activity_id: Uuid) -> PortResult<Option<ActivityAnalytics>>;

    /// Responses joined with responder identity, newest first.
    async fn list_responses(&self, activity_id: Uuid) -> PortResult<Vec<ResponderEntry>>;

    // --- Dashboard Rollups ---
    async fn overview(&self) -> PortResult<OverviewStats>;

    async fn monthly(&self, limit: i64) -> PortResult<Vec<MonthlyBucket>>;

    async fn category_distribution(&self) -> PortResult<Vec<CategoryDistribution>>;

    async fn top_activities(&self, limit: i64) -> PortResult<Vec<TopActivity>>;

    async fn popular_activities(&self, limit: i64) -> PortResult<Vec<PopularActivity>>;

    async fn recent_registrations(&self, limit: i64) -> PortResult<Vec<RecentRegistration>>;

    async fn student_stats(&self, user_id: Uuid, today: NaiveDate) -> PortResult<StudentStats>;

    async fn recent_student_activities(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<StudentActivity>>;

    async fn category_stats(&self, user_id: Uuid, today: NaiveDate)
        -> PortResult<Vec<CategoryStats>>;
}
