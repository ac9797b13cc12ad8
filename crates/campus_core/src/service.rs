//! crates/campus_core/src/service.rs
//!
//! Application service sitting between the web layer and the `DatabaseService` port.
//! It owns the rules that do not belong to any particular store: input checks,
//! role checks, existence checks and which rollups each caller may see.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analytics::{MONTHLY_BUCKETS, POPULAR_ACTIVITIES_LIMIT, RECENT_LIMIT, TOP_ACTIVITIES_LIMIT};
use crate::domain::{
    Activity, ActivityAnalytics, ActivityFilter, ActivityPatch, Caller, Category,
    CategoryActivity, CategoryDistribution, CategoryStats, MonthlyBucket, NewActivity,
    OverviewStats, PopularActivity, RecentRegistration, RecordedResponse, ResponderEntry,
    ResponseType, StudentActivity, StudentStats, TopActivity,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::validation::require_non_empty;

#[derive(Clone)]
pub struct ActivityService {
    db: Arc<dyn DatabaseService>,
}

impl ActivityService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    //=====================================================================================
    // Response Store
    //=====================================================================================

    /// Records the caller's RSVP for an activity ("last response wins") and
    /// refreshes the activity's analytics before returning.
    pub async fn submit_response(
        &self,
        caller: &Caller,
        activity_id: Uuid,
        response_type: &str,
    ) -> PortResult<RecordedResponse> {
        let response_type: ResponseType = response_type.parse()?;
        // Existence check gives a clean NotFound; the store's foreign key still
        // guards against the activity vanishing in between.
        self.db.get_activity(activity_id).await?;

        let recorded = self
            .db
            .record_response(activity_id, caller.user_id, response_type)
            .await?;
        debug!(
            %activity_id,
            user_id = %caller.user_id,
            response = %response_type,
            attendees = recorded.analytics.attendee_count,
            registrations = recorded.analytics.registration_count,
            "Response recorded"
        );
        Ok(recorded)
    }

    pub async fn list_responses(
        &self,
        caller: &Caller,
        activity_id: Uuid,
    ) -> PortResult<Vec<ResponderEntry>> {
        caller.require_admin()?;
        self.db.get_activity(activity_id).await?;
        self.db.list_responses(activity_id).await
    }

    //=====================================================================================
    // Aggregate Maintainer
    //=====================================================================================

    /// Re-derives one activity's analytics from scratch. Safe to call redundantly.
    pub async fn recompute_aggregates(&self, activity_id: Uuid) -> PortResult<ActivityAnalytics> {
        self.db.get_activity(activity_id).await?;
        self.db.recompute_analytics(activity_id).await
    }

    /// Recomputes every activity. Used by the backfill binary.
    pub async fn recompute_all(&self) -> PortResult<Vec<ActivityAnalytics>> {
        let ids = self.db.list_activity_ids().await?;
        let mut refreshed = Vec::with_capacity(ids.len());
        for activity_id in ids {
            refreshed.push(self.db.recompute_analytics(activity_id).await?);
        }
        info!(count = refreshed.len(), "Recomputed activity analytics");
        Ok(refreshed)
    }

    /// Admin-triggered variant of [`ActivityService::recompute_all`].
    pub async fn refresh_all_analytics(
        &self,
        caller: &Caller,
    ) -> PortResult<Vec<ActivityAnalytics>> {
        caller.require_admin()?;
        self.recompute_all().await
    }

    pub async fn activity_analytics(
        &self,
        activity_id: Uuid,
    ) -> PortResult<Option<ActivityAnalytics>> {
        self.db.get_analytics(activity_id).await
    }

    //=====================================================================================
    // Activity CRUD
    //=====================================================================================

    pub async fn list_activities(&self, filter: &ActivityFilter) -> PortResult<Vec<Activity>> {
        self.db.list_activities(filter).await
    }

    pub async fn list_categories(&self) -> PortResult<Vec<Category>> {
        self.db.list_categories().await
    }

    pub async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity> {
        self.db.get_activity(activity_id).await
    }

    pub async fn category_activities(
        &self,
        caller: &Caller,
        category_id: i32,
    ) -> PortResult<Vec<CategoryActivity>> {
        self.ensure_category(category_id).await?;
        self.db.category_activities(category_id, caller.user_id).await
    }

    pub async fn create_activity(
        &self,
        caller: &Caller,
        mut activity: NewActivity,
    ) -> PortResult<Activity> {
        caller.require_admin()?;
        activity.title = require_non_empty(&activity.title, "Title")?;
        self.ensure_category(activity.category).await?;

        let created = self.db.create_activity(caller.user_id, &activity).await?;
        info!(activity_id = %created.id, created_by = %caller.user_id, "Activity created");
        Ok(created)
    }

    pub async fn update_activity(
        &self,
        caller: &Caller,
        activity_id: Uuid,
        mut patch: ActivityPatch,
    ) -> PortResult<Activity> {
        caller.require_admin()?;
        if patch.is_empty() {
            return Err(PortError::Validation("No valid updates provided".to_string()));
        }
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(require_non_empty(title, "Title")?);
        }
        if let Some(category) = patch.category {
            self.ensure_category(category).await?;
        }

        let updated = self.db.update_activity(activity_id, &patch).await?;
        info!(%activity_id, "Activity updated");
        Ok(updated)
    }

    pub async fn delete_activity(&self, caller: &Caller, activity_id: Uuid) -> PortResult<()> {
        caller.require_admin()?;
        self.db.delete_activity(activity_id).await?;
        info!(%activity_id, "Activity deleted");
        Ok(())
    }

    async fn ensure_category(&self, category_id: i32) -> PortResult<()> {
        if self.db.category_exists(category_id).await? {
            Ok(())
        } else {
            Err(PortError::Validation(format!(
                "Category {} does not exist",
                category_id
            )))
        }
    }

    //=====================================================================================
    // Query Layer
    //=====================================================================================

    pub async fn overview(&self, caller: &Caller) -> PortResult<OverviewStats> {
        caller.require_admin()?;
        self.db.overview().await
    }

    pub async fn monthly(&self, caller: &Caller) -> PortResult<Vec<MonthlyBucket>> {
        caller.require_admin()?;
        self.db.monthly(MONTHLY_BUCKETS).await
    }

    pub async fn category_distribution(
        &self,
        caller: &Caller,
    ) -> PortResult<Vec<CategoryDistribution>> {
        caller.require_admin()?;
        self.db.category_distribution().await
    }

    pub async fn top_activities(&self, caller: &Caller) -> PortResult<Vec<TopActivity>> {
        caller.require_admin()?;
        self.db.top_activities(TOP_ACTIVITIES_LIMIT).await
    }

    pub async fn popular_activities(&self) -> PortResult<Vec<PopularActivity>> {
        self.db.popular_activities(POPULAR_ACTIVITIES_LIMIT).await
    }

    pub async fn recent_registrations(&self) -> PortResult<Vec<RecentRegistration>> {
        self.db.recent_registrations(RECENT_LIMIT).await
    }

    pub async fn student_stats(&self, caller: &Caller) -> PortResult<StudentStats> {
        self.db
            .student_stats(caller.user_id, Utc::now().date_naive())
            .await
    }

    pub async fn recent_student_activities(
        &self,
        caller: &Caller,
    ) -> PortResult<Vec<StudentActivity>> {
        self.db
            .recent_student_activities(caller.user_id, RECENT_LIMIT)
            .await
    }

    pub async fn category_stats(&self, caller: &Caller) -> PortResult<Vec<CategoryStats>> {
        self.db
            .category_stats(caller.user_id, Utc::now().date_naive())
            .await
    }
}
