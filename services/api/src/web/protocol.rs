//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server, and their conversions to and from the core domain types.

use campus_core::domain::{
    Activity, ActivityFilter, ActivityPatch, ActivityResponse, Category,
    CategoryActivity, CategoryDistribution, CategoryStats, MonthlyBucket, NewActivity,
    OverviewStats, PopularActivity, RecentRegistration, ResponderEntry, StudentActivity,
    StudentStats, TopActivity, User,
};
use campus_core::ports::{PortError, PortResult};
use campus_core::validation::{parse_date, parse_time, require_non_empty};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Auth Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StudentRegisterRequest {
    pub name: String,
    /// Exactly nine digits.
    pub student_id: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminRegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StudentLoginRequest {
    pub student_id: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
    /// `student` or `admin`.
    pub role: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            student_id: user.student_id,
            role: user.role.to_string(),
        }
    }
}

/// Returned by the login and student registration endpoints.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Activity Payloads
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    pub category: Option<i32>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

impl ActivityQuery {
    pub fn into_filter(self) -> PortResult<ActivityFilter> {
        Ok(ActivityFilter {
            category: self.category,
            date: self.date.as_deref().map(parse_date).transpose()?,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateActivityRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: i32,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// 24h `H:MM` or `HH:MM`.
    pub time: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub image: Option<String>,
}

impl CreateActivityRequest {
    pub fn into_new_activity(self) -> PortResult<NewActivity> {
        Ok(NewActivity {
            title: require_non_empty(&self.title, "Title")?,
            description: self.description,
            category: self.category,
            date: parse_date(&self.date)?,
            time: parse_time(&self.time)?,
            location: self.location,
            duration: self.duration,
            image: self.image,
        })
    }
}

/// Any subset of the patchable fields. Unrecognised keys are ignored.
///
/// A key sent as `null` clears the column; only the optional columns accept it.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateActivityRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub category: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub time: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub duration: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
}

impl UpdateActivityRequest {
    pub fn into_patch(self) -> PortResult<ActivityPatch> {
        let date = not_null(self.date, "Date")?;
        let time = not_null(self.time, "Time")?;
        Ok(ActivityPatch {
            title: not_null(self.title, "Title")?,
            description: self.description,
            category: not_null(self.category, "Category")?,
            date: date.as_deref().map(parse_date).transpose()?,
            time: time.as_deref().map(parse_time).transpose()?,
            location: self.location,
            duration: self.duration,
            image: self.image,
        })
    }
}

/// Marks a key that was present in the body, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn not_null<T>(value: Option<Option<T>>, field: &str) -> PortResult<Option<T>> {
    match value {
        Some(None) => Err(PortError::Validation(format!("{} cannot be null", field))),
        other => Ok(other.flatten()),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ActivityDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: i32,
    pub date: NaiveDate,
    /// `HH:MM`.
    pub time: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub image: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Activity> for ActivityDto {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            title: a.title,
            description: a.description,
            category: a.category,
            date: a.date,
            time: a.time.format("%H:%M").to_string(),
            location: a.location,
            duration: a.duration,
            image: a.image,
            created_by: a.created_by,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CategoryDto {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CategoryActivityDto {
    #[serde(flatten)]
    pub activity: ActivityDto,
    pub category_title: String,
    pub attendee_count: i64,
    pub registration_count: i64,
    /// The caller's own RSVP, if any.
    pub user_response: Option<String>,
}

impl From<CategoryActivity> for CategoryActivityDto {
    fn from(c: CategoryActivity) -> Self {
        Self {
            activity: c.activity.into(),
            category_title: c.category_title,
            attendee_count: c.attendee_count,
            registration_count: c.registration_count,
            user_response: c.user_response.map(|r| r.to_string()),
        }
    }
}

//=========================================================================================
// Response (RSVP) Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SubmitResponseRequest {
    /// One of `attend`, `not_attend`, `time_conflict`.
    pub response_type: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResponseDto {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub response_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ActivityResponse> for ResponseDto {
    fn from(r: ActivityResponse) -> Self {
        Self {
            id: r.id,
            activity_id: r.activity_id,
            user_id: r.user_id,
            response_type: r.response_type.to_string(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResponderDto {
    #[serde(flatten)]
    pub response: ResponseDto,
    pub name: String,
    pub student_id: Option<String>,
}

impl From<ResponderEntry> for ResponderDto {
    fn from(e: ResponderEntry) -> Self {
        Self {
            response: e.response.into(),
            name: e.name,
            student_id: e.student_id,
        }
    }
}

//=========================================================================================
// Analytics Payloads
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RecomputeResponse {
    pub recomputed: usize,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OverviewDto {
    pub total_activities: i64,
    pub total_participants: i64,
    pub total_attendees: i64,
    pub avg_completion_rate: Option<f64>,
}

impl From<OverviewStats> for OverviewDto {
    fn from(o: OverviewStats) -> Self {
        Self {
            total_activities: o.total_activities,
            total_participants: o.total_participants,
            total_attendees: o.total_attendees,
            avg_completion_rate: o.avg_completion_rate,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MonthlyDto {
    /// `YYYY-MM`.
    pub month: String,
    pub activities_count: i64,
    pub participants_count: i64,
    pub attendees_count: i64,
}

impl From<MonthlyBucket> for MonthlyDto {
    fn from(m: MonthlyBucket) -> Self {
        Self {
            month: m.month,
            activities_count: m.activities_count,
            participants_count: m.participants_count,
            attendees_count: m.attendees_count,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CategoryDistributionDto {
    pub category_id: i32,
    pub category_title: String,
    pub activities_count: i64,
    pub registrations: i64,
    pub participants_count: i64,
    pub attendees_count: i64,
    pub avg_completion_rate: Option<f64>,
}

impl From<CategoryDistribution> for CategoryDistributionDto {
    fn from(c: CategoryDistribution) -> Self {
        Self {
            category_id: c.category_id,
            category_title: c.category_title,
            activities_count: c.activities_count,
            registrations: c.registrations,
            participants_count: c.participants_count,
            attendees_count: c.attendees_count,
            avg_completion_rate: c.avg_completion_rate,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TopActivityDto {
    pub id: Uuid,
    pub title: String,
    pub category: i32,
    pub date: NaiveDate,
    pub attendee_count: i64,
    pub registration_count: i64,
    pub completion_rate: Option<f64>,
}

impl From<TopActivity> for TopActivityDto {
    fn from(t: TopActivity) -> Self {
        Self {
            id: t.id,
            title: t.title,
            category: t.category,
            date: t.date,
            attendee_count: t.attendee_count,
            registration_count: t.registration_count,
            completion_rate: t.completion_rate,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PopularActivityDto {
    pub id: Uuid,
    pub title: String,
    pub category_title: String,
    pub category_description: Option<String>,
    pub registrations: i64,
}

impl From<PopularActivity> for PopularActivityDto {
    fn from(p: PopularActivity) -> Self {
        Self {
            id: p.id,
            title: p.title,
            category_title: p.category_title,
            category_description: p.category_description,
            registrations: p.registrations,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PopularActivitiesResponse {
    pub data: Vec<PopularActivityDto>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RecentRegistrationDto {
    pub student: String,
    pub activity: String,
    pub time: DateTime<Utc>,
}

impl From<RecentRegistration> for RecentRegistrationDto {
    fn from(r: RecentRegistration) -> Self {
        Self {
            student: r.student,
            activity: r.activity,
            time: r.time,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RecentRegistrationsResponse {
    pub data: Vec<RecentRegistrationDto>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StudentStatsDto {
    pub activities_attended: i64,
    pub activities_responded: i64,
    pub upcoming_attending: i64,
}

impl From<StudentStats> for StudentStatsDto {
    fn from(s: StudentStats) -> Self {
        Self {
            activities_attended: s.activities_attended,
            activities_responded: s.activities_responded,
            upcoming_attending: s.upcoming_attending,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StudentActivityDto {
    pub activity_id: Uuid,
    pub activity: String,
    /// Category title.
    pub section: String,
    pub status: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub responded_at: DateTime<Utc>,
}

impl From<StudentActivity> for StudentActivityDto {
    fn from(s: StudentActivity) -> Self {
        Self {
            activity_id: s.activity_id,
            activity: s.activity,
            section: s.section,
            status: s.status.to_string(),
            image: s.image,
            description: s.description,
            responded_at: s.responded_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CategoryStatsDto {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub total_activities: i64,
    pub upcoming_activities: i64,
    pub attending_activities: i64,
}

impl From<CategoryStats> for CategoryStatsDto {
    fn from(c: CategoryStats) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            total_activities: c.total_activities,
            upcoming_activities: c.upcoming_activities,
            attending_activities: c.attending_activities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_ignores_unknown_keys() {
        let body = r#"{"location": "Gym", "created_by": "someone", "id": 5}"#;
        let req: UpdateActivityRequest = serde_json::from_str(body).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.location, Some(Some("Gym".to_string())));
        assert!(patch.title.is_none());
        assert!(patch.description.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn update_request_keeps_explicit_nulls() {
        let body = r#"{"description": null, "image": null}"#;
        let req: UpdateActivityRequest = serde_json::from_str(body).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.image, Some(None));
        assert!(patch.location.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn update_request_rejects_null_required_columns() {
        let req: UpdateActivityRequest = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert!(matches!(req.into_patch(), Err(PortError::Validation(_))));
    }

    #[test]
    fn create_request_rejects_bad_time() {
        let req = CreateActivityRequest {
            title: "Match".to_string(),
            description: None,
            category: 1,
            date: "2025-03-01".to_string(),
            time: "25:00".to_string(),
            location: None,
            duration: None,
            image: None,
        };
        assert!(req.into_new_activity().is_err());
    }

    #[test]
    fn blank_search_is_dropped() {
        let query = ActivityQuery {
            category: None,
            date: None,
            search: Some("   ".to_string()),
        };
        assert!(query.into_filter().unwrap().search.is_none());
    }
}
