//! crates/campus_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Identity
//=========================================================================================

/// The two kinds of account the platform knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(PortError::Unexpected(format!("Unknown role '{}'", other))),
        }
    }
}

/// The authenticated identity behind a request, resolved from a bearer token.
///
/// Core operations receive this explicitly instead of reading it from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), PortError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(PortError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub role: Role,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub hashed_password: String,
}

/// A validated registration, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub hashed_password: String,
    pub role: Role,
}

//=========================================================================================
// Activities
//=========================================================================================

/// Static reference data seeded at deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub image: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by an administrator when creating an activity.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: Option<String>,
    pub category: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub image: Option<String>,
}

/// A partial update. Only these columns can ever be patched.
///
/// The nullable columns carry two levels of `Option`: `None` leaves the column
/// untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<i32>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<Option<String>>,
    pub duration: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.location.is_none()
            && self.duration.is_none()
            && self.image.is_none()
    }

    /// Applies the patch to an in-memory activity.
    pub fn apply_to(&self, activity: &mut Activity) {
        if let Some(title) = &self.title {
            activity.title = title.clone();
        }
        if let Some(description) = &self.description {
            activity.description = description.clone();
        }
        if let Some(category) = self.category {
            activity.category = category;
        }
        if let Some(date) = self.date {
            activity.date = date;
        }
        if let Some(time) = self.time {
            activity.time = time;
        }
        if let Some(location) = &self.location {
            activity.location = location.clone();
        }
        if let Some(duration) = &self.duration {
            activity.duration = duration.clone();
        }
        if let Some(image) = &self.image {
            activity.image = image.clone();
        }
    }
}

/// Optional filters for the public activity listing.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub category: Option<i32>,
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        if self.category.is_some_and(|c| c != activity.category) {
            return false;
        }
        if self.date.is_some_and(|d| d != activity.date) {
            return false;
        }
        match self.search.as_deref() {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                activity.title.to_lowercase().contains(&needle)
                    || activity
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }
}

/// An activity inside a category listing, with the caller's own RSVP.
#[derive(Debug, Clone)]
pub struct CategoryActivity {
    pub activity: Activity,
    pub category_title: String,
    pub attendee_count: i64,
    pub registration_count: i64,
    pub user_response: Option<ResponseType>,
}

//=========================================================================================
// Responses and Analytics
//=========================================================================================

/// A student's stated intention regarding an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    Attend,
    NotAttend,
    TimeConflict,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Attend => "attend",
            ResponseType::NotAttend => "not_attend",
            ResponseType::TimeConflict => "time_conflict",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attend" => Ok(ResponseType::Attend),
            "not_attend" => Ok(ResponseType::NotAttend),
            "time_conflict" => Ok(ResponseType::TimeConflict),
            _ => Err(PortError::Validation(
                "Valid response type required (attend, not_attend, time_conflict)".to_string(),
            )),
        }
    }
}

/// One row per (activity, user) pair; later RSVPs overwrite it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub response_type: ResponseType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A response joined with the identity of whoever gave it.
#[derive(Debug, Clone)]
pub struct ResponderEntry {
    pub response: ActivityResponse,
    pub name: String,
    pub student_id: Option<String>,
}

/// Materialized per-activity summary, always re-derivable from the responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityAnalytics {
    pub activity_id: Uuid,
    pub attendee_count: i64,
    pub registration_count: i64,
    /// `None` when nobody has responded yet.
    pub completion_rate: Option<f64>,
    pub last_calculated: DateTime<Utc>,
}

/// The outcome of an RSVP: the stored row and the analytics it refreshed.
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub response: ActivityResponse,
    pub analytics: ActivityAnalytics,
}

//=========================================================================================
// Dashboard Rollups
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewStats {
    pub total_activities: i64,
    pub total_participants: i64,
    pub total_attendees: i64,
    pub avg_completion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    /// Calendar month formatted as `YYYY-MM`.
    pub month: String,
    pub activities_count: i64,
    pub participants_count: i64,
    pub attendees_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDistribution {
    pub category_id: i32,
    pub category_title: String,
    pub activities_count: i64,
    /// Total response rows across the category's activities.
    pub registrations: i64,
    /// Distinct users who responded to any activity in the category.
    pub participants_count: i64,
    pub attendees_count: i64,
    pub avg_completion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopActivity {
    pub id: Uuid,
    pub title: String,
    pub category: i32,
    pub date: NaiveDate,
    pub attendee_count: i64,
    pub registration_count: i64,
    pub completion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopularActivity {
    pub id: Uuid,
    pub title: String,
    pub category_title: String,
    pub category_description: Option<String>,
    pub registrations: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentRegistration {
    pub student: String,
    pub activity: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentStats {
    pub activities_attended: i64,
    pub activities_responded: i64,
    pub upcoming_attending: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentActivity {
    pub activity_id: Uuid,
    pub activity: String,
    pub section: String,
    pub status: ResponseType,
    pub image: Option<String>,
    pub description: Option<String>,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub total_activities: i64,
    pub upcoming_activities: i64,
    pub attending_activities: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_type_rejects_unknown_values() {
        assert_eq!("attend".parse::<ResponseType>().unwrap(), ResponseType::Attend);
        assert_eq!(
            "time_conflict".parse::<ResponseType>().unwrap(),
            ResponseType::TimeConflict
        );
        assert!(matches!(
            "maybe".parse::<ResponseType>(),
            Err(PortError::Validation(_))
        ));
    }

    #[test]
    fn filter_search_is_case_insensitive() {
        let now = Utc::now();
        let activity = Activity {
            id: Uuid::new_v4(),
            title: "Chess Club".to_string(),
            description: Some("Weekly OPEN tournament".to_string()),
            category: 4,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            location: None,
            duration: None,
            image: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        let by_description = ActivityFilter {
            search: Some("open".to_string()),
            ..Default::default()
        };
        assert!(by_description.matches(&activity));

        let wrong_category = ActivityFilter {
            category: Some(1),
            search: Some("chess".to_string()),
            ..Default::default()
        };
        assert!(!wrong_category.matches(&activity));
    }

    #[test]
    fn only_admins_pass_the_admin_gate() {
        let student = Caller { user_id: Uuid::new_v4(), role: Role::Student };
        let admin = Caller { user_id: Uuid::new_v4(), role: Role::Admin };
        assert!(matches!(student.require_admin(), Err(PortError::Forbidden(_))));
        assert!(admin.require_admin().is_ok());
    }
}
