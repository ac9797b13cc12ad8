//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use campus_core::domain::{
    Activity, ActivityAnalytics, ActivityFilter, ActivityPatch, ActivityResponse, Caller,
    Category, CategoryActivity, CategoryDistribution, CategoryStats, MonthlyBucket, NewActivity,
    NewUser, OverviewStats, PopularActivity, RecentRegistration, RecordedResponse,
    ResponderEntry, ResponseType, StudentActivity, StudentStats, TopActivity, User,
    UserCredentials,
};
use campus_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn activity_not_found(activity_id: Uuid) -> PortError {
    PortError::NotFound(format!("Activity {} not found", activity_id))
}

/// Escapes `LIKE` wildcards so user input is matched literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    student_id: Option<String>,
    role: String,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            student_id: self.student_id,
            role: self.role.parse()?,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            hashed_password: self.password_hash,
        })
    }
}

#[derive(FromRow)]
struct CallerRecord {
    id: Uuid,
    role: String,
}

#[derive(FromRow)]
struct CategoryRecord {
    id: i32,
    title: String,
    description: Option<String>,
}
impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct ActivityRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    category: i32,
    date: NaiveDate,
    time: NaiveTime,
    location: Option<String>,
    duration: Option<String>,
    image: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ActivityRecord {
    fn to_domain(self) -> Activity {
        Activity {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            date: self.date,
            time: self.time,
            location: self.location,
            duration: self.duration,
            image: self.image,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryActivityRecord {
    #[sqlx(flatten)]
    activity: ActivityRecord,
    category_title: String,
    attendee_count: i64,
    registration_count: i64,
    user_response: Option<String>,
}
impl CategoryActivityRecord {
    fn to_domain(self) -> PortResult<CategoryActivity> {
        Ok(CategoryActivity {
            activity: self.activity.to_domain(),
            category_title: self.category_title,
            attendee_count: self.attendee_count,
            registration_count: self.registration_count,
            user_response: self
                .user_response
                .as_deref()
                .map(str::parse::<ResponseType>)
                .transpose()?,
        })
    }
}

#[derive(FromRow)]
struct ResponseRecord {
    id: Uuid,
    activity_id: Uuid,
    user_id: Uuid,
    response_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ResponseRecord {
    fn to_domain(self) -> PortResult<ActivityResponse> {
        Ok(ActivityResponse {
            id: self.id,
            activity_id: self.activity_id,
            user_id: self.user_id,
            response_type: self.response_type.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ResponderRecord {
    #[sqlx(flatten)]
    response: ResponseRecord,
    name: String,
    student_id: Option<String>,
}
impl ResponderRecord {
    fn to_domain(self) -> PortResult<ResponderEntry> {
        Ok(ResponderEntry {
            response: self.response.to_domain()?,
            name: self.name,
            student_id: self.student_id,
        })
    }
}

#[derive(FromRow)]
struct AnalyticsRecord {
    activity_id: Uuid,
    attendee_count: i64,
    registration_count: i64,
    completion_rate: Option<f64>,
    last_calculated: DateTime<Utc>,
}
impl AnalyticsRecord {
    fn to_domain(self) -> ActivityAnalytics {
        ActivityAnalytics {
            activity_id: self.activity_id,
            attendee_count: self.attendee_count,
            registration_count: self.registration_count,
            completion_rate: self.completion_rate,
            last_calculated: self.last_calculated,
        }
    }
}

#[derive(FromRow)]
struct OverviewRecord {
    total_activities: i64,
    total_participants: i64,
    total_attendees: i64,
    avg_completion_rate: Option<f64>,
}

#[derive(FromRow)]
struct MonthlyRecord {
    month: String,
    activities_count: i64,
    participants_count: i64,
    attendees_count: i64,
}

#[derive(FromRow)]
struct CategoryDistributionRecord {
    category_id: i32,
    category_title: String,
    activities_count: i64,
    registrations: i64,
    participants_count: i64,
    attendees_count: i64,
    avg_completion_rate: Option<f64>,
}

#[derive(FromRow)]
struct TopActivityRecord {
    id: Uuid,
    title: String,
    category: i32,
    date: NaiveDate,
    attendee_count: i64,
    registration_count: i64,
    completion_rate: Option<f64>,
}

#[derive(FromRow)]
struct PopularActivityRecord {
    id: Uuid,
    title: String,
    category_title: String,
    category_description: Option<String>,
    registrations: i64,
}

#[derive(FromRow)]
struct RecentRegistrationRecord {
    student_name: String,
    activity_title: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct StudentStatsRecord {
    activities_attended: i64,
    activities_responded: i64,
    upcoming_attending: i64,
}

#[derive(FromRow)]
struct StudentActivityRecord {
    activity_id: Uuid,
    title: String,
    category_title: String,
    response_type: String,
    image: Option<String>,
    description: Option<String>,
    responded_at: DateTime<Utc>,
}
impl StudentActivityRecord {
    fn to_domain(self) -> PortResult<StudentActivity> {
        Ok(StudentActivity {
            activity_id: self.activity_id,
            activity: self.title,
            section: self.category_title,
            status: self.response_type.parse()?,
            image: self.image,
            description: self.description,
            responded_at: self.responded_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryStatsRecord {
    id: i32,
    title: String,
    description: Option<String>,
    total_activities: i64,
    upcoming_activities: i64,
    attending_activities: i64,
}

//=========================================================================================
// SQL
//=========================================================================================

const SQL_INSERT_USER: &str = r#"
INSERT INTO users (id, name, email, password_hash, student_id, role)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING id, name, email, student_id, role
"#;

const SQL_SELECT_ACTIVITIES: &str = r#"
SELECT id, title, description, category, date, time, location, duration, image,
       created_by, created_at, updated_at
FROM activities
WHERE ($1::INTEGER IS NULL OR category = $1)
  AND ($2::DATE IS NULL OR date = $2)
  AND ($3::TEXT IS NULL OR title ILIKE $3 OR description ILIKE $3)
ORDER BY date DESC, time ASC
"#;

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities
    (id, title, description, category, date, time, location, duration, image, created_by)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
RETURNING id, title, description, category, date, time, location, duration, image,
          created_by, created_at, updated_at
"#;

// Only these columns are patchable. Absent fields keep their stored value; the
// boolean flags mark nullable columns that were sent, including as null.
const SQL_UPDATE_ACTIVITY: &str = r#"
UPDATE activities SET
    title       = COALESCE($2, title),
    description = CASE WHEN $3 THEN $4 ELSE description END,
    category    = COALESCE($5, category),
    date        = COALESCE($6, date),
    time        = COALESCE($7, time),
    location    = CASE WHEN $8 THEN $9 ELSE location END,
    duration    = CASE WHEN $10 THEN $11 ELSE duration END,
    image       = CASE WHEN $12 THEN $13 ELSE image END,
    updated_at  = NOW()
WHERE id = $1
RETURNING id, title, description, category, date, time, location, duration, image,
          created_by, created_at, updated_at
"#;

const SQL_CATEGORY_ACTIVITIES: &str = r#"
SELECT a.id, a.title, a.description, a.category, a.date, a.time, a.location, a.duration,
       a.image, a.created_by, a.created_at, a.updated_at,
       c.title AS category_title,
       COUNT(DISTINCT ar.user_id) FILTER (WHERE ar.response_type = 'attend') AS attendee_count,
       COUNT(DISTINCT ar.user_id) AS registration_count,
       mine.response_type AS user_response
FROM activities a
JOIN activity_categories c ON c.id = a.category
LEFT JOIN activity_responses ar ON ar.activity_id = a.id
LEFT JOIN activity_responses mine ON mine.activity_id = a.id AND mine.user_id = $2
WHERE a.category = $1
GROUP BY a.id, c.title, mine.response_type
ORDER BY a.date DESC, a.time ASC
"#;

// Serializes concurrent submissions for the same activity so each recompute
// sees every response committed before it.
const SQL_LOCK_ACTIVITY: &str = r#"
SELECT id FROM activities WHERE id = $1 FOR NO KEY UPDATE
"#;

const SQL_UPSERT_RESPONSE: &str = r#"
INSERT INTO activity_responses (id, activity_id, user_id, response_type)
VALUES ($1, $2, $3, $4)
ON CONFLICT (activity_id, user_id)
DO UPDATE SET response_type = EXCLUDED.response_type, updated_at = NOW()
RETURNING id, activity_id, user_id, response_type, created_at, updated_at
"#;

const SQL_RECOMPUTE_ANALYTICS: &str = r#"
INSERT INTO activity_analytics
    (activity_id, attendee_count, registration_count, completion_rate, last_calculated)
SELECT $1,
       t.attendees,
       t.registrations,
       CASE WHEN t.registrations > 0
            THEN t.attendees::DOUBLE PRECISION / t.registrations * 100
       END,
       NOW()
FROM (
    SELECT COUNT(DISTINCT user_id) FILTER (WHERE response_type = 'attend') AS attendees,
           COUNT(DISTINCT user_id) AS registrations
    FROM activity_responses
    WHERE activity_id = $1
) t
ON CONFLICT (activity_id) DO UPDATE SET
    attendee_count     = EXCLUDED.attendee_count,
    registration_count = EXCLUDED.registration_count,
    completion_rate    = EXCLUDED.completion_rate,
    last_calculated    = EXCLUDED.last_calculated
RETURNING activity_id, attendee_count, registration_count, completion_rate, last_calculated
"#;

const SQL_LIST_RESPONSES: &str = r#"
SELECT ar.id, ar.activity_id, ar.user_id, ar.response_type, ar.created_at, ar.updated_at,
       u.name, u.student_id
FROM activity_responses ar
JOIN users u ON u.id = ar.user_id
WHERE ar.activity_id = $1
ORDER BY ar.created_at DESC
"#;

const SQL_OVERVIEW: &str = r#"
SELECT
    (SELECT COUNT(*) FROM activities) AS total_activities,
    (SELECT COUNT(DISTINCT user_id) FROM activity_responses) AS total_participants,
    (SELECT COUNT(DISTINCT user_id) FROM activity_responses
      WHERE response_type = 'attend') AS total_attendees,
    (SELECT AVG(completion_rate) FROM activity_analytics
      WHERE registration_count > 0) AS avg_completion_rate
"#;

const SQL_MONTHLY: &str = r#"
SELECT TO_CHAR(DATE_TRUNC('month', a.date), 'YYYY-MM') AS month,
       COUNT(DISTINCT a.id) AS activities_count,
       COUNT(DISTINCT ar.user_id) AS participants_count,
       COUNT(DISTINCT ar.user_id) FILTER (WHERE ar.response_type = 'attend') AS attendees_count
FROM activities a
LEFT JOIN activity_responses ar ON ar.activity_id = a.id
GROUP BY 1
ORDER BY 1 DESC
LIMIT $1
"#;

const SQL_CATEGORY_DISTRIBUTION: &str = r#"
SELECT c.id AS category_id,
       c.title AS category_title,
       COUNT(DISTINCT a.id) AS activities_count,
       COUNT(ar.id) AS registrations,
       COUNT(DISTINCT ar.user_id) AS participants_count,
       COUNT(DISTINCT ar.user_id) FILTER (WHERE ar.response_type = 'attend') AS attendees_count,
       (SELECT AVG(aa.completion_rate)
          FROM activity_analytics aa
          JOIN activities a2 ON a2.id = aa.activity_id
         WHERE a2.category = c.id AND aa.registration_count > 0) AS avg_completion_rate
FROM activity_categories c
LEFT JOIN activities a ON a.category = c.id
LEFT JOIN activity_responses ar ON ar.activity_id = a.id
GROUP BY c.id, c.title
ORDER BY activities_count DESC, c.id ASC
"#;

const SQL_TOP_ACTIVITIES: &str = r#"
SELECT a.id, a.title, a.category, a.date,
       aa.attendee_count, aa.registration_count, aa.completion_rate
FROM activities a
JOIN activity_analytics aa ON aa.activity_id = a.id
ORDER BY aa.attendee_count DESC, aa.registration_count DESC, a.title ASC
LIMIT $1
"#;

const SQL_POPULAR_ACTIVITIES: &str = r#"
SELECT a.id, a.title,
       c.title AS category_title,
       c.description AS category_description,
       COUNT(ar.id) AS registrations
FROM activities a
JOIN activity_categories c ON c.id = a.category
LEFT JOIN activity_responses ar ON ar.activity_id = a.id
GROUP BY a.id, c.title, c.description
ORDER BY registrations DESC, a.title ASC
LIMIT $1
"#;

const SQL_RECENT_REGISTRATIONS: &str = r#"
SELECT u.name AS student_name, a.title AS activity_title, ar.created_at
FROM activity_responses ar
JOIN users u ON u.id = ar.user_id
JOIN activities a ON a.id = ar.activity_id
WHERE u.role = 'student'
ORDER BY ar.created_at DESC
LIMIT $1
"#;

const SQL_STUDENT_STATS: &str = r#"
SELECT COUNT(*) FILTER (WHERE ar.response_type = 'attend') AS activities_attended,
       COUNT(*) AS activities_responded,
       COUNT(*) FILTER (WHERE ar.response_type = 'attend' AND a.date >= $2) AS upcoming_attending
FROM activity_responses ar
JOIN activities a ON a.id = ar.activity_id
WHERE ar.user_id = $1
"#;

const SQL_RECENT_STUDENT_ACTIVITIES: &str = r#"
SELECT a.id AS activity_id, a.title, c.title AS category_title, ar.response_type,
       a.image, a.description, ar.updated_at AS responded_at
FROM activity_responses ar
JOIN activities a ON a.id = ar.activity_id
JOIN activity_categories c ON c.id = a.category
WHERE ar.user_id = $1
ORDER BY ar.updated_at DESC
LIMIT $2
"#;

const SQL_CATEGORY_STATS: &str = r#"
SELECT c.id, c.title, c.description,
       COUNT(DISTINCT a.id) AS total_activities,
       COUNT(DISTINCT a.id) FILTER (WHERE a.date >= $2) AS upcoming_activities,
       COUNT(DISTINCT ar.activity_id)
           FILTER (WHERE ar.user_id = $1 AND ar.response_type = 'attend') AS attending_activities
FROM activity_categories c
LEFT JOIN activities a ON a.category = c.id
LEFT JOIN activity_responses ar ON ar.activity_id = a.id
GROUP BY c.id, c.title, c.description
ORDER BY c.id ASC
"#;

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(SQL_INSERT_USER)
            .bind(Uuid::new_v4())
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .bind(&new_user.student_id)
            .bind(new_user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict("Student ID or Email already registered".to_string())
                } else {
                    unexpected(e)
                }
            })?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, student_id, role FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, name, email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_credentials_by_student_id(
        &self,
        student_id: &str,
    ) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, name, email, role, password_hash FROM users WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Student {} not found", student_id))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Caller> {
        let record = sqlx::query_as::<_, CallerRecord>(
            "SELECT u.id, u.role FROM auth_sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        Ok(Caller {
            user_id: record.id,
            role: record.role.parse()?,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, title, description FROM activity_categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
    }

    async fn category_exists(&self, category_id: i32) -> PortResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM activity_categories WHERE id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(exists)
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> PortResult<Vec<Activity>> {
        let records = sqlx::query_as::<_, ActivityRecord>(SQL_SELECT_ACTIVITIES)
            .bind(filter.category)
            .bind(filter.date)
            .bind(filter.search.as_deref().map(like_pattern))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ActivityRecord::to_domain).collect())
    }

    async fn list_activity_ids(&self) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM activities ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity> {
        let record = sqlx::query_as::<_, ActivityRecord>(
            "SELECT id, title, description, category, date, time, location, duration, image, \
             created_by, created_at, updated_at FROM activities WHERE id = $1",
        )
        .bind(activity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => activity_not_found(activity_id),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_activity(
        &self,
        created_by: Uuid,
        activity: &NewActivity,
    ) -> PortResult<Activity> {
        let record = sqlx::query_as::<_, ActivityRecord>(SQL_INSERT_ACTIVITY)
            .bind(Uuid::new_v4())
            .bind(&activity.title)
            .bind(&activity.description)
            .bind(activity.category)
            .bind(activity.date)
            .bind(activity.time)
            .bind(&activity.location)
            .bind(&activity.duration)
            .bind(&activity.image)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_activity(
        &self,
        activity_id: Uuid,
        patch: &ActivityPatch,
    ) -> PortResult<Activity> {
        let record = sqlx::query_as::<_, ActivityRecord>(SQL_UPDATE_ACTIVITY)
            .bind(activity_id)
            .bind(&patch.title)
            .bind(patch.description.is_some())
            .bind(patch.description.clone().flatten())
            .bind(patch.category)
            .bind(patch.date)
            .bind(patch.time)
            .bind(patch.location.is_some())
            .bind(patch.location.clone().flatten())
            .bind(patch.duration.is_some())
            .bind(patch.duration.clone().flatten())
            .bind(patch.image.is_some())
            .bind(patch.image.clone().flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| activity_not_found(activity_id))?;
        Ok(record.to_domain())
    }

    async fn delete_activity(&self, activity_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(activity_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(activity_not_found(activity_id));
        }
        Ok(())
    }

    async fn category_activities(
        &self,
        category_id: i32,
        user_id: Uuid,
    ) -> PortResult<Vec<CategoryActivity>> {
        let records = sqlx::query_as::<_, CategoryActivityRecord>(SQL_CATEGORY_ACTIVITIES)
            .bind(category_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records
            .into_iter()
            .map(CategoryActivityRecord::to_domain)
            .collect()
    }

    async fn record_response(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        response_type: ResponseType,
    ) -> PortResult<RecordedResponse> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(SQL_LOCK_ACTIVITY)
            .bind(activity_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| activity_not_found(activity_id))?;

        let response = sqlx::query_as::<_, ResponseRecord>(SQL_UPSERT_RESPONSE)
            .bind(Uuid::new_v4())
            .bind(activity_id)
            .bind(user_id)
            .bind(response_type.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        let analytics = sqlx::query_as::<_, AnalyticsRecord>(SQL_RECOMPUTE_ANALYTICS)
            .bind(activity_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        debug!(%activity_id, %user_id, "Response upserted and analytics refreshed");

        Ok(RecordedResponse {
            response: response.to_domain()?,
            analytics: analytics.to_domain(),
        })
    }

    async fn recompute_analytics(&self, activity_id: Uuid) -> PortResult<ActivityAnalytics> {
        let record = sqlx::query_as::<_, AnalyticsRecord>(SQL_RECOMPUTE_ANALYTICS)
            .bind(activity_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    activity_not_found(activity_id)
                } else {
                    unexpected(e)
                }
            })?;
        Ok(record.to_domain())
    }

    async fn get_analytics(&self, activity_id: Uuid) -> PortResult<Option<ActivityAnalytics>> {
        let record = sqlx::query_as::<_, AnalyticsRecord>(
            "SELECT activity_id, attendee_count, registration_count, completion_rate, \
             last_calculated FROM activity_analytics WHERE activity_id = $1",
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(AnalyticsRecord::to_domain))
    }

    async fn list_responses(&self, activity_id: Uuid) -> PortResult<Vec<ResponderEntry>> {
        let records = sqlx::query_as::<_, ResponderRecord>(SQL_LIST_RESPONSES)
            .bind(activity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(ResponderRecord::to_domain).collect()
    }

    async fn overview(&self) -> PortResult<OverviewStats> {
        let record = sqlx::query_as::<_, OverviewRecord>(SQL_OVERVIEW)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(OverviewStats {
            total_activities: record.total_activities,
            total_participants: record.total_participants,
            total_attendees: record.total_attendees,
            avg_completion_rate: record.avg_completion_rate,
        })
    }

    async fn monthly(&self, limit: i64) -> PortResult<Vec<MonthlyBucket>> {
        let records = sqlx::query_as::<_, MonthlyRecord>(SQL_MONTHLY)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| MonthlyBucket {
                month: r.month,
                activities_count: r.activities_count,
                participants_count: r.participants_count,
                attendees_count: r.attendees_count,
            })
            .collect())
    }

    async fn category_distribution(&self) -> PortResult<Vec<CategoryDistribution>> {
        let records = sqlx::query_as::<_, CategoryDistributionRecord>(SQL_CATEGORY_DISTRIBUTION)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| CategoryDistribution {
                category_id: r.category_id,
                category_title: r.category_title,
                activities_count: r.activities_count,
                registrations: r.registrations,
                participants_count: r.participants_count,
                attendees_count: r.attendees_count,
                avg_completion_rate: r.avg_completion_rate,
            })
            .collect())
    }

    async fn top_activities(&self, limit: i64) -> PortResult<Vec<TopActivity>> {
        let records = sqlx::query_as::<_, TopActivityRecord>(SQL_TOP_ACTIVITIES)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| TopActivity {
                id: r.id,
                title: r.title,
                category: r.category,
                date: r.date,
                attendee_count: r.attendee_count,
                registration_count: r.registration_count,
                completion_rate: r.completion_rate,
            })
            .collect())
    }

    async fn popular_activities(&self, limit: i64) -> PortResult<Vec<PopularActivity>> {
        let records = sqlx::query_as::<_, PopularActivityRecord>(SQL_POPULAR_ACTIVITIES)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| PopularActivity {
                id: r.id,
                title: r.title,
                category_title: r.category_title,
                category_description: r.category_description,
                registrations: r.registrations,
            })
            .collect())
    }

    async fn recent_registrations(&self, limit: i64) -> PortResult<Vec<RecentRegistration>> {
        let records = sqlx::query_as::<_, RecentRegistrationRecord>(SQL_RECENT_REGISTRATIONS)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| RecentRegistration {
                student: r.student_name,
                activity: r.activity_title,
                time: r.created_at,
            })
            .collect())
    }

    async fn student_stats(&self, user_id: Uuid, today: NaiveDate) -> PortResult<StudentStats> {
        let record = sqlx::query_as::<_, StudentStatsRecord>(SQL_STUDENT_STATS)
            .bind(user_id)
            .bind(today)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(StudentStats {
            activities_attended: record.activities_attended,
            activities_responded: record.activities_responded,
            upcoming_attending: record.upcoming_attending,
        })
    }

    async fn recent_student_activities(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<StudentActivity>> {
        let records =
            sqlx::query_as::<_, StudentActivityRecord>(SQL_RECENT_STUDENT_ACTIVITIES)
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(unexpected)?;
        records
            .into_iter()
            .map(StudentActivityRecord::to_domain)
            .collect()
    }

    async fn category_stats(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<Vec<CategoryStats>> {
        let records = sqlx::query_as::<_, CategoryStatsRecord>(SQL_CATEGORY_STATS)
            .bind(user_id)
            .bind(today)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| CategoryStats {
                id: r.id,
                title: r.title,
                description: r.description,
                total_activities: r.total_activities,
                upcoming_activities: r.upcoming_activities,
                attending_activities: r.attending_activities,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("chess"), "%chess%");
        assert_eq!(like_pattern("100%_fun"), "%100\\%\\_fun%");
    }
}
