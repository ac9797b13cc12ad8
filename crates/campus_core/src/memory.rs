//! crates/campus_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It follows the
//! same rules as the PostgreSQL adapter (composite-key upsert, cascade on delete,
//! analytics derived from the full response set) and backs the test suites.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::analytics::{average_rate, month_key, ResponseTally};
use crate::domain::{
    Activity, ActivityAnalytics, ActivityFilter, ActivityPatch, ActivityResponse, Caller,
    Category, CategoryActivity, CategoryDistribution, CategoryStats, MonthlyBucket, NewActivity,
    NewUser, OverviewStats, PopularActivity, RecentRegistration, RecordedResponse,
    ResponderEntry, ResponseType, Role, StudentActivity, StudentStats, TopActivity, User,
    UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

/// The categories every deployment is seeded with.
pub fn seed_categories() -> Vec<Category> {
    [
        (1, "Sports", "Sports-related activities"),
        (2, "Cultural", "Cultural programs and events"),
        (3, "Scientific", "Science and research activities"),
        (4, "Extracurricular", "Other student activities"),
    ]
    .into_iter()
    .map(|(id, title, description)| Category {
        id,
        title: title.to_string(),
        description: Some(description.to_string()),
    })
    .collect()
}

struct StoredUser {
    user: User,
    hashed_password: String,
}

impl StoredUser {
    fn credentials(&self) -> UserCredentials {
        UserCredentials {
            user_id: self.user.id,
            name: self.user.name.clone(),
            email: self.user.email.clone(),
            role: self.user.role,
            hashed_password: self.hashed_password.clone(),
        }
    }
}

struct StoredResponse {
    response: ActivityResponse,
    /// Insertion order, breaks `created_at` ties.
    inserted: u64,
    /// Last write order, breaks `updated_at` ties.
    touched: u64,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    categories: Vec<Category>,
    activities: HashMap<Uuid, Activity>,
    responses: HashMap<(Uuid, Uuid), StoredResponse>,
    analytics: HashMap<Uuid, ActivityAnalytics>,
    clock: u64,
}

impl Tables {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn activity(&self, activity_id: Uuid) -> PortResult<&Activity> {
        self.activities
            .get(&activity_id)
            .ok_or_else(|| activity_not_found(activity_id))
    }

    fn category_title(&self, category_id: i32) -> String {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.title.clone())
            .unwrap_or_default()
    }

    fn responses_for(&self, activity_id: Uuid) -> impl Iterator<Item = &StoredResponse> {
        self.responses
            .values()
            .filter(move |r| r.response.activity_id == activity_id)
    }

    fn tally(&self, activity_id: Uuid) -> ResponseTally {
        ResponseTally::from_responses(
            self.responses_for(activity_id)
                .map(|r| &r.response.response_type),
        )
    }

    fn recompute(&mut self, activity_id: Uuid) -> ActivityAnalytics {
        let tally = self.tally(activity_id);
        let analytics = ActivityAnalytics {
            activity_id,
            attendee_count: tally.attendee_count,
            registration_count: tally.registration_count,
            completion_rate: tally.completion_rate(),
            last_calculated: Utc::now(),
        };
        self.analytics.insert(activity_id, analytics.clone());
        analytics
    }

    /// Distinct responders and distinct attendees over a set of activities.
    fn distinct_people(&self, activity_ids: &HashSet<Uuid>) -> (i64, i64) {
        let mut participants = HashSet::new();
        let mut attendees = HashSet::new();
        for stored in self.responses.values() {
            let response = &stored.response;
            if !activity_ids.contains(&response.activity_id) {
                continue;
            }
            participants.insert(response.user_id);
            if response.response_type == ResponseType::Attend {
                attendees.insert(response.user_id);
            }
        }
        (participants.len() as i64, attendees.len() as i64)
    }

    fn average_completion(&self, activity_ids: &HashSet<Uuid>) -> Option<f64> {
        average_rate(
            self.analytics
                .values()
                .filter(|a| activity_ids.contains(&a.activity_id) && a.registration_count > 0)
                .map(|a| a.completion_rate),
        )
    }
}

fn activity_not_found(activity_id: Uuid) -> PortError {
    PortError::NotFound(format!("Activity {} not found", activity_id))
}

fn sort_by_schedule(activities: &mut [Activity]) {
    activities.sort_by(|a, b| b.date.cmp(&a.date).then(a.time.cmp(&b.time)));
}

/// A `DatabaseService` that keeps everything in memory.
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    available: AtomicBool,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    /// Creates an empty store seeded with the standard categories.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                categories: seed_categories(),
                ..Default::default()
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the store going away; every call fails until it is back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored response rows across all activities.
    pub async fn response_count(&self) -> usize {
        self.tables.lock().await.responses.len()
    }

    fn check_available(&self) -> PortResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PortError::Unexpected("store unavailable".to_string()))
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let taken = tables.users.values().any(|stored| {
            stored.user.email == new_user.email
                || (new_user.student_id.is_some() && stored.user.student_id == new_user.student_id)
        });
        if taken {
            return Err(PortError::Conflict(
                "Student ID or Email already registered".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            student_id: new_user.student_id,
            role: new_user.role,
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hashed_password: new_user.hashed_password,
            },
        );
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        tables
            .users
            .get(&user_id)
            .map(|stored| stored.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        tables
            .users
            .values()
            .find(|stored| stored.user.email == email)
            .map(StoredUser::credentials)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_credentials_by_student_id(
        &self,
        student_id: &str,
    ) -> PortResult<UserCredentials> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        tables
            .users
            .values()
            .find(|stored| stored.user.student_id.as_deref() == Some(student_id))
            .map(StoredUser::credentials)
            .ok_or_else(|| PortError::NotFound(format!("Student {} not found", student_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        tables
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Caller> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let (user_id, expires_at) = tables
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)?;
        if expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        let stored = tables.users.get(&user_id).ok_or(PortError::Unauthorized)?;
        Ok(Caller {
            user_id,
            role: stored.user.role,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.check_available()?;
        self.tables.lock().await.sessions.remove(session_id);
        Ok(())
    }

    async fn list_categories(&self) -> PortResult<Vec<Category>> {
        self.check_available()?;
        Ok(self.tables.lock().await.categories.clone())
    }

    async fn category_exists(&self, category_id: i32) -> PortResult<bool> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.categories.iter().any(|c| c.id == category_id))
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> PortResult<Vec<Activity>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut activities: Vec<Activity> = tables
            .activities
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_by_schedule(&mut activities);
        Ok(activities)
    }

    async fn list_activity_ids(&self) -> PortResult<Vec<Uuid>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.activities.keys().copied().collect())
    }

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        tables.activity(activity_id).cloned()
    }

    async fn create_activity(
        &self,
        created_by: Uuid,
        activity: &NewActivity,
    ) -> PortResult<Activity> {
        self.check_available()?;
        let now = Utc::now();
        let created = Activity {
            id: Uuid::new_v4(),
            title: activity.title.clone(),
            description: activity.description.clone(),
            category: activity.category,
            date: activity.date,
            time: activity.time,
            location: activity.location.clone(),
            duration: activity.duration.clone(),
            image: activity.image.clone(),
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .activities
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_activity(
        &self,
        activity_id: Uuid,
        patch: &ActivityPatch,
    ) -> PortResult<Activity> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let activity = tables
            .activities
            .get_mut(&activity_id)
            .ok_or_else(|| activity_not_found(activity_id))?;
        patch.apply_to(activity);
        activity.updated_at = Utc::now();
        Ok(activity.clone())
    }

    async fn delete_activity(&self, activity_id: Uuid) -> PortResult<()> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if tables.activities.remove(&activity_id).is_none() {
            return Err(activity_not_found(activity_id));
        }
        tables
            .responses
            .retain(|(activity, _), _| *activity != activity_id);
        tables.analytics.remove(&activity_id);
        Ok(())
    }

    async fn category_activities(
        &self,
        category_id: i32,
        user_id: Uuid,
    ) -> PortResult<Vec<CategoryActivity>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut activities: Vec<Activity> = tables
            .activities
            .values()
            .filter(|a| a.category == category_id)
            .cloned()
            .collect();
        sort_by_schedule(&mut activities);

        let category_title = tables.category_title(category_id);
        Ok(activities
            .into_iter()
            .map(|activity| {
                let tally = tables.tally(activity.id);
                let user_response = tables
                    .responses
                    .get(&(activity.id, user_id))
                    .map(|r| r.response.response_type);
                CategoryActivity {
                    activity,
                    category_title: category_title.clone(),
                    attendee_count: tally.attendee_count,
                    registration_count: tally.registration_count,
                    user_response,
                }
            })
            .collect())
    }

    async fn record_response(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        response_type: ResponseType,
    ) -> PortResult<RecordedResponse> {
        self.check_available()?;
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        tables.activity(activity_id)?;

        let now = Utc::now();
        let touched = tables.tick();
        let response = match tables.responses.get_mut(&(activity_id, user_id)) {
            Some(existing) => {
                existing.response.response_type = response_type;
                existing.response.updated_at = now;
                existing.touched = touched;
                existing.response.clone()
            }
            None => {
                let response = ActivityResponse {
                    id: Uuid::new_v4(),
                    activity_id,
                    user_id,
                    response_type,
                    created_at: now,
                    updated_at: now,
                };
                tables.responses.insert(
                    (activity_id, user_id),
                    StoredResponse {
                        response: response.clone(),
                        inserted: touched,
                        touched,
                    },
                );
                response
            }
        };
        let analytics = tables.recompute(activity_id);
        Ok(RecordedResponse { response, analytics })
    }

    async fn recompute_analytics(&self, activity_id: Uuid) -> PortResult<ActivityAnalytics> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        tables.activity(activity_id)?;
        Ok(tables.recompute(activity_id))
    }

    async fn get_analytics(&self, activity_id: Uuid) -> PortResult<Option<ActivityAnalytics>> {
        self.check_available()?;
        Ok(self.tables.lock().await.analytics.get(&activity_id).cloned())
    }

    async fn list_responses(&self, activity_id: Uuid) -> PortResult<Vec<ResponderEntry>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<&StoredResponse> = tables.responses_for(activity_id).collect();
        rows.sort_by(|a, b| b.inserted.cmp(&a.inserted));
        Ok(rows
            .into_iter()
            .map(|stored| {
                let user = tables.users.get(&stored.response.user_id);
                ResponderEntry {
                    response: stored.response.clone(),
                    name: user.map(|u| u.user.name.clone()).unwrap_or_default(),
                    student_id: user.and_then(|u| u.user.student_id.clone()),
                }
            })
            .collect())
    }

    async fn overview(&self) -> PortResult<OverviewStats> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let all: HashSet<Uuid> = tables.activities.keys().copied().collect();
        let (total_participants, total_attendees) = tables.distinct_people(&all);
        Ok(OverviewStats {
            total_activities: all.len() as i64,
            total_participants,
            total_attendees,
            avg_completion_rate: tables.average_completion(&all),
        })
    }

    async fn monthly(&self, limit: i64) -> PortResult<Vec<MonthlyBucket>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut months: HashMap<String, HashSet<Uuid>> = HashMap::new();
        for activity in tables.activities.values() {
            months
                .entry(month_key(activity.date))
                .or_default()
                .insert(activity.id);
        }

        let mut buckets: Vec<MonthlyBucket> = months
            .into_iter()
            .map(|(month, ids)| {
                let (participants_count, attendees_count) = tables.distinct_people(&ids);
                MonthlyBucket {
                    month,
                    activities_count: ids.len() as i64,
                    participants_count,
                    attendees_count,
                }
            })
            .collect();
        buckets.sort_by(|a, b| b.month.cmp(&a.month));
        buckets.truncate(limit.max(0) as usize);
        Ok(buckets)
    }

    async fn category_distribution(&self) -> PortResult<Vec<CategoryDistribution>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<CategoryDistribution> = tables
            .categories
            .iter()
            .map(|category| {
                let ids: HashSet<Uuid> = tables
                    .activities
                    .values()
                    .filter(|a| a.category == category.id)
                    .map(|a| a.id)
                    .collect();
                let registrations = tables
                    .responses
                    .values()
                    .filter(|r| ids.contains(&r.response.activity_id))
                    .count() as i64;
                let (participants_count, attendees_count) = tables.distinct_people(&ids);
                CategoryDistribution {
                    category_id: category.id,
                    category_title: category.title.clone(),
                    activities_count: ids.len() as i64,
                    registrations,
                    participants_count,
                    attendees_count,
                    avg_completion_rate: tables.average_completion(&ids),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.activities_count
                .cmp(&a.activities_count)
                .then(a.category_id.cmp(&b.category_id))
        });
        Ok(rows)
    }

    async fn top_activities(&self, limit: i64) -> PortResult<Vec<TopActivity>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<TopActivity> = tables
            .analytics
            .values()
            .filter_map(|analytics| {
                tables.activities.get(&analytics.activity_id).map(|activity| TopActivity {
                    id: activity.id,
                    title: activity.title.clone(),
                    category: activity.category,
                    date: activity.date,
                    attendee_count: analytics.attendee_count,
                    registration_count: analytics.registration_count,
                    completion_rate: analytics.completion_rate,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.attendee_count
                .cmp(&a.attendee_count)
                .then(b.registration_count.cmp(&a.registration_count))
                .then(a.title.cmp(&b.title))
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn popular_activities(&self, limit: i64) -> PortResult<Vec<PopularActivity>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<PopularActivity> = tables
            .activities
            .values()
            .map(|activity| {
                let category = tables.categories.iter().find(|c| c.id == activity.category);
                PopularActivity {
                    id: activity.id,
                    title: activity.title.clone(),
                    category_title: category.map(|c| c.title.clone()).unwrap_or_default(),
                    category_description: category.and_then(|c| c.description.clone()),
                    registrations: tables.tally(activity.id).registration_count,
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.registrations
                .cmp(&a.registrations)
                .then(a.title.cmp(&b.title))
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn recent_registrations(&self, limit: i64) -> PortResult<Vec<RecentRegistration>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<(&StoredResponse, &StoredUser, &Activity)> = tables
            .responses
            .values()
            .filter_map(|stored| {
                let user = tables.users.get(&stored.response.user_id)?;
                let activity = tables.activities.get(&stored.response.activity_id)?;
                (user.user.role == Role::Student).then_some((stored, user, activity))
            })
            .collect();
        rows.sort_by(|a, b| b.0.inserted.cmp(&a.0.inserted));
        Ok(rows
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(stored, user, activity)| RecentRegistration {
                student: user.user.name.clone(),
                activity: activity.title.clone(),
                time: stored.response.created_at,
            })
            .collect())
    }

    async fn student_stats(&self, user_id: Uuid, today: NaiveDate) -> PortResult<StudentStats> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut stats = StudentStats {
            activities_attended: 0,
            activities_responded: 0,
            upcoming_attending: 0,
        };
        for stored in tables.responses.values() {
            let response = &stored.response;
            if response.user_id != user_id {
                continue;
            }
            let Some(activity) = tables.activities.get(&response.activity_id) else {
                continue;
            };
            stats.activities_responded += 1;
            if response.response_type == ResponseType::Attend {
                stats.activities_attended += 1;
                if activity.date >= today {
                    stats.upcoming_attending += 1;
                }
            }
        }
        Ok(stats)
    }

    async fn recent_student_activities(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> PortResult<Vec<StudentActivity>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<(&StoredResponse, &Activity)> = tables
            .responses
            .values()
            .filter(|stored| stored.response.user_id == user_id)
            .filter_map(|stored| {
                tables
                    .activities
                    .get(&stored.response.activity_id)
                    .map(|activity| (stored, activity))
            })
            .collect();
        rows.sort_by(|a, b| b.0.touched.cmp(&a.0.touched));
        Ok(rows
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(stored, activity)| StudentActivity {
                activity_id: activity.id,
                activity: activity.title.clone(),
                section: tables.category_title(activity.category),
                status: stored.response.response_type,
                image: activity.image.clone(),
                description: activity.description.clone(),
                responded_at: stored.response.updated_at,
            })
            .collect())
    }

    async fn category_stats(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<Vec<CategoryStats>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .iter()
            .map(|category| {
                let activities: Vec<&Activity> = tables
                    .activities
                    .values()
                    .filter(|a| a.category == category.id)
                    .collect();
                let attending_activities = activities
                    .iter()
                    .filter(|a| {
                        tables
                            .responses
                            .get(&(a.id, user_id))
                            .is_some_and(|r| r.response.response_type == ResponseType::Attend)
                    })
                    .count() as i64;
                CategoryStats {
                    id: category.id,
                    title: category.title.clone(),
                    description: category.description.clone(),
                    total_activities: activities.len() as i64,
                    upcoming_activities: activities.iter().filter(|a| a.date >= today).count()
                        as i64,
                    attending_activities,
                }
            })
            .collect())
    }
}
