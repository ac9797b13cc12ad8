//! Runs the PostgreSQL adapter against a real database. `sqlx::test` creates a
//! fresh database per test from `DATABASE_URL` and applies `./migrations`.

use std::sync::Arc;

use campus_api::adapters::DbAdapter;
use campus_core::{
    ActivityPatch, ActivityService, Caller, DatabaseService, NewActivity, NewUser, PortError,
    ResponseType, Role,
};
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

async fn add_user(db: &DbAdapter, name: &str, role: Role, student_id: Option<&str>) -> Caller {
    let user = db
        .create_user(NewUser {
            name: name.to_string(),
            email: format!("{}@campus.test", name.to_lowercase()),
            student_id: student_id.map(str::to_string),
            hashed_password: "not-a-real-hash".to_string(),
            role,
        })
        .await
        .unwrap();
    Caller { user_id: user.id, role }
}

async fn add_activity(db: &DbAdapter, admin: &Caller, title: &str) -> Uuid {
    db.create_activity(
        admin.user_id,
        &NewActivity {
            title: title.to_string(),
            description: Some("Open to all students".to_string()),
            category: 1,
            date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            location: Some("Main Hall".to_string()),
            duration: Some("2 hours".to_string()),
            image: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn response_rows(pool: &PgPool, activity_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM activity_responses WHERE activity_id = $1")
        .bind(activity_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn latest_responses_drive_the_stored_aggregate(pool: PgPool) {
    let db = DbAdapter::new(pool.clone());
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let s1 = add_user(&db, "Omar", Role::Student, Some("202300001")).await;
    let s2 = add_user(&db, "Sara", Role::Student, Some("202300002")).await;
    let s3 = add_user(&db, "Yousef", Role::Student, Some("202300003")).await;
    let activity = add_activity(&db, &admin, "Robotics Workshop").await;

    let first = db
        .record_response(activity, s1.user_id, ResponseType::Attend)
        .await
        .unwrap();
    db.record_response(activity, s2.user_id, ResponseType::NotAttend)
        .await
        .unwrap();
    db.record_response(activity, s3.user_id, ResponseType::Attend)
        .await
        .unwrap();
    let last = db
        .record_response(activity, s1.user_id, ResponseType::NotAttend)
        .await
        .unwrap();

    assert_eq!(last.response.id, first.response.id);
    assert_eq!(last.response.created_at, first.response.created_at);
    assert_eq!(last.response.response_type, ResponseType::NotAttend);
    assert_eq!(response_rows(&pool, activity).await, 3);

    assert_eq!(last.analytics.registration_count, 3);
    assert_eq!(last.analytics.attendee_count, 1);
    let rate = last.analytics.completion_rate.unwrap();
    assert!((rate - 100.0 / 3.0).abs() < 1e-9);

    let stored = db.get_analytics(activity).await.unwrap().unwrap();
    assert_eq!(stored.registration_count, 3);
    assert_eq!(stored.attendee_count, 1);
    assert_eq!(stored.completion_rate, last.analytics.completion_rate);

    let overview = db.overview().await.unwrap();
    assert_eq!(overview.total_activities, 1);
    assert_eq!(overview.total_participants, 3);
    assert_eq!(overview.total_attendees, 1);
    assert!((overview.avg_completion_rate.unwrap() - 100.0 / 3.0).abs() < 1e-9);

    let monthly = db.monthly(12).await.unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].month, "2025-04");
    assert_eq!(monthly[0].activities_count, 1);
    assert_eq!(monthly[0].participants_count, 3);
    assert_eq!(monthly[0].attendees_count, 1);

    let categories = db.category_distribution().await.unwrap();
    let sports = categories.iter().find(|c| c.category_id == 1).unwrap();
    assert_eq!(sports.activities_count, 1);
    assert_eq!(sports.registrations, 3);
    assert_eq!(sports.participants_count, 3);
    assert_eq!(sports.attendees_count, 1);
    let empty = categories.iter().find(|c| c.category_id == 2).unwrap();
    assert_eq!(empty.activities_count, 0);
    assert_eq!(empty.avg_completion_rate, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn recompute_without_responses_and_twice_in_a_row(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let activity = add_activity(&db, &admin, "Quiet Hour").await;

    let empty = db.recompute_analytics(activity).await.unwrap();
    assert_eq!(empty.attendee_count, 0);
    assert_eq!(empty.registration_count, 0);
    assert_eq!(empty.completion_rate, None);

    let student = add_user(&db, "Lina", Role::Student, Some("202300001")).await;
    db.record_response(activity, student.user_id, ResponseType::Attend)
        .await
        .unwrap();

    let once = db.recompute_analytics(activity).await.unwrap();
    let twice = db.recompute_analytics(activity).await.unwrap();
    assert_eq!(once.attendee_count, 1);
    assert_eq!(once.completion_rate, Some(100.0));
    assert_eq!(twice.attendee_count, once.attendee_count);
    assert_eq!(twice.registration_count, once.registration_count);
    assert_eq!(twice.completion_rate, once.completion_rate);

    let ghost = db.recompute_analytics(Uuid::new_v4()).await;
    assert!(matches!(ghost, Err(PortError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn rejected_submissions_write_nothing(pool: PgPool) {
    let db = Arc::new(DbAdapter::new(pool.clone()));
    let service = ActivityService::new(db.clone());
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let student = add_user(&db, "Lina", Role::Student, Some("202300001")).await;
    let activity = add_activity(&db, &admin, "Chess Club").await;

    let maybe = service.submit_response(&student, activity, "maybe").await;
    assert!(matches!(maybe, Err(PortError::Validation(_))));

    let unknown = db
        .record_response(Uuid::new_v4(), student.user_id, ResponseType::Attend)
        .await;
    assert!(matches!(unknown, Err(PortError::NotFound(_))));

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_responses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
    let analytics: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_analytics")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(analytics, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_an_activity_cascades(pool: PgPool) {
    let db = DbAdapter::new(pool.clone());
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let student = add_user(&db, "Lina", Role::Student, Some("202300001")).await;
    let activity = add_activity(&db, &admin, "Art Fair").await;
    db.record_response(activity, student.user_id, ResponseType::Attend)
        .await
        .unwrap();

    db.delete_activity(activity).await.unwrap();

    assert_eq!(response_rows(&pool, activity).await, 0);
    assert!(db.get_analytics(activity).await.unwrap().is_none());
    assert!(matches!(
        db.delete_activity(activity).await,
        Err(PortError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_submissions_keep_one_row_per_student(pool: PgPool) {
    let db = Arc::new(DbAdapter::new(pool.clone()));
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let s1 = add_user(&db, "Omar", Role::Student, Some("202300001")).await;
    let s2 = add_user(&db, "Sara", Role::Student, Some("202300002")).await;
    let s3 = add_user(&db, "Yousef", Role::Student, Some("202300003")).await;
    let activity = add_activity(&db, &admin, "Hackathon").await;

    let repeat_user = s1.user_id;
    let mut handles = Vec::new();
    for i in 0..20 {
        let db = db.clone();
        let response_type = if i % 2 == 0 {
            ResponseType::Attend
        } else {
            ResponseType::TimeConflict
        };
        handles.push(tokio::spawn(async move {
            db.record_response(activity, repeat_user, response_type).await
        }));
    }
    for student in [s2, s3] {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.record_response(activity, student.user_id, ResponseType::Attend)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(response_rows(&pool, activity).await, 3);

    let stored = db.get_analytics(activity).await.unwrap().unwrap();
    let fresh = db.recompute_analytics(activity).await.unwrap();
    assert_eq!(stored.registration_count, 3);
    assert_eq!(stored.attendee_count, fresh.attendee_count);
    assert_eq!(stored.completion_rate, fresh.completion_rate);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_clears_only_the_named_columns(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let admin = add_user(&db, "Dean", Role::Admin, None).await;
    let activity = add_activity(&db, &admin, "Film Club").await;

    let updated = db
        .update_activity(
            activity,
            &ActivityPatch {
                description: Some(None),
                duration: Some(Some("90 minutes".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, None);
    assert_eq!(updated.duration.as_deref(), Some("90 minutes"));
    assert_eq!(updated.location.as_deref(), Some("Main Hall"));
    assert_eq!(updated.title, "Film Club");

    let missing = db
        .update_activity(
            Uuid::new_v4(),
            &ActivityPatch {
                title: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(missing, Err(PortError::NotFound(_))));
}
