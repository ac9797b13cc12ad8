mod common;

use axum::http::{Method, StatusCode};
use campus_core::Role;
use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_activity(app: &TestApp, admin_token: &str, title: &str) -> String {
    let (status, body) = app
        .send(
            Method::POST,
            "/activities",
            Some(admin_token),
            Some(json!({
                "title": title,
                "description": "Open to all students",
                "category": 1,
                "date": "2025-04-10",
                "time": "9:30",
                "location": "Main Hall"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["time"], "09:30");
    body["id"].as_str().unwrap().to_string()
}

fn error_kind(body: &Value) -> &str {
    body["error"]["kind"].as_str().unwrap()
}

#[tokio::test]
async fn rsvp_overwrites_and_feeds_the_dashboard() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let (student, token) = app.signed_in("Lina", Role::Student).await;
    let activity = create_activity(&app, &admin, "Debate Night").await;
    let uri = format!("/activities/{}/responses", activity);

    let (status, first) = app
        .send(Method::POST, &uri, Some(&token), Some(json!({"response_type": "attend"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["response_type"], "attend");
    assert_eq!(first["user_id"], student.user_id.to_string());

    let (status, second) = app
        .send(Method::POST, &uri, Some(&token), Some(json!({"response_type": "not_attend"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["response_type"], "not_attend");

    let (status, rows) = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Lina");

    let (status, overview) = app
        .send(Method::GET, "/analytics/overview", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["total_activities"], 1);
    assert_eq!(overview["total_participants"], 1);
    assert_eq!(overview["total_attendees"], 0);
    assert_eq!(overview["avg_completion_rate"], 0.0);

    let (_, top) = app
        .send(Method::GET, "/analytics/top-activities", Some(&admin), None)
        .await;
    assert_eq!(top[0]["registration_count"], 1);
    assert_eq!(top[0]["completion_rate"], 0.0);
}

#[tokio::test]
async fn unknown_response_type_is_a_validation_error() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let (_, token) = app.signed_in("Tariq", Role::Student).await;
    let activity = create_activity(&app, &admin, "Hackathon").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/activities/{}/responses", activity),
            Some(&token),
            Some(json!({"response_type": "maybe"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");
    assert_eq!(app.db.response_count().await, 0);
}

#[tokio::test]
async fn unknown_activity_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.signed_in("Mona", Role::Student).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/activities/{}/responses", Uuid::new_v4()),
            Some(&token),
            Some(json!({"response_type": "attend"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");

    let (status, _) = app
        .send(Method::GET, &format!("/activities/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new();
    let uri = format!("/activities/{}/responses", Uuid::new_v4());
    let body = json!({"response_type": "attend"});

    let (status, payload) = app.send(Method::POST, &uri, None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_kind(&payload), "unauthorized");

    let (status, _) = app
        .send(Method::POST, &uri, Some("not-a-session"), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads of the catalogue stay public.
    let (status, list) = app.send(Method::GET, "/activities", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn students_are_forbidden_from_admin_routes() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let (_, token) = app.signed_in("Nour", Role::Student).await;
    let activity = create_activity(&app, &admin, "Poetry Evening").await;

    for uri in ["/analytics/overview", "/analytics/monthly", "/analytics/categories"] {
        let (status, body) = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(error_kind(&body), "forbidden");
    }

    let (status, _) = app
        .send(Method::DELETE, &format!("/activities/{}", activity), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/activities",
            Some(&token),
            Some(json!({"title": "Sneaky", "category": 1, "date": "2025-01-01", "time": "10:00"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_renders_structured_errors() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let activity = create_activity(&app, &admin, "Art Fair").await;

    let (status, body) = app
        .send(Method::GET, "/activities/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (status, body) = app
        .send(Method::GET, "/activities?date=10-04-2025", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/activities/{}", activity),
            Some(&admin),
            Some(json!({"created_by": "someone-else"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No valid updates provided");

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/activities/{}", activity),
            Some(&admin),
            Some(json!({"location": "Courtyard", "id": "ignored"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Courtyard");
    assert_eq!(updated["id"], activity);
}

#[tokio::test]
async fn public_feeds_are_wrapped_in_data() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let (_, token) = app.signed_in("Sara", Role::Student).await;
    let activity = create_activity(&app, &admin, "Career Day").await;
    app.send(
        Method::POST,
        &format!("/activities/{}/responses", activity),
        Some(&token),
        Some(json!({"response_type": "attend"})),
    )
    .await;

    let (status, popular) = app
        .send(Method::GET, "/analytics/popular-activities", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(popular["data"][0]["title"], "Career Day");
    assert_eq!(popular["data"][0]["category_title"], "Sports");

    let (status, recent) = app
        .send(Method::GET, "/analytics/recent-registrations", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent["data"][0]["student"], "Sara");
    assert_eq!(recent["data"][0]["activity"], "Career Day");

    let (status, stats) = app
        .send(Method::GET, "/analytics/student-stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["activities_responded"], 1);

    let (status, details) = app
        .send(Method::GET, "/activities/category/1/details", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details[0]["user_response"], "attend");
    assert_eq!(details[0]["attendee_count"], 1);
}

#[tokio::test]
async fn null_in_an_update_clears_optional_columns_only() {
    let app = TestApp::new();
    let (_, admin) = app.signed_in("Dean", Role::Admin).await;
    let activity = create_activity(&app, &admin, "Film Club").await;
    let uri = format!("/activities/{}", activity);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&admin), Some(json!({"description": null})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["description"], Value::Null);
    assert_eq!(body["location"], "Main Hall");
    assert_eq!(body["title"], "Film Club");

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&admin), Some(json!({"title": null})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (_, fetched) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(fetched["description"], Value::Null);
    assert_eq!(fetched["title"], "Film Club");
}
