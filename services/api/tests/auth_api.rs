mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn student_can_register_log_in_and_log_out() {
    let app = TestApp::new();

    let (status, registered) = app
        .send(
            Method::POST,
            "/auth/student/register",
            None,
            Some(json!({
                "name": "Omar",
                "student_id": "202312345",
                "email": "omar@campus.test",
                "password": "long-enough"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", registered);
    assert_eq!(registered["user"]["role"], "student");
    let token = registered["token"].as_str().unwrap().to_string();

    let (status, me) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["student_id"], "202312345");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/student/login",
            None,
            Some(json!({"student_id": "202312345", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "unauthorized");

    let (status, login) = app
        .send(
            Method::POST,
            "/auth/student/login",
            None,
            Some(json!({"student_id": "202312345", "password": "long-enough"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = login["token"].as_str().unwrap().to_string();
    assert_ne!(second, token);

    let (status, _) = app.send(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(Method::GET, "/auth/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn registration_rejects_bad_and_duplicate_input() {
    let app = TestApp::new();
    let student = json!({
        "name": "Huda",
        "student_id": "202300011",
        "email": "huda@campus.test",
        "password": "long-enough"
    });

    let (status, _) = app
        .send(Method::POST, "/auth/student/register", None, Some(student.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, "/auth/student/register", None, Some(student))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/student/register",
            None,
            Some(json!({
                "name": "Karim",
                "student_id": "12345",
                "email": "karim@campus.test",
                "password": "long-enough"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Student ID must be exactly 9 digits");

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/student/register",
            None,
            Some(json!({"name": "Missing fields"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_login_is_separate_from_student_login() {
    let app = TestApp::new();

    let (status, admin) = app
        .send(
            Method::POST,
            "/auth/admin/register",
            None,
            Some(json!({"name": "Dean", "email": "dean@campus.test", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admin["role"], "admin");

    let (status, login) = app
        .send(
            Method::POST,
            "/auth/admin/login",
            None,
            Some(json!({"email": "dean@campus.test", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::GET, "/analytics/overview", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/student/register",
            None,
            Some(json!({
                "name": "Sneaky",
                "student_id": "202399999",
                "email": "student@campus.test",
                "password": "long-enough"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/admin/login",
            None,
            Some(json!({"email": "student@campus.test", "password": "long-enough"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
