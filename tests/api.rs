//! Integration tests driving the full router over the in-memory store.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, get, post_json, send_json};
use serde_json::json;

fn new_user(telegram_id: i64, nickname: &str) -> serde_json::Value {
    json!({ "telegramId": telegram_id, "nickname": nickname, "avatar": "🦊", "level": "A1" })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_store_kind() {
    let (app, _) = build_test_app().await;
    let response = get(app, "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["store"], "memory");
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_lookup_validates_telegram_id() {
    let (app, _) = build_test_app().await;

    let missing = get(app.clone(), "/api/v1/users").await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["error"], "telegram_id is required");

    let garbage = get(app.clone(), "/api/v1/users?telegram_id=abc").await;
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(garbage).await["code"], "BAD_REQUEST");

    let unknown = get(app, "/api/v1/users?telegram_id=123").await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert!(body_json(unknown).await["user"].is_null());
}

#[tokio::test]
async fn onboarding_creates_then_updates() {
    let (app, _) = build_test_app().await;

    let created = post_json(app.clone(), "/api/v1/users", new_user(100, "fox_one")).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let user = body_json(created).await["user"].clone();
    assert_eq!(user["nickname"], "fox_one");
    assert_eq!(user["total_xp"], 0);
    assert_eq!(user["theme"], "light");
    assert_eq!(user["is_onboarded"], true);

    let again = post_json(app.clone(), "/api/v1/users", new_user(100, "fox_two")).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["user"]["id"], user["id"]);

    let fetched = get(app, "/api/v1/users?telegram_id=100").await;
    assert_eq!(body_json(fetched).await["user"]["nickname"], "fox_two");
}

#[tokio::test]
async fn profile_update_never_sets_xp() {
    let (app, _) = build_test_app().await;
    post_json(app.clone(), "/api/v1/users", new_user(7, "steady")).await;

    let body = json!({ "telegramId": "7", "theme": "dark", "totalXp": 5000 });
    let response = send_json(app, Method::PUT, "/api/v1/users", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await["user"].clone();
    assert_eq!(user["theme"], "dark");
    assert_eq!(user["total_xp"], 0);
}

#[tokio::test]
async fn nickname_check_reports_reasons() {
    let (app, _) = build_test_app().await;
    post_json(app.clone(), "/api/v1/users", new_user(1, "taken_name")).await;

    let short = body_json(get(app.clone(), "/api/v1/users/check-nickname?nickname=ab").await).await;
    assert_eq!(short["available"], false);
    assert_eq!(short["reason"], "Nickname must be between 3 and 20 characters");

    let taken = body_json(get(app.clone(), "/api/v1/users/check-nickname?nickname=taken_name").await).await;
    assert_eq!(taken["available"], false);
    assert_eq!(taken["reason"], "Nickname is already taken");

    let own = body_json(
        get(app.clone(), "/api/v1/users/check-nickname?nickname=taken_name&telegram_id=1").await,
    )
    .await;
    assert_eq!(own["available"], true);
    assert!(own["reason"].is_null());

    let bad_chars = body_json(get(app, "/api/v1/users/check-nickname?nickname=no%20spaces").await).await;
    assert_eq!(
        bad_chars["reason"],
        "Nickname can only contain letters, numbers, underscore and dash"
    );
}

#[tokio::test]
async fn trailing_whitespace_in_nickname_is_rejected() {
    let (app, _) = build_test_app().await;

    let padded = body_json(get(app.clone(), "/api/v1/users/check-nickname?nickname=abc%20").await).await;
    assert_eq!(padded["available"], false);
    assert_eq!(
        padded["reason"],
        "Nickname can only contain letters, numbers, underscore and dash"
    );

    let response = post_json(app, "/api/v1/users", new_user(3, "abc ")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn duplicate_nickname_on_onboarding_conflicts() {
    let (app, _) = build_test_app().await;
    post_json(app.clone(), "/api/v1/users", new_user(1, "unique")).await;
    let response = post_json(app, "/api/v1/users", new_user(2, "unique")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_is_idempotent_and_xp_additive() {
    let (app, state) = build_test_app().await;
    post_json(app.clone(), "/api/v1/users", new_user(55, "learner")).await;
    let lesson = state.catalog.list_lessons(None).await.unwrap().remove(0);
    let exercises = state.catalog.list_exercises(Some(lesson.id)).await.unwrap();

    let first = json!({
        "telegramId": 55, "lessonId": lesson.id, "exerciseId": exercises[0].id,
        "xpEarned": 10, "score": 100
    });
    let response = post_json(app.clone(), "/api/v1/users/progress", first.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = body_json(response).await;
    assert_eq!(receipt["message"], "Progress saved!");
    assert_eq!(receipt["xp_applied"], true);
    assert_eq!(receipt["total_xp"], 10);

    let repeat = body_json(post_json(app.clone(), "/api/v1/users/progress", first).await).await;
    assert_eq!(repeat["progress"]["id"], receipt["progress"]["id"]);

    let second = json!({
        "telegramId": "55", "lessonId": lesson.id, "exerciseId": exercises[1].id, "xpEarned": 15
    });
    let receipt = body_json(post_json(app.clone(), "/api/v1/users/progress", second).await).await;
    assert_eq!(receipt["total_xp"], 35);

    let done = json!({ "telegramId": 55, "lessonId": lesson.id, "completed": true, "xpEarned": 50, "score": 100 });
    let receipt = body_json(post_json(app.clone(), "/api/v1/users/progress", done).await).await;
    assert_eq!(receipt["message"], "Lesson completed!");
    assert!(receipt["progress"]["exercise_id"].is_null());

    let overview = body_json(get(app, "/api/v1/users/progress?telegram_id=55").await).await;
    assert_eq!(overview["stats"]["completed_lessons"], 1);
    assert_eq!(overview["stats"]["total_xp"], 85);
    assert_eq!(overview["progress"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn progress_for_unknown_user_is_404() {
    let (app, state) = build_test_app().await;
    let lesson = state.catalog.list_lessons(None).await.unwrap().remove(0);
    let body = json!({ "telegramId": 404, "lessonId": lesson.id });
    let response = post_json(app, "/api/v1/users/progress", body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn progress_rejects_exercises_outside_the_lesson() {
    let (app, state) = build_test_app().await;
    post_json(app.clone(), "/api/v1/users", new_user(56, "wanderer")).await;
    let lessons = state.catalog.list_lessons(None).await.unwrap();
    let other = state.catalog.list_exercises(Some(lessons[1].id)).await.unwrap().remove(0);

    let dangling = json!({ "telegramId": 56, "lessonId": lessons[0].id, "exerciseId": uuid::Uuid::new_v4(), "xpEarned": 10 });
    let response = post_json(app.clone(), "/api/v1/users/progress", dangling).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let foreign = json!({ "telegramId": 56, "lessonId": lessons[0].id, "exerciseId": other.id, "xpEarned": 10 });
    let response = post_json(app.clone(), "/api/v1/users/progress", foreign).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let user = body_json(get(app, "/api/v1/users?telegram_id=56").await).await;
    assert_eq!(user["user"]["total_xp"], 0);
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lessons_are_listed_and_duplicates_conflict() {
    let (app, _) = build_test_app().await;

    let listed = body_json(get(app.clone(), "/api/v1/lessons?level=A1").await).await;
    let lessons = listed["lessons"].as_array().unwrap();
    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0]["order"], 1);

    let dup = json!({ "title": "Again", "level": "A1", "order": 1 });
    let response = post_json(app.clone(), "/api/v1/lessons", dup).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let fresh = json!({ "title": "Travel", "level": "B1", "order": 1, "description": "Airports" });
    let response = post_json(app, "/api/v1/lessons", fresh).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["lesson"]["level"], "B1");
}

#[tokio::test]
async fn exercises_are_validated_on_create() {
    let (app, state) = build_test_app().await;
    let lesson = state.catalog.list_lessons(None).await.unwrap().remove(0);

    let content = json!({ "question": "Cat =", "options": ["Кошка", "Собака"], "correct": "Кошка" });
    let body = json!({ "lessonId": lesson.id, "type": "quiz", "order": 10, "content": content.to_string() });
    let response = post_json(app.clone(), "/api/v1/exercises", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let exercise = body_json(response).await["exercise"].clone();
    assert_eq!(exercise["xp_reward"], 10);
    assert_eq!(exercise["type"], "quiz");
    assert_eq!(exercise["content_json"], content);

    let broken = json!({ "lessonId": lesson.id, "type": "fill-in-the-blank", "order": 11,
                         "content": { "sentence": "no blank here", "options": ["a", "b"], "correct": "a" } });
    let response = post_json(app.clone(), "/api/v1/exercises", broken).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let orphan = json!({ "lessonId": uuid::Uuid::new_v4(), "type": "quiz", "order": 1, "content": content });
    let response = post_json(app.clone(), "/api/v1/exercises", orphan).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/exercises?lesson_id={}", lesson.id);
    let listed = body_json(get(app, &uri).await).await;
    assert_eq!(listed["exercises"].as_array().unwrap().len(), 5);
}
