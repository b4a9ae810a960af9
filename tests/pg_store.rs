//! Integration tests for the Postgres store: progress upserts and XP accrual
//! against the real schema.

use lingvo_backend::domain::{
    CefrLevel, DbId, ExerciseKind, NewExercise, NewLesson, NewUser, ProgressUpsert, Theme,
    UserProfile,
};
use lingvo_backend::store::{PgStore, Store};
use lingvo_backend::util::today;
use serde_json::json;
use sqlx::PgPool;

async fn user_and_exercise(store: &PgStore) -> (UserProfile, DbId, DbId) {
    let user = store
        .insert_user(&NewUser {
            telegram_id: 7001,
            nickname: "pg_learner".into(),
            avatar: "🐘".into(),
            level: CefrLevel::A1,
            theme: Theme::Light,
        })
        .await
        .unwrap();
    let lesson = store
        .insert_lesson(&NewLesson { title: "Basics".into(), description: None, level: CefrLevel::A1, order: 1 })
        .await
        .unwrap();
    let exercise = store
        .insert_exercise(&NewExercise {
            lesson_id: lesson.id,
            kind: ExerciseKind::Quiz,
            order: 1,
            content_json: json!({ "question": "Hi?", "options": ["Hello", "Bye"], "correct": "Hello" }),
            xp_reward: 10,
        })
        .await
        .unwrap();
    (user, lesson.id, exercise.id)
}

// ---------------------------------------------------------------------------
// Progress upserts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn exercise_progress_upsert_keeps_one_row(pool: PgPool) {
    let store = PgStore::from_pool(pool);
    let (user, lesson_id, exercise_id) = user_and_exercise(&store).await;
    let up = ProgressUpsert { user_id: user.id, lesson_id, exercise_id: Some(exercise_id), completed: false, score: Some(80) };

    let first = store.upsert_progress(&up).await.unwrap();
    let second = store.upsert_progress(&ProgressUpsert { score: Some(100), ..up }).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.score, Some(100));
    assert_eq!(store.list_progress(user.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn lesson_progress_upsert_keeps_one_row(pool: PgPool) {
    let store = PgStore::from_pool(pool);
    let (user, lesson_id, exercise_id) = user_and_exercise(&store).await;
    let exercise_row = ProgressUpsert { user_id: user.id, lesson_id, exercise_id: Some(exercise_id), completed: false, score: None };
    let lesson_row = ProgressUpsert { user_id: user.id, lesson_id, exercise_id: None, completed: true, score: Some(100) };

    store.upsert_progress(&exercise_row).await.unwrap();
    let first = store.upsert_progress(&lesson_row).await.unwrap();
    let second = store.upsert_progress(&lesson_row).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.completed);
    assert!(second.completed_at.is_some());
    assert_eq!(second.exercise_id, None);

    let rows = store.list_progress(user.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|p| p.exercise_id.is_none()).count(), 1);
}

// ---------------------------------------------------------------------------
// XP accrual
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn xp_updates_add_to_the_stored_total(pool: PgPool) {
    let store = PgStore::from_pool(pool);
    let (user, _, _) = user_and_exercise(&store).await;

    assert_eq!(store.add_xp(user.id, 10, today()).await.unwrap(), 10);
    assert_eq!(store.add_xp(user.id, 15, today()).await.unwrap(), 25);

    let reloaded = store.find_user(7001).await.unwrap().unwrap();
    assert_eq!(reloaded.total_xp, 25);
    assert_eq!(reloaded.last_activity_date, today());
}

#[sqlx::test(migrations = "./migrations")]
async fn legacy_xp_is_the_base_for_new_xp(pool: PgPool) {
    sqlx::query("INSERT INTO users (telegram_id, username, first_name, xp) VALUES ($1, $2, $3, $4)")
        .bind(7002_i64)
        .bind("oldtimer")
        .bind("Old")
        .bind(120_i64)
        .execute(&pool)
        .await
        .unwrap();
    let store = PgStore::from_pool(pool);

    let legacy = store.find_user(7002).await.unwrap().unwrap();
    assert_eq!(legacy.nickname, "oldtimer");
    assert_eq!(legacy.total_xp, 120);

    assert_eq!(store.add_xp(legacy.id, 30, today()).await.unwrap(), 150);
    assert_eq!(store.find_user(7002).await.unwrap().unwrap().total_xp, 150);
}

#[sqlx::test(migrations = "./migrations")]
async fn find_exercise_returns_stored_row(pool: PgPool) {
    let store = PgStore::from_pool(pool);
    let (_, lesson_id, exercise_id) = user_and_exercise(&store).await;

    let found = store.find_exercise(exercise_id).await.unwrap().unwrap();
    assert_eq!(found.lesson_id, lesson_id);
    assert_eq!(found.kind, ExerciseKind::Quiz);
    assert!(store.find_exercise(uuid::Uuid::new_v4()).await.unwrap().is_none());
}
