//! Postgres store backed by `sqlx`.
//!
//! Queries follow the repository style: a column-list constant per table,
//! `format!`-assembled SQL, and `query_as` into row structs that are then
//! converted to domain types. Uniqueness is enforced by the schema
//! (`migrations/`), and unique violations surface as `CoreError::Conflict`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};

use super::legacy::{UserRow, USER_COLUMNS};
use super::Store;
use crate::domain::{
  CefrLevel, DbId, Exercise, ExerciseKind, Lesson, NewExercise, NewLesson, NewUser,
  ProgressRecord, ProgressUpsert, Timestamp, UserPatch, UserProfile,
};
use crate::error::CoreError;

/// Column list for `lessons` queries.
const LESSON_COLUMNS: &str = "id, title, description, level, \"order\", created_at, updated_at";

/// Column list for `exercises` queries.
const EXERCISE_COLUMNS: &str = "\
  id, lesson_id, type, \"order\", content_json, xp_reward, created_at, updated_at";

/// Column list for `user_progress` queries.
const PROGRESS_COLUMNS: &str = "\
  id, user_id, lesson_id, exercise_id, completed, score, completed_at, \
  created_at, updated_at";

#[derive(Debug, FromRow)]
struct LessonRow {
  id: DbId,
  title: String,
  description: Option<String>,
  level: String,
  order: i32,
  created_at: Timestamp,
  updated_at: Timestamp,
}

impl TryFrom<LessonRow> for Lesson {
  type Error = CoreError;

  fn try_from(row: LessonRow) -> Result<Self, Self::Error> {
    let level = CefrLevel::from_str(&row.level)
      .map_err(|e| CoreError::Persistence(format!("lesson {}: {e}", row.id)))?;
    Ok(Lesson {
      id: row.id,
      title: row.title,
      description: row.description,
      level,
      order: row.order,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct ExerciseRow {
  id: DbId,
  lesson_id: DbId,
  #[sqlx(rename = "type")]
  kind: String,
  order: i32,
  content_json: serde_json::Value,
  xp_reward: i32,
  created_at: Timestamp,
  updated_at: Timestamp,
}

impl TryFrom<ExerciseRow> for Exercise {
  type Error = CoreError;

  fn try_from(row: ExerciseRow) -> Result<Self, Self::Error> {
    let kind = ExerciseKind::from_str(&row.kind)
      .map_err(|e| CoreError::Persistence(format!("exercise {}: {e}", row.id)))?;
    Ok(Exercise {
      id: row.id,
      lesson_id: row.lesson_id,
      kind,
      order: row.order,
      content_json: row.content_json,
      xp_reward: row.xp_reward,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct ProgressRow {
  id: DbId,
  user_id: DbId,
  lesson_id: DbId,
  exercise_id: Option<DbId>,
  completed: bool,
  score: Option<i32>,
  completed_at: Option<Timestamp>,
  created_at: Timestamp,
  updated_at: Timestamp,
}

impl From<ProgressRow> for ProgressRecord {
  fn from(row: ProgressRow) -> Self {
    ProgressRecord {
      id: row.id,
      user_id: row.user_id,
      lesson_id: row.lesson_id,
      exercise_id: row.exercise_id,
      completed: row.completed,
      score: row.score,
      completed_at: row.completed_at,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CoreError> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    Ok(Self { pool })
  }

  /// Wrap an existing pool, e.g. one handed out by `#[sqlx::test]`.
  pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

  /// Apply the embedded migrations from `migrations/`.
  #[instrument(level = "info", skip(self))]
  pub async fn migrate(&self) -> Result<(), CoreError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!(target: "lingvo_backend", "Database migrations applied");
    Ok(())
  }

  fn today() -> NaiveDate { Utc::now().date_naive() }
}

#[async_trait]
impl Store for PgStore {
  fn kind(&self) -> &'static str { "postgres" }

  async fn find_user(&self, telegram_id: i64) -> Result<Option<UserProfile>, CoreError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1");
    let row = sqlx::query_as::<_, UserRow>(&query)
      .bind(telegram_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|r| r.normalize(Self::today())))
  }

  async fn nickname_holders(&self, nickname: &str) -> Result<Vec<i64>, CoreError> {
    let ids = sqlx::query_scalar::<_, i64>(
      "SELECT telegram_id FROM users WHERE nickname = $1 OR username = $1",
    )
    .bind(nickname)
    .fetch_all(&self.pool)
    .await?;
    Ok(ids)
  }

  #[instrument(level = "debug", skip(self, user), fields(telegram_id = user.telegram_id))]
  async fn insert_user(&self, user: &NewUser) -> Result<UserProfile, CoreError> {
    let query = format!(
      "INSERT INTO users \
           (telegram_id, nickname, avatar, level, theme, is_onboarded, \
            total_xp, current_streak, last_activity_date) \
       VALUES ($1, $2, $3, $4, $5, TRUE, 0, 0, $6) \
       RETURNING {USER_COLUMNS}"
    );
    let today = Self::today();
    let row = sqlx::query_as::<_, UserRow>(&query)
      .bind(user.telegram_id)
      .bind(&user.nickname)
      .bind(&user.avatar)
      .bind(user.level.as_str())
      .bind(user.theme.as_str())
      .bind(today)
      .fetch_one(&self.pool)
      .await?;
    Ok(row.normalize(today))
  }

  async fn update_user(&self, telegram_id: i64, patch: &UserPatch) -> Result<Option<UserProfile>, CoreError> {
    let query = format!(
      "UPDATE users SET \
           nickname = COALESCE($2, nickname), \
           avatar = COALESCE($3, avatar), \
           level = COALESCE($4, level), \
           theme = COALESCE($5, theme), \
           updated_at = NOW() \
       WHERE telegram_id = $1 \
       RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRow>(&query)
      .bind(telegram_id)
      .bind(patch.nickname.as_deref())
      .bind(patch.avatar.as_deref())
      .bind(patch.level.map(|l| l.as_str()))
      .bind(patch.theme.map(|t| t.as_str()))
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|r| r.normalize(Self::today())))
  }

  async fn add_xp(&self, user_id: DbId, delta: i64, today: NaiveDate) -> Result<i64, CoreError> {
    // Relative update in one statement; concurrent sessions cannot overwrite each other.
    let total = sqlx::query_scalar::<_, i64>(
      "UPDATE users SET \
           total_xp = COALESCE(total_xp, xp, 0) + $2, \
           last_activity_date = $3, \
           updated_at = NOW() \
       WHERE id = $1 \
       RETURNING total_xp",
    )
    .bind(user_id)
    .bind(delta)
    .bind(today)
    .fetch_optional(&self.pool)
    .await?;
    total.ok_or_else(|| CoreError::not_found("user", user_id))
  }

  async fn list_lessons(&self, level: Option<CefrLevel>) -> Result<Vec<Lesson>, CoreError> {
    let query = format!(
      "SELECT {LESSON_COLUMNS} FROM lessons \
       WHERE ($1::TEXT IS NULL OR level = $1) \
       ORDER BY level, \"order\""
    );
    let rows = sqlx::query_as::<_, LessonRow>(&query)
      .bind(level.map(|l| l.as_str()))
      .fetch_all(&self.pool)
      .await?;
    rows.into_iter().map(Lesson::try_from).collect()
  }

  async fn find_lesson(&self, id: DbId) -> Result<Option<Lesson>, CoreError> {
    let query = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1");
    let row = sqlx::query_as::<_, LessonRow>(&query)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Lesson::try_from).transpose()
  }

  async fn insert_lesson(&self, lesson: &NewLesson) -> Result<Lesson, CoreError> {
    let query = format!(
      "INSERT INTO lessons (title, description, level, \"order\") \
       VALUES ($1, $2, $3, $4) \
       RETURNING {LESSON_COLUMNS}"
    );
    let row = sqlx::query_as::<_, LessonRow>(&query)
      .bind(&lesson.title)
      .bind(&lesson.description)
      .bind(lesson.level.as_str())
      .bind(lesson.order)
      .fetch_one(&self.pool)
      .await?;
    row.try_into()
  }

  async fn list_exercises(&self, lesson_id: Option<DbId>) -> Result<Vec<Exercise>, CoreError> {
    let query = format!(
      "SELECT {EXERCISE_COLUMNS} FROM exercises \
       WHERE ($1::UUID IS NULL OR lesson_id = $1) \
       ORDER BY lesson_id, \"order\""
    );
    let rows = sqlx::query_as::<_, ExerciseRow>(&query)
      .bind(lesson_id)
      .fetch_all(&self.pool)
      .await?;
    rows.into_iter().map(Exercise::try_from).collect()
  }

  async fn find_exercise(&self, id: DbId) -> Result<Option<Exercise>, CoreError> {
    let query = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1");
    let row = sqlx::query_as::<_, ExerciseRow>(&query)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Exercise::try_from).transpose()
  }

  async fn insert_exercise(&self, exercise: &NewExercise) -> Result<Exercise, CoreError> {
    let query = format!(
      "INSERT INTO exercises (lesson_id, type, \"order\", content_json, xp_reward) \
       VALUES ($1, $2, $3, $4, $5) \
       RETURNING {EXERCISE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ExerciseRow>(&query)
      .bind(exercise.lesson_id)
      .bind(exercise.kind.as_str())
      .bind(exercise.order)
      .bind(&exercise.content_json)
      .bind(exercise.xp_reward)
      .fetch_one(&self.pool)
      .await?;
    row.try_into()
  }

  #[instrument(level = "debug", skip(self, up), fields(user_id = %up.user_id, lesson_id = %up.lesson_id))]
  async fn upsert_progress(&self, up: &ProgressUpsert) -> Result<ProgressRecord, CoreError> {
    // Two partial unique indexes back the two keys; pick the matching conflict target.
    let conflict_target = if up.exercise_id.is_some() {
      "(user_id, exercise_id) WHERE exercise_id IS NOT NULL"
    } else {
      "(user_id, lesson_id) WHERE exercise_id IS NULL"
    };
    let query = format!(
      "INSERT INTO user_progress (user_id, lesson_id, exercise_id, completed, score, completed_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT {conflict_target} DO UPDATE SET \
           completed = EXCLUDED.completed, \
           score = COALESCE(EXCLUDED.score, user_progress.score), \
           completed_at = COALESCE(EXCLUDED.completed_at, user_progress.completed_at), \
           updated_at = NOW() \
       RETURNING {PROGRESS_COLUMNS}"
    );
    let completed_at = up.completed.then(Utc::now);
    let row = sqlx::query_as::<_, ProgressRow>(&query)
      .bind(up.user_id)
      .bind(up.lesson_id)
      .bind(up.exercise_id)
      .bind(up.completed)
      .bind(up.score)
      .bind(completed_at)
      .fetch_one(&self.pool)
      .await?;
    Ok(row.into())
  }

  async fn list_progress(&self, user_id: DbId) -> Result<Vec<ProgressRecord>, CoreError> {
    let query = format!(
      "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1 ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, ProgressRow>(&query)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(ProgressRecord::from).collect())
  }
}
