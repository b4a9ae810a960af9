//! In-memory store: process-local maps behind async `RwLock`s.
//!
//! Enforces the same uniqueness rules as the database so local play and
//! tests see identical conflict behavior.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::legacy::UserRow;
use super::Store;
use crate::domain::{
  CefrLevel, DbId, Exercise, Lesson, NewExercise, NewLesson, NewUser, ProgressRecord,
  ProgressUpsert, UserPatch, UserProfile,
};
use crate::error::CoreError;

#[derive(Default)]
pub struct MemoryStore {
  users: RwLock<HashMap<i64, UserRow>>,
  lessons: RwLock<HashMap<DbId, Lesson>>,
  exercises: RwLock<HashMap<DbId, Exercise>>,
  progress: RwLock<Vec<ProgressRecord>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Insert a row as stored, including legacy-only columns.
  pub async fn insert_raw_user(&self, row: UserRow) {
    self.users.write().await.insert(row.telegram_id, row);
  }

  fn today() -> NaiveDate { Utc::now().date_naive() }
}

#[async_trait]
impl Store for MemoryStore {
  fn kind(&self) -> &'static str { "memory" }

  async fn find_user(&self, telegram_id: i64) -> Result<Option<UserProfile>, CoreError> {
    let users = self.users.read().await;
    Ok(users.get(&telegram_id).map(|row| row.normalize(Self::today())))
  }

  async fn nickname_holders(&self, nickname: &str) -> Result<Vec<i64>, CoreError> {
    let users = self.users.read().await;
    Ok(users.values().filter(|r| r.holds_nickname(nickname)).map(|r| r.telegram_id).collect())
  }

  #[instrument(level = "debug", skip(self, user), fields(telegram_id = user.telegram_id))]
  async fn insert_user(&self, user: &NewUser) -> Result<UserProfile, CoreError> {
    let mut users = self.users.write().await;
    if users.contains_key(&user.telegram_id) {
      return Err(CoreError::Conflict(format!("User {} already exists", user.telegram_id)));
    }
    let now = Utc::now();
    let row = UserRow {
      id: Uuid::new_v4(),
      telegram_id: user.telegram_id,
      nickname: Some(user.nickname.clone()),
      username: None,
      avatar: Some(user.avatar.clone()),
      first_name: None,
      level: Some(user.level.as_str().to_string()),
      theme: Some(user.theme.as_str().to_string()),
      is_onboarded: Some(true),
      total_xp: Some(0),
      xp: None,
      current_streak: Some(0),
      last_activity_date: Some(now.date_naive()),
      created_at: now,
      updated_at: now,
    };
    let profile = row.normalize(now.date_naive());
    users.insert(user.telegram_id, row);
    Ok(profile)
  }

  async fn update_user(&self, telegram_id: i64, patch: &UserPatch) -> Result<Option<UserProfile>, CoreError> {
    let mut users = self.users.write().await;
    let Some(row) = users.get_mut(&telegram_id) else {
      return Ok(None);
    };
    if let Some(nickname) = &patch.nickname {
      row.nickname = Some(nickname.clone());
    }
    if let Some(avatar) = &patch.avatar {
      row.avatar = Some(avatar.clone());
    }
    if let Some(level) = patch.level {
      row.level = Some(level.as_str().to_string());
    }
    if let Some(theme) = patch.theme {
      row.theme = Some(theme.as_str().to_string());
    }
    row.updated_at = Utc::now();
    Ok(Some(row.normalize(Self::today())))
  }

  async fn add_xp(&self, user_id: DbId, delta: i64, today: NaiveDate) -> Result<i64, CoreError> {
    let mut users = self.users.write().await;
    let row = users
      .values_mut()
      .find(|r| r.id == user_id)
      .ok_or_else(|| CoreError::not_found("user", user_id))?;
    let total = row.stored_xp() + delta;
    row.total_xp = Some(total);
    row.last_activity_date = Some(today);
    row.updated_at = Utc::now();
    debug!(target: "progress", %user_id, delta, total, "XP added (memory)");
    Ok(total)
  }

  async fn list_lessons(&self, level: Option<CefrLevel>) -> Result<Vec<Lesson>, CoreError> {
    let lessons = self.lessons.read().await;
    let mut out: Vec<Lesson> = lessons
      .values()
      .filter(|l| level.map_or(true, |lvl| l.level == lvl))
      .cloned()
      .collect();
    out.sort_by_key(|l| (l.level, l.order));
    Ok(out)
  }

  async fn find_lesson(&self, id: DbId) -> Result<Option<Lesson>, CoreError> {
    Ok(self.lessons.read().await.get(&id).cloned())
  }

  async fn insert_lesson(&self, lesson: &NewLesson) -> Result<Lesson, CoreError> {
    let mut lessons = self.lessons.write().await;
    if lessons.values().any(|l| l.level == lesson.level && l.order == lesson.order) {
      return Err(CoreError::Conflict(format!(
        "Lesson with order {} already exists for level {}",
        lesson.order, lesson.level
      )));
    }
    let now = Utc::now();
    let row = Lesson {
      id: Uuid::new_v4(),
      title: lesson.title.clone(),
      description: lesson.description.clone(),
      level: lesson.level,
      order: lesson.order,
      created_at: now,
      updated_at: now,
    };
    lessons.insert(row.id, row.clone());
    Ok(row)
  }

  async fn list_exercises(&self, lesson_id: Option<DbId>) -> Result<Vec<Exercise>, CoreError> {
    let exercises = self.exercises.read().await;
    let mut out: Vec<Exercise> = exercises
      .values()
      .filter(|e| lesson_id.map_or(true, |id| e.lesson_id == id))
      .cloned()
      .collect();
    out.sort_by_key(|e| (e.lesson_id, e.order));
    Ok(out)
  }

  async fn find_exercise(&self, id: DbId) -> Result<Option<Exercise>, CoreError> {
    Ok(self.exercises.read().await.get(&id).cloned())
  }

  async fn insert_exercise(&self, exercise: &NewExercise) -> Result<Exercise, CoreError> {
    if !self.lessons.read().await.contains_key(&exercise.lesson_id) {
      return Err(CoreError::not_found("lesson", exercise.lesson_id));
    }
    let mut exercises = self.exercises.write().await;
    if exercises.values().any(|e| e.lesson_id == exercise.lesson_id && e.order == exercise.order) {
      return Err(CoreError::Conflict(format!(
        "Exercise with order {} already exists for this lesson",
        exercise.order
      )));
    }
    let now = Utc::now();
    let row = Exercise {
      id: Uuid::new_v4(),
      lesson_id: exercise.lesson_id,
      kind: exercise.kind,
      order: exercise.order,
      content_json: exercise.content_json.clone(),
      xp_reward: exercise.xp_reward,
      created_at: now,
      updated_at: now,
    };
    exercises.insert(row.id, row.clone());
    Ok(row)
  }

  async fn upsert_progress(&self, up: &ProgressUpsert) -> Result<ProgressRecord, CoreError> {
    let mut progress = self.progress.write().await;
    let now = Utc::now();
    let existing = progress.iter_mut().find(|p| {
      p.user_id == up.user_id
        && match up.exercise_id {
          Some(ex) => p.exercise_id == Some(ex),
          None => p.exercise_id.is_none() && p.lesson_id == up.lesson_id,
        }
    });

    if let Some(row) = existing {
      row.completed = up.completed;
      if up.score.is_some() {
        row.score = up.score;
      }
      if up.completed {
        row.completed_at = Some(now);
      }
      row.updated_at = now;
      return Ok(row.clone());
    }

    let row = ProgressRecord {
      id: Uuid::new_v4(),
      user_id: up.user_id,
      lesson_id: up.lesson_id,
      exercise_id: up.exercise_id,
      completed: up.completed,
      score: up.score,
      completed_at: up.completed.then_some(now),
      created_at: now,
      updated_at: now,
    };
    progress.push(row.clone());
    Ok(row)
  }

  async fn list_progress(&self, user_id: DbId) -> Result<Vec<ProgressRecord>, CoreError> {
    let progress = self.progress.read().await;
    Ok(progress.iter().filter(|p| p.user_id == user_id).cloned().collect())
  }
}
