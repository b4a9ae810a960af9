//! Persistence seam.
//!
//! Services talk to a [`Store`]; two implementations exist:
//! - [`MemoryStore`]: in-process maps, used for local play and tests,
//! - [`PgStore`]: the managed Postgres database via `sqlx`.
//!
//! Both keep user rows in their raw (dual-schema) form and hand out
//! normalized [`UserProfile`]s only; see [`legacy`].

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
  CefrLevel, DbId, Exercise, Lesson, NewExercise, NewLesson, NewUser, ProgressRecord,
  ProgressUpsert, UserPatch, UserProfile,
};
use crate::error::CoreError;

pub mod legacy;
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
  /// Short backend name for health output and logs.
  fn kind(&self) -> &'static str;

  async fn find_user(&self, telegram_id: i64) -> Result<Option<UserProfile>, CoreError>;

  /// Identities whose `nickname` or legacy `username` equals `nickname`.
  async fn nickname_holders(&self, nickname: &str) -> Result<Vec<i64>, CoreError>;

  async fn insert_user(&self, user: &NewUser) -> Result<UserProfile, CoreError>;

  /// Apply a partial edit. `None` when the identity is unknown.
  async fn update_user(&self, telegram_id: i64, patch: &UserPatch) -> Result<Option<UserProfile>, CoreError>;

  /// Add `delta` to the stored XP (relative to the stored value, never an
  /// absolute overwrite) and stamp the activity date. Returns the new total.
  async fn add_xp(&self, user_id: DbId, delta: i64, today: NaiveDate) -> Result<i64, CoreError>;

  /// Lessons ordered by level then order.
  async fn list_lessons(&self, level: Option<CefrLevel>) -> Result<Vec<Lesson>, CoreError>;

  async fn find_lesson(&self, id: DbId) -> Result<Option<Lesson>, CoreError>;

  /// Fails with `Conflict` when `(level, order)` is taken.
  async fn insert_lesson(&self, lesson: &NewLesson) -> Result<Lesson, CoreError>;

  /// Exercises ordered by lesson then order.
  async fn list_exercises(&self, lesson_id: Option<DbId>) -> Result<Vec<Exercise>, CoreError>;

  async fn find_exercise(&self, id: DbId) -> Result<Option<Exercise>, CoreError>;

  /// Fails with `Conflict` when `(lesson_id, order)` is taken.
  async fn insert_exercise(&self, exercise: &NewExercise) -> Result<Exercise, CoreError>;

  /// Insert or update the row keyed by `(user, exercise)`, or by
  /// `(user, lesson)` with a null exercise for lesson-level rows.
  async fn upsert_progress(&self, up: &ProgressUpsert) -> Result<ProgressRecord, CoreError>;

  async fn list_progress(&self, user_id: DbId) -> Result<Vec<ProgressRecord>, CoreError>;
}
