//! Progress Recorder: turns completion events into progress rows and XP.
//!
//! Two sequential writes, no transaction: the progress upsert (fatal on
//! failure) then the additive XP update (logged, non-fatal). A receipt with
//! `xp_applied = false` marks the partial-success case.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::{DbId, Lesson, ProgressRecord, ProgressUpsert, UserProfile};
use crate::error::CoreError;
use crate::store::Store;
use crate::util::{lenient_i64, today};

pub const LESSON_COMPLETED_MESSAGE: &str = "Lesson completed!";
pub const PROGRESS_SAVED_MESSAGE: &str = "Progress saved!";

/// One completion event as reported by the lesson flow.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
  #[serde(deserialize_with = "lenient_i64")]
  pub telegram_id: i64,
  pub lesson_id: DbId,
  #[serde(default)]
  pub exercise_id: Option<DbId>,
  #[serde(default)]
  pub completed: bool,
  #[serde(default)]
  pub xp_earned: i64,
  #[serde(default)]
  pub score: Option<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressReceipt {
  pub progress: ProgressRecord,
  pub xp_earned: i64,
  /// False when the progress row was saved but the XP update failed.
  pub xp_applied: bool,
  pub total_xp: i64,
  pub message: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressStats {
  pub total_lessons: usize,
  pub completed_lessons: usize,
  pub total_xp: i64,
  pub current_streak: i32,
  pub next_lesson: Option<Lesson>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressOverview {
  pub user: UserProfile,
  pub lessons: Vec<Lesson>,
  pub progress: Vec<ProgressRecord>,
  pub stats: ProgressStats,
}

/// Where the lesson flow sends its completion events.
#[async_trait]
pub trait ProgressSink: Send + Sync {
  async fn record(&self, req: ProgressRequest) -> Result<ProgressReceipt, CoreError>;
}

#[derive(Clone)]
pub struct ProgressRecorder {
  store: Arc<dyn Store>,
}

impl ProgressRecorder {
  pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

  #[instrument(
    level = "info",
    skip(self, req),
    fields(telegram_id = req.telegram_id, lesson_id = %req.lesson_id, exercise_id = ?req.exercise_id, xp = req.xp_earned)
  )]
  pub async fn record(&self, req: ProgressRequest) -> Result<ProgressReceipt, CoreError> {
    if req.xp_earned < 0 {
      return Err(CoreError::Validation("xpEarned must not be negative".into()));
    }
    let user = self
      .store
      .find_user(req.telegram_id)
      .await?
      .ok_or_else(|| CoreError::not_found("user", req.telegram_id))?;
    if self.store.find_lesson(req.lesson_id).await?.is_none() {
      return Err(CoreError::not_found("lesson", req.lesson_id));
    }
    if let Some(exercise_id) = req.exercise_id {
      let exercise = self
        .store
        .find_exercise(exercise_id)
        .await?
        .ok_or_else(|| CoreError::not_found("exercise", exercise_id))?;
      if exercise.lesson_id != req.lesson_id {
        return Err(CoreError::Validation(format!(
          "Exercise {exercise_id} does not belong to lesson {}",
          req.lesson_id
        )));
      }
    }

    let progress = self
      .store
      .upsert_progress(&ProgressUpsert {
        user_id: user.id,
        lesson_id: req.lesson_id,
        exercise_id: req.exercise_id,
        completed: req.completed,
        score: req.score,
      })
      .await?;

    let (xp_applied, total_xp) = if req.xp_earned > 0 {
      match self.store.add_xp(user.id, req.xp_earned, today()).await {
        Ok(total) => (true, total),
        Err(e) => {
          warn!(target: "progress", user_id = %user.id, xp = req.xp_earned, error = %e, "XP update failed after progress was saved");
          (false, user.total_xp)
        }
      }
    } else {
      (true, user.total_xp)
    };

    let message = if req.completed { LESSON_COMPLETED_MESSAGE } else { PROGRESS_SAVED_MESSAGE };
    info!(target: "progress", progress_id = %progress.id, completed = progress.completed, total_xp, xp_applied, "Progress recorded");

    Ok(ProgressReceipt { progress, xp_earned: req.xp_earned, xp_applied, total_xp, message })
  }

  /// Lessons of the user's level with completion stats.
  #[instrument(level = "debug", skip(self))]
  pub async fn overview(&self, telegram_id: i64) -> Result<ProgressOverview, CoreError> {
    let user = self
      .store
      .find_user(telegram_id)
      .await?
      .ok_or_else(|| CoreError::not_found("user", telegram_id))?;
    let lessons = self.store.list_lessons(Some(user.level)).await?;
    let progress = self.store.list_progress(user.id).await?;

    let lesson_done = |lesson: &Lesson| {
      progress
        .iter()
        .any(|p| p.lesson_id == lesson.id && p.exercise_id.is_none() && p.completed)
    };
    let completed_lessons = lessons.iter().filter(|l| lesson_done(l)).count();
    let next_lesson = lessons.iter().find(|l| !lesson_done(l)).cloned();

    let stats = ProgressStats {
      total_lessons: lessons.len(),
      completed_lessons,
      total_xp: user.total_xp,
      current_streak: user.current_streak,
      next_lesson,
    };
    Ok(ProgressOverview { user, lessons, progress, stats })
  }
}

#[async_trait]
impl ProgressSink for ProgressRecorder {
  async fn record(&self, req: ProgressRequest) -> Result<ProgressReceipt, CoreError> {
    ProgressRecorder::record(self, req).await
  }
}
