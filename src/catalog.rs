//! Lesson and exercise catalog: listing for the lesson flow, creation for
//! content authors.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::content::ExerciseContent;
use crate::domain::{CefrLevel, DbId, Exercise, ExerciseKind, Lesson, NewExercise, NewLesson};
use crate::error::CoreError;
use crate::store::Store;

pub const DEFAULT_XP_REWARD: i32 = 10;

#[derive(Clone, Debug)]
pub struct CreateLesson {
  pub title: String,
  pub description: Option<String>,
  pub level: CefrLevel,
  pub order: i32,
}

#[derive(Clone, Debug)]
pub struct CreateExercise {
  pub lesson_id: DbId,
  pub kind: ExerciseKind,
  pub order: i32,
  /// Either a JSON object or a string holding one.
  pub content: Value,
  pub xp_reward: Option<i32>,
}

#[derive(Clone)]
pub struct Catalog {
  store: Arc<dyn Store>,
}

impl Catalog {
  pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

  pub async fn list_lessons(&self, level: Option<CefrLevel>) -> Result<Vec<Lesson>, CoreError> {
    self.store.list_lessons(level).await
  }

  pub async fn find_lesson(&self, id: DbId) -> Result<Lesson, CoreError> {
    self.store.find_lesson(id).await?.ok_or_else(|| CoreError::not_found("lesson", id))
  }

  #[instrument(level = "info", skip(self, req), fields(level = %req.level, order = req.order))]
  pub async fn create_lesson(&self, req: CreateLesson) -> Result<Lesson, CoreError> {
    let title = req.title.trim();
    if title.is_empty() {
      return Err(CoreError::Validation("title is required".into()));
    }
    if req.order < 1 {
      return Err(CoreError::Validation("order must be at least 1".into()));
    }
    let description = req.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
    let lesson = self
      .store
      .insert_lesson(&NewLesson { title: title.to_string(), description, level: req.level, order: req.order })
      .await?;
    info!(target: "lingvo_backend", lesson_id = %lesson.id, title = %lesson.title, "Lesson created");
    Ok(lesson)
  }

  pub async fn list_exercises(&self, lesson_id: Option<DbId>) -> Result<Vec<Exercise>, CoreError> {
    self.store.list_exercises(lesson_id).await
  }

  #[instrument(level = "info", skip(self, req), fields(lesson_id = %req.lesson_id, kind = %req.kind, order = req.order))]
  pub async fn create_exercise(&self, req: CreateExercise) -> Result<Exercise, CoreError> {
    if req.order < 1 {
      return Err(CoreError::Validation("order must be at least 1".into()));
    }
    let xp_reward = req.xp_reward.unwrap_or(DEFAULT_XP_REWARD);
    if xp_reward < 1 {
      return Err(CoreError::Validation("xp_reward must be positive".into()));
    }
    let content = normalize_content(req.kind, req.content)?;
    self.find_lesson(req.lesson_id).await?;

    let exercise = self
      .store
      .insert_exercise(&NewExercise {
        lesson_id: req.lesson_id,
        kind: req.kind,
        order: req.order,
        content_json: content,
        xp_reward,
      })
      .await?;
    info!(target: "lingvo_backend", exercise_id = %exercise.id, "Exercise created");
    Ok(exercise)
  }
}

/// Decode string-wrapped JSON and validate the payload for `kind`.
fn normalize_content(kind: ExerciseKind, content: Value) -> Result<Value, CoreError> {
  let content = match content {
    Value::String(s) => serde_json::from_str::<Value>(&s)
      .map_err(|_| CoreError::Validation("Invalid JSON format in content".into()))?,
    other => other,
  };
  match kind {
    ExerciseKind::AudioQuiz => {
      if !content.is_object() {
        return Err(CoreError::Validation("audio-quiz content must be a JSON object".into()));
      }
    }
    _ => {
      ExerciseContent::parse(kind, &content)?;
    }
  }
  Ok(content)
}
