//! Domain models: CEFR levels, users, lessons, exercises and progress rows.
//!
//! These are the canonical shapes the rest of the crate works with. Legacy
//! column names never leave the store layer (see `store::legacy`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

pub type DbId = Uuid;
pub type Timestamp = DateTime<Utc>;

/// Proficiency tag, ordered A1 < A2 < ... < C2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl CefrLevel {
  pub const ALL: [CefrLevel; 6] = [
    CefrLevel::A1, CefrLevel::A2, CefrLevel::B1,
    CefrLevel::B2, CefrLevel::C1, CefrLevel::C2,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }
}

impl Default for CefrLevel {
  fn default() -> Self { CefrLevel::A1 }
}

impl fmt::Display for CefrLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CefrLevel {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CefrLevel::ALL
      .iter()
      .copied()
      .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| CoreError::Validation(format!("Unknown CEFR level '{s}' (expected A1..C2)")))
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Light,
  Dark,
}

impl Default for Theme {
  fn default() -> Self { Theme::Light }
}

impl Theme {
  pub fn as_str(&self) -> &'static str {
    match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
    }
  }

  /// Lenient parse used on stored values; unknown themes read as `light`.
  pub fn parse_or_default(s: &str) -> Theme {
    match s.trim().to_ascii_lowercase().as_str() {
      "dark" => Theme::Dark,
      _ => Theme::Light,
    }
  }
}

/// Normalized user profile. `total_xp` only ever grows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserProfile {
  pub id: DbId,
  pub telegram_id: i64,
  pub nickname: String,
  pub avatar: String,
  pub level: CefrLevel,
  pub theme: Theme,
  pub is_onboarded: bool,
  pub total_xp: i64,
  pub current_streak: i32,
  pub last_activity_date: NaiveDate,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lesson {
  pub id: DbId,
  pub title: String,
  pub description: Option<String>,
  pub level: CefrLevel,
  /// 1-based, unique within `level`.
  pub order: i32,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
}

/// Exercise type tags as stored in the `exercises.type` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
  Quiz,
  FillInTheBlank,
  WordPuzzle,
  SentenceBuilder,
  Reading,
  MemoryMatch,
  /// Tagged in content but has no playable engine.
  AudioQuiz,
}

impl ExerciseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExerciseKind::Quiz => "quiz",
      ExerciseKind::FillInTheBlank => "fill-in-the-blank",
      ExerciseKind::WordPuzzle => "word-puzzle",
      ExerciseKind::SentenceBuilder => "sentence-builder",
      ExerciseKind::Reading => "reading",
      ExerciseKind::MemoryMatch => "memory-match",
      ExerciseKind::AudioQuiz => "audio-quiz",
    }
  }
}

impl fmt::Display for ExerciseKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ExerciseKind {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let kind = match s.trim() {
      "quiz" => ExerciseKind::Quiz,
      "fill-in-the-blank" => ExerciseKind::FillInTheBlank,
      "word-puzzle" => ExerciseKind::WordPuzzle,
      "sentence-builder" => ExerciseKind::SentenceBuilder,
      "reading" => ExerciseKind::Reading,
      "memory-match" => ExerciseKind::MemoryMatch,
      "audio-quiz" => ExerciseKind::AudioQuiz,
      other => return Err(CoreError::Validation(format!("Unknown exercise type '{other}'"))),
    };
    Ok(kind)
  }
}

/// An exercise row. `content` stays raw JSON here; it is parsed into
/// `content::ExerciseContent` when a game is built or the row is created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exercise {
  pub id: DbId,
  pub lesson_id: DbId,
  #[serde(rename = "type")]
  pub kind: ExerciseKind,
  pub order: i32,
  pub content_json: serde_json::Value,
  pub xp_reward: i32,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
}

/// A progress row. `exercise_id == None` marks lesson-level completion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressRecord {
  pub id: DbId,
  pub user_id: DbId,
  pub lesson_id: DbId,
  pub exercise_id: Option<DbId>,
  pub completed: bool,
  pub score: Option<i32>,
  pub completed_at: Option<Timestamp>,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Write-side inputs handed to the store
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct NewUser {
  pub telegram_id: i64,
  pub nickname: String,
  pub avatar: String,
  pub level: CefrLevel,
  pub theme: Theme,
}

/// Partial profile edit. XP is deliberately absent: it only changes additively.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
  pub nickname: Option<String>,
  pub avatar: Option<String>,
  pub level: Option<CefrLevel>,
  pub theme: Option<Theme>,
}

#[derive(Clone, Debug)]
pub struct NewLesson {
  pub title: String,
  pub description: Option<String>,
  pub level: CefrLevel,
  pub order: i32,
}

#[derive(Clone, Debug)]
pub struct NewExercise {
  pub lesson_id: DbId,
  pub kind: ExerciseKind,
  pub order: i32,
  pub content_json: serde_json::Value,
  pub xp_reward: i32,
}

#[derive(Clone, Debug)]
pub struct ProgressUpsert {
  pub user_id: DbId,
  pub lesson_id: DbId,
  pub exercise_id: Option<DbId>,
  pub completed: bool,
  pub score: Option<i32>,
}
