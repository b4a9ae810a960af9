//! Lesson Runner: sequences a lesson's exercises, accrues XP and decides
//! when the lesson is complete.
//!
//! `LessonRunner` is a pure state machine; `LessonSession` pairs it with a
//! [`ProgressSink`] and persists every advance it produces. A failed save is
//! logged and the lesson goes on.

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::content::ExerciseContent;
use crate::domain::{DbId, Exercise, ExerciseKind};
use crate::engine::{completion, Effect, Game, GameView, Input, Outcome};
use crate::error::CoreError;
use crate::recorder::{ProgressRequest, ProgressSink};
use crate::sessions::SessionContext;

pub const LESSON_BONUS_XP: i64 = 50;
pub const LESSON_BONUS_SCORE: i32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerState {
  Loading,
  Running { index: usize },
  /// Empty lesson or failed fetch. Distinct from `Completed`.
  NoExercises,
  Completed { total_xp: i64 },
}

/// What happens after the active exercise finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum Next {
  Exercise { index: usize },
  Completed { total_xp: i64, bonus_xp: i64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Advance {
  pub outcome: Outcome,
  pub xp_earned: i64,
  /// Progress events to persist, in order.
  pub requests: Vec<ProgressRequest>,
  pub next: Next,
}

/// Result of feeding the runner one input or wake-up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Turn {
  pub effects: Vec<Effect>,
  pub advance: Option<Advance>,
}

#[derive(Debug)]
enum Slot {
  Playable(Game),
  /// No engine for this exercise; it can only be skipped.
  Unsupported,
}

/// Snapshot of the active exercise for the client.
#[derive(Clone, Debug)]
pub struct CurrentExercise<'a> {
  pub index: usize,
  pub total: usize,
  pub exercise: &'a Exercise,
  /// `None` for exercises that can only be skipped.
  pub view: Option<GameView>,
}

pub struct LessonRunner {
  ctx: SessionContext,
  lesson_id: DbId,
  exercises: Vec<Exercise>,
  slot: Option<Slot>,
  state: RunnerState,
  earned_xp: i64,
  rng: StdRng,
}

impl LessonRunner {
  pub fn new(ctx: SessionContext, lesson_id: DbId, rng: StdRng) -> Self {
    Self {
      ctx,
      lesson_id,
      exercises: Vec::new(),
      slot: None,
      state: RunnerState::Loading,
      earned_xp: 0,
      rng,
    }
  }

  pub fn state(&self) -> &RunnerState { &self.state }

  pub fn lesson_id(&self) -> DbId { self.lesson_id }

  /// XP accrued from exercises so far, bonus excluded.
  pub fn earned_xp(&self) -> i64 { self.earned_xp }

  /// Take the fetched exercise list. Only valid while `Loading`.
  pub fn load(&mut self, fetched: Result<Vec<Exercise>, CoreError>) -> &RunnerState {
    if self.state != RunnerState::Loading {
      return &self.state;
    }
    match fetched {
      Err(e) => {
        warn!(target: "lesson", lesson_id = %self.lesson_id, error = %e, "Exercise fetch failed; showing empty lesson");
        self.state = RunnerState::NoExercises;
      }
      Ok(list) if list.is_empty() => {
        info!(target: "lesson", lesson_id = %self.lesson_id, "Lesson has no exercises");
        self.state = RunnerState::NoExercises;
      }
      Ok(mut list) => {
        list.sort_by_key(|e| e.order);
        info!(target: "lesson", lesson_id = %self.lesson_id, count = list.len(), "Lesson loaded");
        self.exercises = list;
        self.enter(0);
      }
    }
    &self.state
  }

  pub fn current(&self) -> Option<CurrentExercise<'_>> {
    let RunnerState::Running { index } = self.state else {
      return None;
    };
    let view = match self.slot.as_ref()? {
      Slot::Playable(game) => Some(game.view()),
      Slot::Unsupported => None,
    };
    Some(CurrentExercise { index, total: self.exercises.len(), exercise: &self.exercises[index], view })
  }

  pub fn apply(&mut self, input: &Input) -> Turn {
    let RunnerState::Running { index } = self.state else {
      return Turn::default();
    };
    let effects = match self.slot.as_mut() {
      Some(Slot::Playable(game)) => game.apply(input),
      Some(Slot::Unsupported) if *input == Input::Skip => vec![Effect::Complete(Outcome::all_or_nothing(false))],
      _ => Vec::new(),
    };
    self.settle(index, effects)
  }

  /// Host callback after the delay of a `Wake` effect elapsed.
  pub fn wake(&mut self) -> Turn {
    let RunnerState::Running { index } = self.state else {
      return Turn::default();
    };
    let effects = match self.slot.as_mut() {
      Some(Slot::Playable(game)) => game.wake(),
      _ => Vec::new(),
    };
    self.settle(index, effects)
  }

  fn settle(&mut self, index: usize, effects: Vec<Effect>) -> Turn {
    let advance = completion(&effects).map(|outcome| self.finish_exercise(index, outcome));
    Turn { effects, advance }
  }

  fn enter(&mut self, index: usize) {
    let exercise = &self.exercises[index];
    let slot = if exercise.kind == ExerciseKind::AudioQuiz {
      Slot::Unsupported
    } else {
      match ExerciseContent::parse(exercise.kind, &exercise.content_json) {
        Ok(content) => Slot::Playable(Game::new(&content, &mut self.rng)),
        Err(e) => {
          warn!(target: "lesson", exercise_id = %exercise.id, error = %e, "Unplayable exercise content; offering skip");
          Slot::Unsupported
        }
      }
    };
    self.slot = Some(slot);
    self.state = RunnerState::Running { index };
  }

  fn finish_exercise(&mut self, index: usize, outcome: Outcome) -> Advance {
    let exercise_id = self.exercises[index].id;
    let xp_earned = if outcome.correct { i64::from(self.exercises[index].xp_reward) } else { 0 };
    let mut requests = Vec::new();

    if outcome.correct {
      self.earned_xp += xp_earned;
      requests.push(ProgressRequest {
        telegram_id: self.ctx.telegram_id,
        lesson_id: self.lesson_id,
        exercise_id: Some(exercise_id),
        completed: false,
        xp_earned,
        score: Some(i32::try_from(outcome.score).unwrap_or(i32::MAX)),
      });
    }
    info!(target: "lesson", %exercise_id, index, correct = outcome.correct, score = outcome.score, xp_earned, "Exercise finished");

    let next_index = index + 1;
    let next = if next_index < self.exercises.len() {
      self.enter(next_index);
      Next::Exercise { index: next_index }
    } else {
      let total_xp = self.earned_xp + LESSON_BONUS_XP;
      self.slot = None;
      self.state = RunnerState::Completed { total_xp };
      requests.push(ProgressRequest {
        telegram_id: self.ctx.telegram_id,
        lesson_id: self.lesson_id,
        exercise_id: None,
        completed: true,
        xp_earned: LESSON_BONUS_XP,
        score: Some(LESSON_BONUS_SCORE),
      });
      info!(target: "lesson", lesson_id = %self.lesson_id, total_xp, "Lesson completed");
      Next::Completed { total_xp, bonus_xp: LESSON_BONUS_XP }
    };

    Advance { outcome, xp_earned, requests, next }
  }
}

/// A runner bound to the sink that persists its progress.
pub struct LessonSession {
  runner: LessonRunner,
  sink: Arc<dyn ProgressSink>,
}

impl LessonSession {
  pub fn new(runner: LessonRunner, sink: Arc<dyn ProgressSink>) -> Self { Self { runner, sink } }

  pub fn runner(&self) -> &LessonRunner { &self.runner }

  /// Fetch the lesson's exercises once. No retry on failure.
  #[instrument(level = "info", skip(self, catalog), fields(lesson_id = %self.runner.lesson_id()))]
  pub async fn start(&mut self, catalog: &Catalog) -> &RunnerState {
    let fetched = catalog.list_exercises(Some(self.runner.lesson_id())).await;
    self.runner.load(fetched)
  }

  pub async fn input(&mut self, input: &Input) -> Turn {
    let turn = self.runner.apply(input);
    self.persist(&turn).await;
    turn
  }

  pub async fn wake(&mut self) -> Turn {
    let turn = self.runner.wake();
    self.persist(&turn).await;
    turn
  }

  async fn persist(&self, turn: &Turn) {
    let Some(advance) = &turn.advance else { return };
    for req in &advance.requests {
      if let Err(e) = self.sink.record(req.clone()).await {
        error!(target: "lesson", lesson_id = %req.lesson_id, exercise_id = ?req.exercise_id, error = %e, "Failed to save progress; continuing lesson");
      }
    }
  }
}
