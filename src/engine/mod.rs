//! Exercise engine: one state machine per playable exercise kind.
//!
//! Every game moves `Unanswered -> Answered -> Completed`. Transitions never
//! perform I/O; they return [`Effect`]s for the host to carry out:
//!
//! - `Haptic` is a fire-and-forget feedback request,
//! - `Wake(d)` asks the host to call [`Game::wake`] after `d`,
//! - `Complete` carries the terminal outcome and is emitted exactly once.
//!
//! Inputs that do not fit the current state (a second pick after lock-in, a
//! card flip sent to a quiz) are ignored and produce no effects.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::ExerciseContent;

mod choice;
mod memory;
mod reading;
mod sentence;

pub use choice::{ChoiceGame, ChoiceView};
pub use memory::{CardSide, MemoryMatch, MemoryView};
pub use reading::{ReadingGame, ReadingView};
pub use sentence::{SentenceBuilder, SentenceView};

/// Display delay after a single-pick answer or a reading sub-answer.
pub const ANSWER_DELAY: Duration = Duration::from_millis(1500);
/// Display delay after checking a built sentence.
pub const SENTENCE_DELAY: Duration = Duration::from_millis(2000);
/// How long a matched pair stays visible before it is removed.
pub const MATCH_DELAY: Duration = Duration::from_millis(500);
/// How long a mismatched pair stays face-up.
pub const MISMATCH_DELAY: Duration = Duration::from_millis(1000);
/// Delay between solving the board and completion.
pub const SOLVED_DELAY: Duration = Duration::from_millis(1500);

pub const FULL_SCORE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Haptic {
  /// Success or neutral interaction.
  Light,
  /// Failure.
  Heavy,
}

impl Haptic {
  pub fn for_answer(correct: bool) -> Self {
    if correct { Haptic::Light } else { Haptic::Heavy }
  }
}

/// Terminal result of one exercise instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
  pub correct: bool,
  pub score: u32,
}

impl Outcome {
  pub fn all_or_nothing(correct: bool) -> Self {
    Outcome { correct, score: if correct { FULL_SCORE } else { 0 } }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
  Haptic(Haptic),
  Wake(Duration),
  Complete(Outcome),
}

/// User interaction with the active exercise.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Input {
  /// Pick an option (quiz, fill-in-the-blank, word-puzzle, reading).
  Pick { option: String },
  /// Move `pool[index]` to the end of the built sentence.
  AddWord { index: usize },
  /// Move `built[index]` back to the pool.
  RemoveWord { index: usize },
  /// Lock in the built sentence.
  Check,
  /// Reveal the memory-match board.
  Start,
  /// Turn a memory-match card.
  Flip { card_id: String },
  /// Start over (sentence-builder and memory-match, before lock-in).
  Reset,
  /// Skip an exercise that has no engine.
  Skip,
}

/// Internal answer phase shared by the single-answer games.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
  Unanswered,
  Answered(Outcome),
  Completed,
}

impl Phase {
  /// Lock in an outcome. Returns `None` when already locked.
  fn answer(&mut self, outcome: Outcome, delay: Duration) -> Option<Vec<Effect>> {
    if *self != Phase::Unanswered {
      return None;
    }
    *self = Phase::Answered(outcome);
    Some(vec![Effect::Haptic(Haptic::for_answer(outcome.correct)), Effect::Wake(delay)])
  }

  fn wake(&mut self) -> Vec<Effect> {
    match *self {
      Phase::Answered(outcome) => {
        *self = Phase::Completed;
        vec![Effect::Complete(outcome)]
      }
      _ => Vec::new(),
    }
  }
}

/// A running exercise. Closed over the six playable kinds.
#[derive(Debug)]
pub enum Game {
  Quiz(ChoiceGame),
  FillInTheBlank(ChoiceGame),
  WordPuzzle(ChoiceGame),
  SentenceBuilder(SentenceBuilder),
  Reading(ReadingGame),
  MemoryMatch(MemoryMatch),
}

/// Client-facing snapshot of a game.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GameView {
  Quiz(ChoiceView),
  FillInTheBlank(ChoiceView),
  WordPuzzle(ChoiceView),
  SentenceBuilder(SentenceView),
  Reading(ReadingView),
  MemoryMatch(MemoryView),
}

impl Game {
  pub fn new<R: Rng + ?Sized>(content: &ExerciseContent, rng: &mut R) -> Game {
    match content {
      ExerciseContent::Quiz(c) => {
        Game::Quiz(ChoiceGame::new(&c.question, c.options.clone(), &c.correct))
      }
      ExerciseContent::FillInTheBlank(c) => {
        Game::FillInTheBlank(ChoiceGame::new(&c.sentence, c.options.clone(), &c.correct))
      }
      ExerciseContent::WordPuzzle(c) => {
        Game::WordPuzzle(ChoiceGame::new(&c.target, c.words.clone(), &c.target))
      }
      ExerciseContent::SentenceBuilder(c) => Game::SentenceBuilder(SentenceBuilder::new(c, rng)),
      ExerciseContent::Reading(c) => Game::Reading(ReadingGame::new(c)),
      ExerciseContent::MemoryMatch(c) => Game::MemoryMatch(MemoryMatch::new(&c.word_pairs, rng)),
    }
  }

  pub fn apply(&mut self, input: &Input) -> Vec<Effect> {
    match (self, input) {
      (Game::Quiz(g) | Game::FillInTheBlank(g) | Game::WordPuzzle(g), Input::Pick { option }) => g.pick(option),
      (Game::Reading(g), Input::Pick { option }) => g.pick(option),
      (Game::SentenceBuilder(g), Input::AddWord { index }) => g.add_word(*index),
      (Game::SentenceBuilder(g), Input::RemoveWord { index }) => g.remove_word(*index),
      (Game::SentenceBuilder(g), Input::Check) => g.check(),
      (Game::SentenceBuilder(g), Input::Reset) => g.reset(),
      (Game::MemoryMatch(g), Input::Start) => g.start(),
      (Game::MemoryMatch(g), Input::Flip { card_id }) => g.flip(card_id),
      (Game::MemoryMatch(g), Input::Reset) => g.reset(),
      _ => Vec::new(),
    }
  }

  /// Called by the host once the delay of the last `Wake` effect elapsed.
  pub fn wake(&mut self) -> Vec<Effect> {
    match self {
      Game::Quiz(g) | Game::FillInTheBlank(g) | Game::WordPuzzle(g) => g.wake(),
      Game::SentenceBuilder(g) => g.wake(),
      Game::Reading(g) => g.wake(),
      Game::MemoryMatch(g) => g.wake(),
    }
  }

  pub fn is_complete(&self) -> bool {
    match self {
      Game::Quiz(g) | Game::FillInTheBlank(g) | Game::WordPuzzle(g) => g.is_complete(),
      Game::SentenceBuilder(g) => g.is_complete(),
      Game::Reading(g) => g.is_complete(),
      Game::MemoryMatch(g) => g.is_complete(),
    }
  }

  pub fn view(&self) -> GameView {
    match self {
      Game::Quiz(g) => GameView::Quiz(g.view()),
      Game::FillInTheBlank(g) => GameView::FillInTheBlank(g.view()),
      Game::WordPuzzle(g) => GameView::WordPuzzle(g.view()),
      Game::SentenceBuilder(g) => GameView::SentenceBuilder(g.view()),
      Game::Reading(g) => GameView::Reading(g.view()),
      Game::MemoryMatch(g) => GameView::MemoryMatch(g.view()),
    }
  }
}

/// Pull the completion outcome out of an effect batch, if any.
pub fn completion(effects: &[Effect]) -> Option<Outcome> {
  effects.iter().find_map(|e| match e {
    Effect::Complete(o) => Some(*o),
    _ => None,
  })
}

/// Pull the requested wake delay out of an effect batch, if any.
pub fn wake_delay(effects: &[Effect]) -> Option<Duration> {
  effects.iter().find_map(|e| match e {
    Effect::Wake(d) => Some(*d),
    _ => None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::{QuizContent, WordPuzzleContent};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn quiz() -> ExerciseContent {
    ExerciseContent::Quiz(QuizContent {
      question: "Cat is...".into(),
      options: vec!["Кошка".into(), "Собака".into(), "Дом".into(), "Стол".into()],
      correct: "Кошка".into(),
    })
  }

  #[test]
  fn inputs_for_other_kinds_are_ignored() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut game = Game::new(&quiz(), &mut rng);
    assert!(game.apply(&Input::Flip { card_id: "en-0".into() }).is_empty());
    assert!(game.apply(&Input::Check).is_empty());
    assert!(game.apply(&Input::Skip).is_empty());
    assert!(!game.is_complete());
  }

  #[test]
  fn word_puzzle_compares_against_target() {
    let mut rng = StdRng::seed_from_u64(1);
    let content = ExerciseContent::WordPuzzle(WordPuzzleContent {
      target: "apple".into(),
      words: vec!["apple".into(), "table".into(), "chair".into()],
    });
    let mut game = Game::new(&content, &mut rng);
    let effects = game.apply(&Input::Pick { option: "apple".into() });
    assert_eq!(effects, vec![Effect::Haptic(Haptic::Light), Effect::Wake(ANSWER_DELAY)]);
    assert_eq!(completion(&game.wake()), Some(Outcome { correct: true, score: 100 }));
  }

  #[test]
  fn view_is_tagged_by_kind() {
    let mut rng = StdRng::seed_from_u64(1);
    let game = Game::new(&quiz(), &mut rng);
    let json = serde_json::to_value(game.view()).unwrap();
    assert_eq!(json["kind"], "quiz");
    assert_eq!(json["prompt"], "Cat is...");
  }

  #[test]
  fn input_deserializes_from_action_tag() {
    let input: Input = serde_json::from_str(r#"{"action":"flip","card_id":"ru-1"}"#).unwrap();
    assert_eq!(input, Input::Flip { card_id: "ru-1".into() });
    let input: Input = serde_json::from_str(r#"{"action":"add_word","index":2}"#).unwrap();
    assert_eq!(input, Input::AddWord { index: 2 });
  }
}
