//! Single-pick games: quiz, fill-in-the-blank and word-puzzle.

use serde::Serialize;

use super::{Effect, Outcome, Phase, ANSWER_DELAY};

#[derive(Debug)]
pub struct ChoiceGame {
  prompt: String,
  options: Vec<String>,
  correct: String,
  picked: Option<String>,
  phase: Phase,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChoiceView {
  /// Question, sentence with the blank, or the word to find.
  pub prompt: String,
  pub options: Vec<String>,
  pub picked: Option<String>,
  /// Revealed once an answer is locked.
  pub correct: Option<String>,
  pub locked: bool,
}

impl ChoiceGame {
  pub fn new(prompt: &str, options: Vec<String>, correct: &str) -> Self {
    Self {
      prompt: prompt.to_string(),
      options,
      correct: correct.to_string(),
      picked: None,
      phase: Phase::Unanswered,
    }
  }

  pub fn pick(&mut self, option: &str) -> Vec<Effect> {
    if !self.options.iter().any(|o| o == option) {
      return Vec::new();
    }
    let outcome = Outcome::all_or_nothing(option == self.correct);
    match self.phase.answer(outcome, ANSWER_DELAY) {
      Some(effects) => {
        self.picked = Some(option.to_string());
        effects
      }
      None => Vec::new(),
    }
  }

  pub fn wake(&mut self) -> Vec<Effect> { self.phase.wake() }

  pub fn is_complete(&self) -> bool { self.phase == Phase::Completed }

  pub fn view(&self) -> ChoiceView {
    let locked = self.phase != Phase::Unanswered;
    ChoiceView {
      prompt: self.prompt.clone(),
      options: self.options.clone(),
      picked: self.picked.clone(),
      correct: locked.then(|| self.correct.clone()),
      locked,
    }
  }
}
