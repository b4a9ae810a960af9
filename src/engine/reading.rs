//! Reading comprehension: a text followed by sub-questions answered one at a
//! time. Score is the rounded share of right answers; the exercise counts as
//! correct when at least one answer was right.

use serde::Serialize;

use super::{Effect, Haptic, Outcome, ANSWER_DELAY, FULL_SCORE};
use crate::content::{ReadingContent, ReadingQuestion};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
  Asking,
  /// Showing feedback for the current question until the host wakes us.
  Showing,
  Completed,
}

#[derive(Debug)]
pub struct ReadingGame {
  text: String,
  questions: Vec<ReadingQuestion>,
  index: usize,
  answers: Vec<String>,
  step: Step,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReadingView {
  pub text: String,
  pub question_index: usize,
  pub total_questions: usize,
  pub question: String,
  pub options: Vec<String>,
  pub picked: Option<String>,
  pub correct: Option<String>,
  pub locked: bool,
}

impl ReadingGame {
  pub fn new(content: &ReadingContent) -> Self {
    Self {
      text: content.text.clone(),
      questions: content.questions.clone(),
      index: 0,
      answers: Vec::with_capacity(content.questions.len()),
      step: Step::Asking,
    }
  }

  pub fn pick(&mut self, option: &str) -> Vec<Effect> {
    if self.step != Step::Asking {
      return Vec::new();
    }
    let Some(question) = self.questions.get(self.index) else {
      return Vec::new();
    };
    if !question.options.iter().any(|o| o == option) {
      return Vec::new();
    }
    let right = option == question.correct;
    self.answers.push(option.to_string());
    self.step = Step::Showing;
    vec![Effect::Haptic(Haptic::for_answer(right)), Effect::Wake(ANSWER_DELAY)]
  }

  pub fn wake(&mut self) -> Vec<Effect> {
    if self.step != Step::Showing {
      return Vec::new();
    }
    if self.index + 1 < self.questions.len() {
      self.index += 1;
      self.step = Step::Asking;
      return Vec::new();
    }
    self.step = Step::Completed;
    vec![Effect::Complete(self.outcome())]
  }

  fn correct_count(&self) -> usize {
    self.answers
      .iter()
      .zip(self.questions.iter())
      .filter(|(a, q)| **a == q.correct)
      .count()
  }

  fn outcome(&self) -> Outcome {
    let right = self.correct_count();
    let total = self.questions.len().max(1);
    let score = (f64::from(FULL_SCORE) * right as f64 / total as f64).round() as u32;
    Outcome { correct: right > 0, score }
  }

  pub fn is_complete(&self) -> bool { self.step == Step::Completed }

  pub fn view(&self) -> ReadingView {
    let locked = self.step != Step::Asking;
    let q = self.questions.get(self.index);
    ReadingView {
      text: self.text.clone(),
      question_index: self.index,
      total_questions: self.questions.len(),
      question: q.map(|q| q.question.clone()).unwrap_or_default(),
      options: q.map(|q| q.options.clone()).unwrap_or_default(),
      picked: self.answers.get(self.index).cloned(),
      correct: q.filter(|_| locked).map(|q| q.correct.clone()),
      locked,
    }
  }
}
