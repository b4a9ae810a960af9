//! Sentence builder: assemble `correct_order` from a shuffled pool that also
//! holds decoy words. Comparison is exact and order-sensitive.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::{Effect, Outcome, Phase, SENTENCE_DELAY};
use crate::content::SentenceBuilderContent;

#[derive(Debug)]
pub struct SentenceBuilder {
  translation: String,
  correct_order: Vec<String>,
  extra_words: Vec<String>,
  pool: Vec<String>,
  built: Vec<String>,
  phase: Phase,
  rng: StdRng,
}

#[derive(Clone, Debug, Serialize)]
pub struct SentenceView {
  pub translation: String,
  pub pool: Vec<String>,
  pub built: Vec<String>,
  /// Check is offered once the built sentence has the expected length.
  pub can_check: bool,
  pub locked: bool,
  pub correct_order: Option<Vec<String>>,
}

impl SentenceBuilder {
  pub fn new<R: Rng + ?Sized>(content: &SentenceBuilderContent, rng: &mut R) -> Self {
    let mut game = Self {
      translation: content.translation.clone(),
      correct_order: content.correct_order.clone(),
      extra_words: content.extra_words.clone(),
      pool: Vec::new(),
      built: Vec::new(),
      phase: Phase::Unanswered,
      rng: StdRng::seed_from_u64(rng.gen()),
    };
    game.deal();
    game
  }

  fn deal(&mut self) {
    self.pool = self.correct_order.iter().chain(self.extra_words.iter()).cloned().collect();
    self.pool.shuffle(&mut self.rng);
    self.built.clear();
  }

  fn open(&self) -> bool { self.phase == Phase::Unanswered }

  pub fn add_word(&mut self, index: usize) -> Vec<Effect> {
    if self.open() && index < self.pool.len() {
      let word = self.pool.remove(index);
      self.built.push(word);
    }
    Vec::new()
  }

  pub fn remove_word(&mut self, index: usize) -> Vec<Effect> {
    if self.open() && index < self.built.len() {
      let word = self.built.remove(index);
      self.pool.push(word);
    }
    Vec::new()
  }

  fn can_check(&self) -> bool { self.built.len() == self.correct_order.len() }

  pub fn check(&mut self) -> Vec<Effect> {
    if !self.can_check() {
      return Vec::new();
    }
    let outcome = Outcome::all_or_nothing(self.built == self.correct_order);
    self.phase.answer(outcome, SENTENCE_DELAY).unwrap_or_default()
  }

  pub fn reset(&mut self) -> Vec<Effect> {
    if self.open() {
      self.deal();
    }
    Vec::new()
  }

  pub fn wake(&mut self) -> Vec<Effect> { self.phase.wake() }

  pub fn is_complete(&self) -> bool { self.phase == Phase::Completed }

  pub fn view(&self) -> SentenceView {
    let locked = !self.open();
    SentenceView {
      translation: self.translation.clone(),
      pool: self.pool.clone(),
      built: self.built.clone(),
      can_check: !locked && self.can_check(),
      locked,
      correct_order: locked.then(|| self.correct_order.clone()),
    }
  }
}
