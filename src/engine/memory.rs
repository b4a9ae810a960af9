//! Memory match: pair English words with their Russian translations.
//!
//! Score starts at 100 and loses 10 per mismatched pair, floored at 0. There
//! is no failing end state: the game completes (always `correct`) once every
//! pair has been matched.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::{Effect, Haptic, Outcome, FULL_SCORE, MATCH_DELAY, MISMATCH_DELAY, SOLVED_DELAY};
use crate::content::WordPair;

pub const MISMATCH_PENALTY: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSide {
  English,
  Russian,
}

#[derive(Clone, Debug, Serialize)]
pub struct Card {
  pub id: String,
  pub text: String,
  pub side: CardSide,
  #[serde(skip)]
  pair: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
  Match(usize),
  Mismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
  Idle,
  Playing,
  /// All pairs matched; completion follows on the next wake.
  Solved,
  Completed,
}

#[derive(Debug)]
pub struct MemoryMatch {
  pairs: Vec<WordPair>,
  deck: Vec<Card>,
  selected: Vec<String>,
  matched: Vec<usize>,
  pending: Option<Pending>,
  score: u32,
  mistakes: u32,
  stage: Stage,
  rng: StdRng,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemoryView {
  pub started: bool,
  /// Cards still on the board (matched pairs are removed).
  pub cards: Vec<Card>,
  pub selected: Vec<String>,
  pub matched_pairs: usize,
  pub total_pairs: usize,
  pub score: u32,
  pub mistakes: u32,
  pub solved: bool,
}

impl MemoryMatch {
  pub fn new<R: Rng + ?Sized>(pairs: &[WordPair], rng: &mut R) -> Self {
    let mut game = Self {
      pairs: pairs.to_vec(),
      deck: Vec::new(),
      selected: Vec::new(),
      matched: Vec::new(),
      pending: None,
      score: FULL_SCORE,
      mistakes: 0,
      stage: Stage::Idle,
      rng: StdRng::seed_from_u64(rng.gen()),
    };
    game.deal();
    game
  }

  fn deal(&mut self) {
    let mut deck = Vec::with_capacity(self.pairs.len() * 2);
    for (i, pair) in self.pairs.iter().enumerate() {
      deck.push(Card { id: format!("en-{i}"), text: pair.english.clone(), side: CardSide::English, pair: i });
      deck.push(Card { id: format!("ru-{i}"), text: pair.russian.clone(), side: CardSide::Russian, pair: i });
    }
    deck.shuffle(&mut self.rng);
    self.deck = deck;
  }

  pub fn start(&mut self) -> Vec<Effect> {
    if self.stage != Stage::Idle {
      return Vec::new();
    }
    self.stage = Stage::Playing;
    vec![Effect::Haptic(Haptic::Light)]
  }

  pub fn flip(&mut self, card_id: &str) -> Vec<Effect> {
    if self.stage != Stage::Playing || self.pending.is_some() {
      return Vec::new();
    }
    let Some(card) = self.deck.iter().find(|c| c.id == card_id) else {
      return Vec::new();
    };
    if self.matched.contains(&card.pair) || self.selected.iter().any(|id| id == card_id) {
      return Vec::new();
    }
    self.selected.push(card.id.clone());
    if self.selected.len() < 2 {
      return Vec::new();
    }

    let first = self.pair_of(&self.selected[0]);
    let second = self.pair_of(&self.selected[1]);
    match (first, second) {
      (Some(a), Some(b)) if a == b => {
        self.pending = Some(Pending::Match(a));
        vec![Effect::Haptic(Haptic::Light), Effect::Wake(MATCH_DELAY)]
      }
      _ => {
        self.mistakes += 1;
        self.score = self.score.saturating_sub(MISMATCH_PENALTY);
        self.pending = Some(Pending::Mismatch);
        vec![Effect::Haptic(Haptic::Heavy), Effect::Wake(MISMATCH_DELAY)]
      }
    }
  }

  fn pair_of(&self, card_id: &str) -> Option<usize> {
    self.deck.iter().find(|c| c.id == card_id).map(|c| c.pair)
  }

  pub fn wake(&mut self) -> Vec<Effect> {
    match (self.stage, self.pending.take()) {
      (Stage::Playing, Some(Pending::Match(pair))) => {
        self.matched.push(pair);
        self.selected.clear();
        if self.matched.len() == self.pairs.len() {
          self.stage = Stage::Solved;
          return vec![Effect::Wake(SOLVED_DELAY)];
        }
        Vec::new()
      }
      (Stage::Playing, Some(Pending::Mismatch)) => {
        self.selected.clear();
        Vec::new()
      }
      (Stage::Solved, _) => {
        self.stage = Stage::Completed;
        vec![Effect::Complete(Outcome { correct: true, score: self.score })]
      }
      _ => Vec::new(),
    }
  }

  /// Reshuffle and start over. Not available once the board is solved.
  pub fn reset(&mut self) -> Vec<Effect> {
    if !matches!(self.stage, Stage::Idle | Stage::Playing) {
      return Vec::new();
    }
    self.selected.clear();
    self.matched.clear();
    self.pending = None;
    self.score = FULL_SCORE;
    self.mistakes = 0;
    self.stage = Stage::Idle;
    self.deal();
    vec![Effect::Haptic(Haptic::Light)]
  }

  pub fn is_complete(&self) -> bool { self.stage == Stage::Completed }

  pub fn view(&self) -> MemoryView {
    MemoryView {
      started: self.stage != Stage::Idle,
      cards: self.deck.iter().filter(|c| !self.matched.contains(&c.pair)).cloned().collect(),
      selected: self.selected.clone(),
      matched_pairs: self.matched.len(),
      total_pairs: self.pairs.len(),
      score: self.score,
      mistakes: self.mistakes,
      solved: matches!(self.stage, Stage::Solved | Stage::Completed),
    }
  }
}
