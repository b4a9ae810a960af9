//! Built-in demo content so a fresh in-memory instance is playable without a
//! content bank or database.

use serde_json::json;

use crate::config::{ContentBank, ExerciseCfg, LessonCfg};
use crate::domain::{CefrLevel, ExerciseKind};

fn exercise(kind: ExerciseKind, order: i32, xp_reward: i32, content: serde_json::Value) -> ExerciseCfg {
  ExerciseCfg { kind, order, xp_reward: Some(xp_reward), content }
}

/// Two A1 lessons that between them use every playable exercise kind.
pub fn seed_content() -> ContentBank {
  let greetings = LessonCfg {
    title: "Basic Greetings".into(),
    description: Some("Say hello and introduce yourself".into()),
    level: CefrLevel::A1,
    order: 1,
    exercises: vec![
      exercise(ExerciseKind::Quiz, 1, 10, json!({
        "question": "How do you greet someone in the morning?",
        "options": ["Good morning", "Good night", "Good afternoon", "Good evening"],
        "correct": "Good morning"
      })),
      exercise(ExerciseKind::FillInTheBlank, 2, 10, json!({
        "sentence": "Hello, my name ___ John.",
        "options": ["is", "are", "am", "be"],
        "correct": "is"
      })),
      exercise(ExerciseKind::SentenceBuilder, 3, 15, json!({
        "translation": "Приятно познакомиться",
        "correct_order": ["Nice", "to", "meet", "you"],
        "extra_words": ["see", "we"]
      })),
      exercise(ExerciseKind::MemoryMatch, 4, 20, json!({
        "word_pairs": [
          { "english": "hello", "russian": "привет" },
          { "english": "goodbye", "russian": "до свидания" },
          { "english": "thank you", "russian": "спасибо" },
          { "english": "please", "russian": "пожалуйста" }
        ]
      })),
    ],
  };

  let food = LessonCfg {
    title: "Food and Drinks".into(),
    description: Some("Order breakfast and talk about meals".into()),
    level: CefrLevel::A1,
    order: 2,
    exercises: vec![
      exercise(ExerciseKind::WordPuzzle, 1, 10, json!({
        "target": "apple",
        "words": ["apple", "table", "maple", "ample"]
      })),
      exercise(ExerciseKind::Reading, 2, 20, json!({
        "text": "Anna has breakfast at eight. She drinks coffee and eats toast with jam.",
        "questions": [
          { "question": "When does Anna have breakfast?", "options": ["At seven", "At eight", "At nine"], "correct": "At eight" },
          { "question": "What does she drink?", "options": ["Tea", "Juice", "Coffee"], "correct": "Coffee" }
        ]
      })),
      exercise(ExerciseKind::Quiz, 3, 10, json!({
        "question": "What do you drink in the morning?",
        "options": ["coffee", "dinner", "lunch", "breakfast"],
        "correct": "coffee"
      })),
    ],
  };

  ContentBank { lessons: vec![greetings, food] }
}
