//! Typed exercise payloads, one shape per playable kind.
//!
//! Raw `content_json` is parsed and validated here before a game is built or
//! an exercise row is created.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ExerciseKind;
use crate::error::CoreError;

/// Placeholder a fill-in-the-blank sentence must contain exactly once.
pub const BLANK: &str = "___";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizContent {
  pub question: String,
  pub options: Vec<String>,
  pub correct: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillInTheBlankContent {
  pub sentence: String,
  pub options: Vec<String>,
  pub correct: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordPuzzleContent {
  pub target: String,
  pub words: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentenceBuilderContent {
  pub translation: String,
  pub correct_order: Vec<String>,
  #[serde(default)]
  pub extra_words: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingContent {
  pub text: String,
  pub questions: Vec<ReadingQuestion>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordPair {
  pub english: String,
  pub russian: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatchContent {
  pub word_pairs: Vec<WordPair>,
}

/// Closed set of playable payloads. `audio-quiz` has no variant.
#[derive(Clone, Debug, PartialEq)]
pub enum ExerciseContent {
  Quiz(QuizContent),
  FillInTheBlank(FillInTheBlankContent),
  WordPuzzle(WordPuzzleContent),
  SentenceBuilder(SentenceBuilderContent),
  Reading(ReadingContent),
  MemoryMatch(MemoryMatchContent),
}

impl ExerciseContent {
  /// Parse and validate a raw payload for `kind`.
  pub fn parse(kind: ExerciseKind, raw: &Value) -> Result<Self, CoreError> {
    let content = match kind {
      ExerciseKind::Quiz => ExerciseContent::Quiz(decode(kind, raw)?),
      ExerciseKind::FillInTheBlank => ExerciseContent::FillInTheBlank(decode(kind, raw)?),
      ExerciseKind::WordPuzzle => ExerciseContent::WordPuzzle(decode(kind, raw)?),
      ExerciseKind::SentenceBuilder => ExerciseContent::SentenceBuilder(decode(kind, raw)?),
      ExerciseKind::Reading => ExerciseContent::Reading(decode(kind, raw)?),
      ExerciseKind::MemoryMatch => ExerciseContent::MemoryMatch(decode(kind, raw)?),
      ExerciseKind::AudioQuiz => {
        return Err(CoreError::Validation(format!("Exercise type '{kind}' is not playable")))
      }
    };
    content.validate()?;
    Ok(content)
  }

  pub fn kind(&self) -> ExerciseKind {
    match self {
      ExerciseContent::Quiz(_) => ExerciseKind::Quiz,
      ExerciseContent::FillInTheBlank(_) => ExerciseKind::FillInTheBlank,
      ExerciseContent::WordPuzzle(_) => ExerciseKind::WordPuzzle,
      ExerciseContent::SentenceBuilder(_) => ExerciseKind::SentenceBuilder,
      ExerciseContent::Reading(_) => ExerciseKind::Reading,
      ExerciseContent::MemoryMatch(_) => ExerciseKind::MemoryMatch,
    }
  }

  fn validate(&self) -> Result<(), CoreError> {
    match self {
      ExerciseContent::Quiz(c) => {
        non_empty("question", &c.question)?;
        choice_set("options", &c.options, &c.correct)
      }
      ExerciseContent::FillInTheBlank(c) => {
        if c.sentence.matches(BLANK).count() != 1 {
          return invalid(format!("sentence must contain exactly one '{BLANK}' placeholder"));
        }
        choice_set("options", &c.options, &c.correct)
      }
      ExerciseContent::WordPuzzle(c) => choice_set("words", &c.words, &c.target),
      ExerciseContent::SentenceBuilder(c) => {
        non_empty("translation", &c.translation)?;
        if c.correct_order.is_empty() {
          return invalid("correct_order must not be empty".into());
        }
        Ok(())
      }
      ExerciseContent::Reading(c) => {
        non_empty("text", &c.text)?;
        if c.questions.is_empty() {
          return invalid("reading needs at least one question".into());
        }
        for (i, q) in c.questions.iter().enumerate() {
          non_empty(&format!("questions[{i}].question"), &q.question)?;
          choice_set(&format!("questions[{i}].options"), &q.options, &q.correct)?;
        }
        Ok(())
      }
      ExerciseContent::MemoryMatch(c) => {
        if c.word_pairs.is_empty() {
          return invalid("word_pairs must not be empty".into());
        }
        for (i, p) in c.word_pairs.iter().enumerate() {
          non_empty(&format!("word_pairs[{i}].english"), &p.english)?;
          non_empty(&format!("word_pairs[{i}].russian"), &p.russian)?;
        }
        Ok(())
      }
    }
  }
}

fn decode<T: serde::de::DeserializeOwned>(kind: ExerciseKind, raw: &Value) -> Result<T, CoreError> {
  T::deserialize(raw).map_err(|e| CoreError::Validation(format!("Invalid {kind} content: {e}")))
}

fn invalid(msg: String) -> Result<(), CoreError> {
  Err(CoreError::Validation(msg))
}

fn non_empty(field: &str, value: &str) -> Result<(), CoreError> {
  if value.trim().is_empty() {
    return invalid(format!("{field} must not be empty"));
  }
  Ok(())
}

/// At least two options, and the expected answer is one of them.
fn choice_set(field: &str, options: &[String], expected: &str) -> Result<(), CoreError> {
  if options.len() < 2 {
    return invalid(format!("{field} needs at least two entries"));
  }
  if !options.iter().any(|o| o == expected) {
    return invalid(format!("{field} must include the correct answer '{expected}'"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_quiz_payload() {
    let raw = json!({ "question": "Hello means?", "options": ["Привет", "Пока", "Да", "Нет"], "correct": "Привет" });
    let content = ExerciseContent::parse(ExerciseKind::Quiz, &raw).unwrap();
    assert_eq!(content.kind(), ExerciseKind::Quiz);
  }

  #[test]
  fn rejects_missing_fields() {
    let raw = json!({ "question": "Hello means?" });
    let err = ExerciseContent::parse(ExerciseKind::Quiz, &raw).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
  }

  #[test]
  fn rejects_correct_answer_outside_options() {
    let raw = json!({ "question": "q", "options": ["a", "b"], "correct": "c" });
    assert!(ExerciseContent::parse(ExerciseKind::Quiz, &raw).is_err());
  }

  #[test]
  fn fill_in_the_blank_needs_exactly_one_placeholder() {
    let ok = json!({ "sentence": "I ___ a student", "options": ["am", "is"], "correct": "am" });
    assert!(ExerciseContent::parse(ExerciseKind::FillInTheBlank, &ok).is_ok());

    let none = json!({ "sentence": "I am a student", "options": ["am", "is"], "correct": "am" });
    assert!(ExerciseContent::parse(ExerciseKind::FillInTheBlank, &none).is_err());

    let two = json!({ "sentence": "I ___ a ___", "options": ["am", "is"], "correct": "am" });
    assert!(ExerciseContent::parse(ExerciseKind::FillInTheBlank, &two).is_err());
  }

  #[test]
  fn sentence_builder_extra_words_default_to_empty() {
    let raw = json!({ "translation": "Я люблю кошек", "correct_order": ["I", "love", "cats"] });
    match ExerciseContent::parse(ExerciseKind::SentenceBuilder, &raw).unwrap() {
      ExerciseContent::SentenceBuilder(c) => assert!(c.extra_words.is_empty()),
      other => panic!("unexpected content {other:?}"),
    }
  }

  #[test]
  fn reading_validates_each_question() {
    let raw = json!({
      "text": "Tom has a dog.",
      "questions": [
        { "question": "Who has a dog?", "options": ["Tom", "Ann"], "correct": "Tom" },
        { "question": "What pet?", "options": ["cat", "bird"], "correct": "dog" }
      ]
    });
    let err = ExerciseContent::parse(ExerciseKind::Reading, &raw).unwrap_err();
    assert!(err.to_string().contains("questions[1].options"));
  }

  #[test]
  fn memory_match_needs_pairs() {
    let raw = json!({ "word_pairs": [] });
    assert!(ExerciseContent::parse(ExerciseKind::MemoryMatch, &raw).is_err());
  }

  #[test]
  fn audio_quiz_is_not_playable() {
    let raw = json!({ "audio_url": "x.mp3" });
    assert!(ExerciseContent::parse(ExerciseKind::AudioQuiz, &raw).is_err());
  }
}
