//! Small helpers used across modules.

use chrono::{NaiveDate, Utc};
use serde::de::{self, Deserializer, Visitor};
use std::fmt;

use crate::error::AppError;

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Current UTC calendar day, used for activity stamps.
pub fn today() -> NaiveDate {
  Utc::now().date_naive()
}

/// Telegram ids arrive as numbers from the Mini App and as strings from
/// query strings; both are accepted.
pub fn parse_telegram_id(raw: &str) -> Result<i64, AppError> {
  raw.trim()
    .parse::<i64>()
    .map_err(|_| AppError::BadRequest("Invalid telegram_id format".into()))
}

/// serde helper: accept `123` or `"123"` for a telegram id.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  struct LenientI64;

  impl<'de> Visitor<'de> for LenientI64 {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str("an integer or a string holding an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> { Ok(v) }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
      i64::try_from(v).map_err(|_| E::custom("telegram id out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
      v.trim().parse::<i64>().map_err(|_| E::custom("Invalid telegram_id format"))
    }
  }

  deserializer.deserialize_any(LenientI64)
}
