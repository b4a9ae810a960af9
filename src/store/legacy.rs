//! Dual-schema user rows.
//!
//! The `users` table went through a column rename that was never fully
//! migrated: `nickname`/`username`, `avatar`/`first_name` and
//! `total_xp`/`xp` coexist. [`UserRow`] mirrors the table as stored and
//! [`UserRow::normalize`] is the only place that knows about the old names.

use chrono::NaiveDate;
use sqlx::FromRow;

use crate::domain::{CefrLevel, DbId, Theme, Timestamp, UserProfile};

pub const DEFAULT_NICKNAME: &str = "User";
pub const DEFAULT_AVATAR: &str = "👤";

/// A raw row from the `users` table.
#[derive(Clone, Debug, FromRow)]
pub struct UserRow {
  pub id: DbId,
  pub telegram_id: i64,
  pub nickname: Option<String>,
  pub username: Option<String>,
  pub avatar: Option<String>,
  pub first_name: Option<String>,
  pub level: Option<String>,
  pub theme: Option<String>,
  pub is_onboarded: Option<bool>,
  pub total_xp: Option<i64>,
  pub xp: Option<i64>,
  pub current_streak: Option<i32>,
  pub last_activity_date: Option<NaiveDate>,
  pub created_at: Timestamp,
  pub updated_at: Timestamp,
}

/// Column list for `users` queries.
pub const USER_COLUMNS: &str = "\
  id, telegram_id, nickname, username, avatar, first_name, level, theme, \
  is_onboarded, total_xp, xp, current_streak, last_activity_date, \
  created_at, updated_at";

fn present(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl UserRow {
  /// XP as currently stored: new column first, then the legacy one.
  pub fn stored_xp(&self) -> i64 {
    self.total_xp.or(self.xp).unwrap_or(0).max(0)
  }

  /// Canonical profile. New columns win, then legacy ones, then defaults.
  pub fn normalize(&self, today: NaiveDate) -> UserProfile {
    let nickname = present(&self.nickname)
      .or_else(|| present(&self.username))
      .or_else(|| present(&self.first_name))
      .unwrap_or(DEFAULT_NICKNAME);
    let avatar = present(&self.avatar)
      .or_else(|| present(&self.first_name))
      .unwrap_or(DEFAULT_AVATAR);
    let level = present(&self.level)
      .and_then(|l| l.parse::<CefrLevel>().ok())
      .unwrap_or_default();
    let theme = present(&self.theme).map(Theme::parse_or_default).unwrap_or_default();

    UserProfile {
      id: self.id,
      telegram_id: self.telegram_id,
      nickname: nickname.to_string(),
      avatar: avatar.to_string(),
      level,
      theme,
      is_onboarded: self.is_onboarded.unwrap_or(true),
      total_xp: self.stored_xp(),
      current_streak: self.current_streak.unwrap_or(0).max(0),
      last_activity_date: self.last_activity_date.unwrap_or(today),
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }

  /// True when `candidate` is held through either naming column.
  pub fn holds_nickname(&self, candidate: &str) -> bool {
    self.nickname.as_deref() == Some(candidate) || self.username.as_deref() == Some(candidate)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use uuid::Uuid;

  fn bare_row() -> UserRow {
    let now = Utc::now();
    UserRow {
      id: Uuid::new_v4(),
      telegram_id: 1001,
      nickname: None,
      username: None,
      avatar: None,
      first_name: None,
      level: None,
      theme: None,
      is_onboarded: None,
      total_xp: None,
      xp: None,
      current_streak: None,
      last_activity_date: None,
      created_at: now,
      updated_at: now,
    }
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
  }

  #[test]
  fn legacy_only_row_maps_to_new_names() {
    let row = UserRow {
      username: Some("old_nick".into()),
      first_name: Some("🐱".into()),
      xp: Some(120),
      level: Some("B1".into()),
      ..bare_row()
    };
    let p = row.normalize(today());
    assert_eq!(p.nickname, "old_nick");
    assert_eq!(p.avatar, "🐱");
    assert_eq!(p.total_xp, 120);
    assert_eq!(p.level, CefrLevel::B1);
  }

  #[test]
  fn new_columns_win_over_legacy() {
    let row = UserRow {
      nickname: Some("new_nick".into()),
      username: Some("old_nick".into()),
      avatar: Some("🦊".into()),
      first_name: Some("🐱".into()),
      total_xp: Some(30),
      xp: Some(999),
      ..bare_row()
    };
    let p = row.normalize(today());
    assert_eq!(p.nickname, "new_nick");
    assert_eq!(p.avatar, "🦊");
    assert_eq!(p.total_xp, 30);
  }

  #[test]
  fn empty_row_gets_defaults() {
    let p = bare_row().normalize(today());
    assert_eq!(p.nickname, DEFAULT_NICKNAME);
    assert_eq!(p.avatar, DEFAULT_AVATAR);
    assert_eq!(p.level, CefrLevel::A1);
    assert_eq!(p.theme, Theme::Light);
    assert!(p.is_onboarded);
    assert_eq!(p.total_xp, 0);
    assert_eq!(p.current_streak, 0);
    assert_eq!(p.last_activity_date, today());
  }

  #[test]
  fn blank_strings_fall_through() {
    let row = UserRow { nickname: Some("  ".into()), username: Some("kept".into()), ..bare_row() };
    assert_eq!(row.normalize(today()).nickname, "kept");
  }

  #[test]
  fn nickname_held_through_either_column() {
    let row = UserRow { username: Some("legacy".into()), ..bare_row() };
    assert!(row.holds_nickname("legacy"));
    assert!(!row.holds_nickname("other"));
  }
}
