//! User session resolution, onboarding provisioning and nickname checks.
//!
//! Lookup never creates users. Provisioning is the explicit onboarding step.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::{CefrLevel, NewUser, Theme, UserPatch, UserProfile};
use crate::error::CoreError;
use crate::store::Store;

pub const NICKNAME_MIN: usize = 3;
pub const NICKNAME_MAX: usize = 20;

/// Identity of the player driving a lesson, established once per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionContext {
  pub telegram_id: i64,
}

/// Why a nickname cannot be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NicknameIssue {
  Length,
  Charset,
  Taken,
}

impl NicknameIssue {
  pub fn reason(&self) -> &'static str {
    match self {
      NicknameIssue::Length => "Nickname must be between 3 and 20 characters",
      NicknameIssue::Charset => "Nickname can only contain letters, numbers, underscore and dash",
      NicknameIssue::Taken => "Nickname is already taken",
    }
  }
}

/// Format rules only; never touches the store.
pub fn validate_nickname(nickname: &str) -> Result<(), NicknameIssue> {
  let len = nickname.chars().count();
  if !(NICKNAME_MIN..=NICKNAME_MAX).contains(&len) {
    return Err(NicknameIssue::Length);
  }
  if !nickname.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
    return Err(NicknameIssue::Charset);
  }
  Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NicknameAvailability {
  pub nickname: String,
  pub available: bool,
  pub issue: Option<NicknameIssue>,
}

#[derive(Clone, Debug)]
pub struct CreateUser {
  pub telegram_id: i64,
  pub nickname: String,
  pub avatar: String,
  pub level: CefrLevel,
  pub theme: Theme,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateUser {
  pub telegram_id: i64,
  pub patch: UserPatch,
}

#[derive(Clone)]
pub struct SessionResolver {
  store: Arc<dyn Store>,
}

impl SessionResolver {
  pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

  /// Existing user for `telegram_id`, or `None`.
  #[instrument(level = "debug", skip(self))]
  pub async fn find(&self, telegram_id: i64) -> Result<Option<UserProfile>, CoreError> {
    self.store.find_user(telegram_id).await
  }

  /// Like [`find`](Self::find) but absence is an error.
  pub async fn require(&self, ctx: &SessionContext) -> Result<UserProfile, CoreError> {
    self.find(ctx.telegram_id)
      .await?
      .ok_or_else(|| CoreError::not_found("user", ctx.telegram_id))
  }

  /// Check `candidate` against the format rules, then against both naming
  /// columns. `exclude` is the caller's own identity.
  #[instrument(level = "debug", skip(self))]
  pub async fn check_nickname(&self, candidate: &str, exclude: Option<i64>) -> Result<NicknameAvailability, CoreError> {
    let issue = match validate_nickname(candidate) {
      Err(issue) => Some(issue),
      Ok(()) => {
        let holders = self.store.nickname_holders(candidate).await?;
        holders
          .iter()
          .any(|id| Some(*id) != exclude)
          .then_some(NicknameIssue::Taken)
      }
    };
    Ok(NicknameAvailability { nickname: candidate.to_string(), available: issue.is_none(), issue })
  }

  async fn ensure_nickname_usable(&self, nickname: &str, owner: i64) -> Result<(), CoreError> {
    let check = self.check_nickname(nickname, Some(owner)).await?;
    match check.issue {
      None => Ok(()),
      Some(NicknameIssue::Taken) => Err(CoreError::Conflict(NicknameIssue::Taken.reason().into())),
      Some(issue) => Err(CoreError::Validation(issue.reason().into())),
    }
  }

  /// Onboarding: create the user, or update the profile in place when the
  /// identity already exists. Returns the profile and whether it was created.
  #[instrument(level = "info", skip(self, req), fields(telegram_id = req.telegram_id))]
  pub async fn provision(&self, req: CreateUser) -> Result<(UserProfile, bool), CoreError> {
    if req.avatar.trim().is_empty() {
      return Err(CoreError::Validation("avatar is required".into()));
    }
    self.ensure_nickname_usable(&req.nickname, req.telegram_id).await?;

    if self.store.find_user(req.telegram_id).await?.is_some() {
      let patch = UserPatch {
        nickname: Some(req.nickname),
        avatar: Some(req.avatar),
        level: Some(req.level),
        theme: Some(req.theme),
      };
      let user = self
        .store
        .update_user(req.telegram_id, &patch)
        .await?
        .ok_or_else(|| CoreError::not_found("user", req.telegram_id))?;
      info!(target: "users", telegram_id = user.telegram_id, "Existing user re-onboarded");
      return Ok((user, false));
    }

    let user = self
      .store
      .insert_user(&NewUser {
        telegram_id: req.telegram_id,
        nickname: req.nickname,
        avatar: req.avatar,
        level: req.level,
        theme: req.theme,
      })
      .await?;
    info!(target: "users", telegram_id = user.telegram_id, level = %user.level, "User provisioned");
    Ok((user, true))
  }

  /// Partial profile edit for an existing user.
  #[instrument(level = "info", skip(self, req), fields(telegram_id = req.telegram_id))]
  pub async fn update(&self, req: UpdateUser) -> Result<UserProfile, CoreError> {
    if let Some(nickname) = &req.patch.nickname {
      self.ensure_nickname_usable(nickname, req.telegram_id).await?;
    }
    self.store
      .update_user(req.telegram_id, &req.patch)
      .await?
      .ok_or_else(|| CoreError::not_found("user", req.telegram_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::legacy::UserRow;
  use crate::store::MemoryStore;
  use chrono::Utc;
  use uuid::Uuid;

  fn create(telegram_id: i64, nickname: &str) -> CreateUser {
    CreateUser {
      telegram_id,
      nickname: nickname.into(),
      avatar: "🦉".into(),
      level: CefrLevel::A1,
      theme: Theme::Light,
    }
  }

  fn legacy_row(telegram_id: i64, username: &str) -> UserRow {
    let now = Utc::now();
    UserRow {
      id: Uuid::new_v4(),
      telegram_id,
      nickname: None,
      username: Some(username.into()),
      avatar: None,
      first_name: Some("🐸".into()),
      level: Some("A2".into()),
      theme: None,
      is_onboarded: None,
      total_xp: None,
      xp: Some(40),
      current_streak: None,
      last_activity_date: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn nickname_format_rules() {
    assert_eq!(validate_nickname("ab"), Err(NicknameIssue::Length));
    assert_eq!(validate_nickname(&"x".repeat(21)), Err(NicknameIssue::Length));
    assert_eq!(validate_nickname("abc"), Ok(()));
    assert_eq!(validate_nickname(&"x".repeat(20)), Ok(()));
    assert_eq!(validate_nickname("bad name"), Err(NicknameIssue::Charset));
    assert_eq!(validate_nickname("привет"), Err(NicknameIssue::Charset));
    assert_eq!(validate_nickname("good_name-1"), Ok(()));
  }

  #[tokio::test]
  async fn short_nickname_is_rejected_without_store_state() {
    let resolver = SessionResolver::new(Arc::new(MemoryStore::new()));
    let check = resolver.check_nickname("ab", None).await.unwrap();
    assert!(!check.available);
    assert_eq!(check.issue, Some(NicknameIssue::Length));
    assert!(check.issue.unwrap().reason().contains("between 3 and 20"));
  }

  #[tokio::test]
  async fn lookup_never_provisions() {
    let store = Arc::new(MemoryStore::new());
    let resolver = SessionResolver::new(store.clone());
    assert!(resolver.find(555).await.unwrap().is_none());
    assert!(store.find_user(555).await.unwrap().is_none());
    let err = resolver.require(&SessionContext { telegram_id: 555 }).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
  }

  #[tokio::test]
  async fn provision_creates_then_updates_in_place() {
    let resolver = SessionResolver::new(Arc::new(MemoryStore::new()));
    let (user, created) = resolver.provision(create(10, "alice")).await.unwrap();
    assert!(created);
    assert_eq!(user.total_xp, 0);
    assert!(user.is_onboarded);

    let again = CreateUser { level: CefrLevel::B2, ..create(10, "alice_2") };
    let (updated, created) = resolver.provision(again).await.unwrap();
    assert!(!created);
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.nickname, "alice_2");
    assert_eq!(updated.level, CefrLevel::B2);
  }

  #[tokio::test]
  async fn taken_nickname_checks_both_columns() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw_user(legacy_row(1, "oldtimer")).await;
    let resolver = SessionResolver::new(store);
    resolver.provision(create(2, "newcomer")).await.unwrap();

    let legacy = resolver.check_nickname("oldtimer", None).await.unwrap();
    assert_eq!(legacy.issue, Some(NicknameIssue::Taken));
    let current = resolver.check_nickname("newcomer", Some(3)).await.unwrap();
    assert_eq!(current.issue, Some(NicknameIssue::Taken));
    let own = resolver.check_nickname("newcomer", Some(2)).await.unwrap();
    assert!(own.available);
  }

  #[tokio::test]
  async fn provisioning_a_taken_nickname_conflicts() {
    let resolver = SessionResolver::new(Arc::new(MemoryStore::new()));
    resolver.provision(create(1, "bob")).await.unwrap();
    let err = resolver.provision(create(2, "bob")).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    let err = resolver.provision(create(3, "b!")).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
  }

  #[tokio::test]
  async fn legacy_user_is_normalized_on_lookup() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw_user(legacy_row(77, "legacy_lee")).await;
    let resolver = SessionResolver::new(store);
    let user = resolver.find(77).await.unwrap().unwrap();
    assert_eq!(user.nickname, "legacy_lee");
    assert_eq!(user.avatar, "🐸");
    assert_eq!(user.total_xp, 40);
    assert_eq!(user.level, CefrLevel::A2);
  }

  #[tokio::test]
  async fn update_edits_profile_but_not_xp() {
    let resolver = SessionResolver::new(Arc::new(MemoryStore::new()));
    resolver.provision(create(5, "carol")).await.unwrap();
    let patch = UserPatch { theme: Some(Theme::Dark), avatar: Some("🐙".into()), ..UserPatch::default() };
    let user = resolver.update(UpdateUser { telegram_id: 5, patch }).await.unwrap();
    assert_eq!(user.theme, Theme::Dark);
    assert_eq!(user.avatar, "🐙");
    assert_eq!(user.nickname, "carol");
    assert_eq!(user.total_xp, 0);

    let missing = resolver.update(UpdateUser { telegram_id: 6, patch: UserPatch::default() }).await;
    assert!(matches!(missing, Err(CoreError::NotFound { .. })));
  }
}
