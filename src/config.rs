//! Runtime configuration: server settings from the environment plus an
//! optional TOML content bank of lessons and exercises.
//!
//! Environment:
//!   PORT                     : u16 (default 3000)
//!   STORE_BACKEND            : "postgres" (default) or "memory"
//!   DATABASE_URL             : required for the postgres backend
//!   DATABASE_MAX_CONNECTIONS : pool size (default 5)
//!   CONTENT_CONFIG_PATH      : TOML content bank, see [`ContentBank`]
//!   STATIC_DIR               : Mini App bundle (default "./static")

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{CefrLevel, ExerciseKind};
use crate::error::CoreError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub port: u16,
  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub content_config_path: Option<PathBuf>,
  pub static_dir: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      store_backend: StoreBackend::Memory,
      database_url: None,
      database_max_connections: DEFAULT_MAX_CONNECTIONS,
      content_config_path: None,
      static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
    }
  }
}

impl ServerConfig {
  pub fn from_env() -> Result<Self, CoreError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; blank values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = match get("PORT") {
      Some(p) => p
        .parse::<u16>()
        .map_err(|_| CoreError::Configuration(format!("PORT must be a port number, got '{p}'")))?,
      None => DEFAULT_PORT,
    };

    let store_backend = match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("postgres") => StoreBackend::Postgres,
      Some("memory") => StoreBackend::Memory,
      Some(other) => {
        return Err(CoreError::Configuration(format!(
          "STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"
        )))
      }
    };

    let database_url = get("DATABASE_URL");
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(CoreError::Configuration("DATABASE_URL is required for the postgres store".into()));
    }

    let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
      Some(n) => n.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
        CoreError::Configuration(format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got '{n}'"))
      })?,
      None => DEFAULT_MAX_CONNECTIONS,
    };

    Ok(Self {
      port,
      store_backend,
      database_url,
      database_max_connections,
      content_config_path: get("CONTENT_CONFIG_PATH").map(PathBuf::from),
      static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
    })
  }
}

/// Lessons to install at startup.
///
/// ```toml
/// [[lessons]]
/// title = "Greetings"
/// level = "A1"
/// order = 1
///
/// [[lessons.exercises]]
/// type = "quiz"
/// order = 1
/// content = { question = "Hello =", options = ["Привет", "Пока"], correct = "Привет" }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContentBank {
  #[serde(default)]
  pub lessons: Vec<LessonCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LessonCfg {
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub level: CefrLevel,
  pub order: i32,
  #[serde(default)]
  pub exercises: Vec<ExerciseCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseCfg {
  #[serde(rename = "type")]
  pub kind: ExerciseKind,
  pub order: i32,
  #[serde(default)]
  pub xp_reward: Option<i32>,
  pub content: serde_json::Value,
}

pub fn parse_content_bank(text: &str) -> Result<ContentBank, toml::de::Error> {
  toml::from_str::<ContentBank>(text)
}

/// Read and parse a content bank. On any IO or parse error, logs and returns None.
pub fn load_content_bank(path: &std::path::Path) -> Option<ContentBank> {
  let shown = path.display();
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_content_bank(&s) {
      Ok(bank) => {
        info!(target: "lingvo_backend", path = %shown, lessons = bank.lessons.len(), "Loaded content bank (TOML)");
        Some(bank)
      }
      Err(e) => {
        error!(target: "lingvo_backend", path = %shown, error = %e, "Failed to parse content bank");
        None
      }
    },
    Err(e) => {
      error!(target: "lingvo_backend", path = %shown, error = %e, "Failed to read content bank file");
      None
    }
  }
}
