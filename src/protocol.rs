//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Requests use the Mini App's camelCase field names; responses are snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{CreateExercise, CreateLesson};
use crate::domain::{CefrLevel, DbId, Exercise, ExerciseKind, Lesson, Theme, UserPatch, UserProfile};
use crate::engine::{GameView, Haptic, Input};
use crate::sessions::{CreateUser, NicknameAvailability, UpdateUser};
use crate::util::lenient_i64;

//
// WebSocket lesson play
//

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Establish the session identity. Never creates a user.
    Hello {
        #[serde(rename = "telegramId", deserialize_with = "lenient_i64")]
        telegram_id: i64,
    },
    StartLesson {
        #[serde(rename = "lessonId")]
        lesson_id: DbId,
    },
    Input {
        input: Input,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Profile {
        user: UserProfile,
    },
    Exercise {
        index: usize,
        total: usize,
        exercise_id: DbId,
        kind: ExerciseKind,
        xp_reward: i32,
        /// Absent for exercises that can only be skipped.
        view: Option<GameView>,
    },
    Effect {
        haptic: Haptic,
    },
    State {
        view: GameView,
    },
    ExerciseResult {
        correct: bool,
        score: u32,
        #[serde(rename = "xpEarned")]
        xp_earned: i64,
    },
    LessonComplete {
        #[serde(rename = "totalXp")]
        total_xp: i64,
        #[serde(rename = "bonusXp")]
        bonus_xp: i64,
    },
    NoExercises {
        lesson_id: DbId,
    },
    Error {
        message: String,
        code: &'static str,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub store: &'static str,
}

/// `telegram_id` stays a string so a malformed value is a 400 with a clear
/// message rather than a generic extractor rejection.
#[derive(Debug, Deserialize)]
pub struct TelegramQuery {
    pub telegram_id: Option<String>,
}

#[derive(Serialize)]
pub struct UserOut {
    pub user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserIn {
    #[serde(deserialize_with = "lenient_i64")]
    pub telegram_id: i64,
    pub nickname: String,
    pub avatar: String,
    pub level: CefrLevel,
    #[serde(default)]
    pub theme: Theme,
}

impl From<CreateUserIn> for CreateUser {
    fn from(body: CreateUserIn) -> Self {
        CreateUser {
            telegram_id: body.telegram_id,
            nickname: body.nickname,
            avatar: body.avatar,
            level: body.level,
            theme: body.theme,
        }
    }
}

/// Profile edit. XP fields sent by older clients are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserIn {
    #[serde(deserialize_with = "lenient_i64")]
    pub telegram_id: i64,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub level: Option<CefrLevel>,
    #[serde(default)]
    pub theme: Option<Theme>,
}

impl From<UpdateUserIn> for UpdateUser {
    fn from(body: UpdateUserIn) -> Self {
        UpdateUser {
            telegram_id: body.telegram_id,
            patch: UserPatch {
                nickname: body.nickname,
                avatar: body.avatar,
                level: body.level,
                theme: body.theme,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NicknameQuery {
    pub nickname: Option<String>,
    pub telegram_id: Option<String>,
}

#[derive(Serialize)]
pub struct NicknameOut {
    pub nickname: String,
    pub available: bool,
    pub reason: Option<&'static str>,
}

impl From<NicknameAvailability> for NicknameOut {
    fn from(a: NicknameAvailability) -> Self {
        NicknameOut { nickname: a.nickname, available: a.available, reason: a.issue.map(|i| i.reason()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct LessonsQuery {
    pub level: Option<CefrLevel>,
}

#[derive(Serialize)]
pub struct LessonsOut {
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize)]
pub struct LessonOut {
    pub lesson: Lesson,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonIn {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub level: CefrLevel,
    pub order: i32,
}

impl From<CreateLessonIn> for CreateLesson {
    fn from(body: CreateLessonIn) -> Self {
        CreateLesson { title: body.title, description: body.description, level: body.level, order: body.order }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExercisesQuery {
    pub lesson_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ExercisesOut {
    pub exercises: Vec<Exercise>,
}

#[derive(Serialize)]
pub struct ExerciseOut {
    pub exercise: Exercise,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExerciseIn {
    pub lesson_id: DbId,
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    pub order: i32,
    pub content: serde_json::Value,
    #[serde(default)]
    pub xp_reward: Option<i32>,
}

impl From<CreateExerciseIn> for CreateExercise {
    fn from(body: CreateExerciseIn) -> Self {
        CreateExercise {
            lesson_id: body.lesson_id,
            kind: body.kind,
            order: body.order,
            content: body.content,
            xp_reward: body.xp_reward,
        }
    }
}
