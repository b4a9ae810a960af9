//! HTTP endpoint handlers. Thin wrappers that forward to the services in
//! `AppState`; every handler is instrumented and returns `AppResult`.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::StatusCode,
  Json,
};
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::protocol::*;
use crate::recorder::{ProgressOverview, ProgressReceipt, ProgressRequest};
use crate::state::AppState;
use crate::util::parse_telegram_id;

fn required_telegram_id(raw: Option<String>) -> AppResult<i64> {
  let raw = raw.ok_or_else(|| AppError::BadRequest("telegram_id is required".into()))?;
  parse_telegram_id(&raw)
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
  Json(HealthOut { ok: true, store: state.store.kind() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TelegramQuery>,
) -> AppResult<Json<UserOut>> {
  let telegram_id = required_telegram_id(q.telegram_id)?;
  let user = state.sessions.find(telegram_id).await?;
  Ok(Json(UserOut { user }))
}

#[instrument(level = "info", skip(state, body), fields(telegram_id = body.telegram_id, level = %body.level))]
pub async fn http_post_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateUserIn>,
) -> AppResult<(StatusCode, Json<UserOut>)> {
  let (user, created) = state.sessions.provision(body.into()).await?;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(UserOut { user: Some(user) })))
}

#[instrument(level = "info", skip(state, body), fields(telegram_id = body.telegram_id))]
pub async fn http_put_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UpdateUserIn>,
) -> AppResult<Json<UserOut>> {
  let user = state.sessions.update(body.into()).await?;
  Ok(Json(UserOut { user: Some(user) }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_check_nickname(
  State(state): State<Arc<AppState>>,
  Query(q): Query<NicknameQuery>,
) -> AppResult<Json<NicknameOut>> {
  let nickname = q.nickname.ok_or_else(|| AppError::BadRequest("nickname is required".into()))?;
  let exclude = q.telegram_id.as_deref().map(parse_telegram_id).transpose()?;
  let availability = state.sessions.check_nickname(&nickname, exclude).await?;
  Ok(Json(availability.into()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TelegramQuery>,
) -> AppResult<Json<ProgressOverview>> {
  let telegram_id = required_telegram_id(q.telegram_id)?;
  Ok(Json(state.recorder.overview(telegram_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(telegram_id = body.telegram_id, lesson_id = %body.lesson_id))]
pub async fn http_post_progress(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProgressRequest>,
) -> AppResult<Json<ProgressReceipt>> {
  let receipt = state.recorder.record(body).await?;
  info!(target: "progress", xp_applied = receipt.xp_applied, total_xp = receipt.total_xp, "HTTP progress recorded");
  Ok(Json(receipt))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_lessons(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LessonsQuery>,
) -> AppResult<Json<LessonsOut>> {
  let lessons = state.catalog.list_lessons(q.level).await?;
  Ok(Json(LessonsOut { lessons }))
}

#[instrument(level = "info", skip(state, body), fields(level = %body.level, order = body.order))]
pub async fn http_post_lesson(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateLessonIn>,
) -> AppResult<(StatusCode, Json<LessonOut>)> {
  let lesson = state.catalog.create_lesson(body.into()).await?;
  Ok((StatusCode::CREATED, Json(LessonOut { lesson })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exercises(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ExercisesQuery>,
) -> AppResult<Json<ExercisesOut>> {
  let exercises = state.catalog.list_exercises(q.lesson_id).await?;
  Ok(Json(ExercisesOut { exercises }))
}

#[instrument(level = "info", skip(state, body), fields(lesson_id = %body.lesson_id, kind = %body.kind))]
pub async fn http_post_exercise(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateExerciseIn>,
) -> AppResult<(StatusCode, Json<ExerciseOut>)> {
  let exercise = state.catalog.create_exercise(body.into()).await?;
  Ok((StatusCode::CREATED, Json(ExerciseOut { exercise })))
}
