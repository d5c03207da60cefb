//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Body and query rejections become 400s through `AppError`.

use std::sync::Arc;
use axum::{
  extract::{rejection::{JsonRejection, QueryRejection}, Multipart, Query, State},
  response::IntoResponse,
  Json,
};
use tracing::{debug, instrument};

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::logic::*;
use crate::progress::Submission;
use crate::protocol::*;
use crate::state::AppState;

type SharedState = State<Arc<AppState>>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(OkOut { ok: true }) }

#[instrument(level = "info", skip_all)]
pub async fn http_register(
  State(state): SharedState,
  body: Result<Json<RegisterIn>, JsonRejection>,
) -> AppResult<Json<AuthOut>> {
  let Json(body) = body?;
  Ok(Json(register(&state, body).await?))
}

#[instrument(level = "info", skip_all)]
pub async fn http_login(
  State(state): SharedState,
  body: Result<Json<LoginIn>, JsonRejection>,
) -> AppResult<Json<AuthOut>> {
  let Json(body) = body?;
  Ok(Json(login(&state, body).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_next_task(State(state): SharedState, user: AuthUser) -> AppResult<Json<Vec<TaskOut>>> {
  Ok(Json(next_tasks(&state, user.user_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = user.user_id))]
pub async fn http_submit_result(
  State(state): SharedState,
  user: AuthUser,
  body: Result<Json<Submission>, JsonRejection>,
) -> AppResult<Json<LivesOut>> {
  let Json(sub) = body?;
  Ok(Json(submit_result(&state, user.user_id, sub).await?))
}

async fn read_asr_form(mut form: Multipart) -> AppResult<AsrUpload> {
  let bad = |e: axum::extract::multipart::MultipartError| AppError::Validation(e.body_text());
  let mut file: Option<(String, Vec<u8>)> = None;
  let mut expected: Option<String> = None;
  while let Some(field) = form.next_field().await.map_err(bad)? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("file") => {
        let name = field.file_name().unwrap_or("audio.m4a").to_string();
        let bytes = field.bytes().await.map_err(bad)?;
        file = Some((name, bytes.to_vec()));
      }
      Some("expected") => expected = Some(field.text().await.map_err(bad)?),
      other => debug!(target: "vocab_trainer", field = ?other, "Ignoring multipart field"),
    }
  }
  let (file_name, bytes) = file.ok_or_else(|| AppError::Validation("no file provided".into()))?;
  let expected = expected.ok_or_else(|| AppError::Validation("missing expected text".into()))?;
  Ok(AsrUpload { file_name, bytes, expected })
}

#[instrument(level = "info", skip(state, form), fields(user_id = user.user_id))]
pub async fn http_asr_submit(State(state): SharedState, user: AuthUser, form: Multipart) -> AppResult<Json<AsrOut>> {
  let upload = read_asr_form(form).await?;
  Ok(Json(asr_submit(&state, user.user_id, upload).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_profile(State(state): SharedState, user: AuthUser) -> AppResult<Json<ProfileOut>> {
  Ok(Json(profile(&state, user.user_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = user.user_id))]
pub async fn http_update_profile(
  State(state): SharedState,
  user: AuthUser,
  body: Result<Json<ProfileUpdateIn>, JsonRejection>,
) -> AppResult<Json<OkOut>> {
  let Json(body) = body?;
  Ok(Json(update_profile(&state, user.user_id, body).await?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = user.user_id))]
pub async fn http_update_password(
  State(state): SharedState,
  user: AuthUser,
  body: Result<Json<PasswordUpdateIn>, JsonRejection>,
) -> AppResult<Json<OkOut>> {
  let Json(body) = body?;
  Ok(Json(update_password(&state, user.user_id, body).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_streak(State(state): SharedState, user: AuthUser) -> AppResult<Json<StreakOut>> {
  Ok(Json(streak(&state, user.user_id).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_update_streak(State(state): SharedState, user: AuthUser) -> AppResult<Json<StreakOut>> {
  Ok(Json(update_streak(&state, user.user_id).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_leaderboard(State(state): SharedState, user: AuthUser) -> AppResult<Json<Vec<LeaderboardEntry>>> {
  Ok(Json(leaderboard(&state, user.user_id).await?))
}

#[instrument(level = "info", skip(state, q), fields(user_id = user.user_id))]
pub async fn http_word_list(
  State(state): SharedState,
  user: AuthUser,
  q: Result<Query<WordListQuery>, QueryRejection>,
) -> AppResult<Json<Vec<WordListEntry>>> {
  let Query(q) = q?;
  Ok(Json(word_list(&state, user.user_id, q.status).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = _user.user_id))]
pub async fn http_random_word(State(state): SharedState, _user: AuthUser) -> AppResult<Json<RandomWordOut>> {
  Ok(Json(random_word(&state)?))
}

#[instrument(level = "info", skip(state), fields(user_id = user.user_id))]
pub async fn http_buy_life(State(state): SharedState, user: AuthUser) -> AppResult<Json<PurchaseOut>> {
  Ok(Json(buy_life(&state, user.user_id).await?))
}
