//! Core behaviors behind the HTTP handlers.
//!
//! Every mutation of a user runs inside `Store::transact`; oracle calls
//! happen outside of it so a slow model never holds a user lock.

use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, instrument, warn};

use crate::auth;
use crate::catalog::template_translation;
use crate::clock::{self, StreakRoll};
use crate::domain::{UserId, WordStatus, MAX_LIVES};
use crate::error::{AppError, AppResult};
use crate::progress::{self, Submission};
use crate::protocol::*;
use crate::selector;
use crate::state::AppState;
use crate::util::transcript_matches;

pub const LIFE_PRICE_COINS: u32 = 5;
pub const LEADERBOARD_SIZE: usize = 100;

fn require(field: &str, value: &str) -> AppResult<()> {
  if value.trim().is_empty() {
    return Err(AppError::Validation(format!("{field} is required")));
  }
  Ok(())
}

#[instrument(level = "info", skip_all)]
pub async fn register(state: &AppState, body: RegisterIn) -> AppResult<AuthOut> {
  require("email", &body.email)?;
  require("password", &body.password)?;
  let hash = auth::hash_password(&body.password)?;
  let now = clock::now();
  let user_id = state.store.create_user(body.into_profile(), hash, now).await?;
  let token = auth::issue_session(&state.store, user_id, state.settings.auth.session_ttl_hours, now).await;
  info!(target: "auth", user_id, "User registered");
  Ok(AuthOut { token, user_id })
}

#[instrument(level = "info", skip_all)]
pub async fn login(state: &AppState, body: LoginIn) -> AppResult<AuthOut> {
  let invalid = || AppError::Auth("invalid email or password".into());
  let user_id = state.store.find_by_email(&body.email).await.ok_or_else(invalid)?;
  let record = state.store.load(user_id).await?;
  if !auth::verify_password(&body.password, &record.password_hash) {
    warn!(target: "auth", user_id, "Login rejected");
    return Err(invalid());
  }
  let now = clock::now();
  let rollover = state
    .store
    .transact(user_id, |rec| Ok(clock::on_login(&mut rec.game, now)))
    .await?;
  let token = auth::issue_session(&state.store, user_id, state.settings.auth.session_ttl_hours, now).await;
  info!(target: "auth", user_id, roll = ?rollover.roll, penalty = rollover.penalty, "User logged in");
  Ok(AuthOut { token, user_id })
}

#[instrument(level = "info", skip(state))]
pub async fn profile(state: &AppState, user_id: UserId) -> AppResult<ProfileOut> {
  let now = clock::now();
  let (record, daily_goal, tick) = state
    .store
    .transact(user_id, |rec| {
      let goal = clock::daily_goal_for(&rec.profile.study_time);
      let tick = clock::on_profile_fetch(&mut rec.game, goal, now);
      Ok((rec.clone(), goal, tick))
    })
    .await?;
  Ok(ProfileOut {
    id: record.id,
    total_lives: record.game.total_lives(),
    profile: record.profile,
    game: record.game,
    daily_goal,
    next_life_in_seconds: tick.next_life_in_seconds,
    server_time: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
  })
}

#[instrument(level = "info", skip(state, body))]
pub async fn update_profile(state: &AppState, user_id: UserId, body: ProfileUpdateIn) -> AppResult<OkOut> {
  state
    .store
    .transact(user_id, |rec| {
      if let Some(name) = body.name {
        rec.profile.name = name;
      }
      if let Some(birthdate) = body.birth_date {
        rec.profile.birthdate = birthdate;
      }
      if let Some(avatar) = body.avatar {
        rec.profile.avatar = avatar;
      }
      Ok(())
    })
    .await?;
  Ok(OkOut { ok: true })
}

#[instrument(level = "info", skip(state, body))]
pub async fn update_password(state: &AppState, user_id: UserId, body: PasswordUpdateIn) -> AppResult<OkOut> {
  require("newPassword", &body.new_password)?;
  let record = state.store.load(user_id).await?;
  if !auth::verify_password(&body.old_password, &record.password_hash) {
    return Err(AppError::Auth("current password is wrong".into()));
  }
  let hash = auth::hash_password(&body.new_password)?;
  state
    .store
    .transact(user_id, |rec| {
      rec.password_hash = hash;
      Ok(())
    })
    .await?;
  info!(target: "auth", user_id, "Password changed");
  Ok(OkOut { ok: true })
}

/// Regenerate lives, refuse users without any, then select a batch.
#[instrument(level = "info", skip(state))]
pub async fn next_tasks(state: &AppState, user_id: UserId) -> AppResult<Vec<TaskOut>> {
  let now = clock::now();
  let record = state
    .store
    .transact(user_id, |rec| {
      clock::regenerate_all(&mut rec.game, now);
      if rec.game.total_lives() == 0 {
        return Err(AppError::InsufficientResource("not enough lives".into()));
      }
      Ok(rec.clone())
    })
    .await?;

  let mut rng = StdRng::from_entropy();
  let tasks = selector::select_tasks(
    state.catalog.tasks(),
    record.profile.tier_window(),
    &record.words,
    &state.oracle,
    &mut rng,
  )
  .await?;
  Ok(tasks.iter().map(to_out).collect())
}

#[instrument(level = "info", skip(state), fields(word_id = sub.word_id, kind = sub.exercise_kind.as_str(), success = sub.success))]
pub async fn submit_result(state: &AppState, user_id: UserId, sub: Submission) -> AppResult<LivesOut> {
  if !state.catalog.knows_word(sub.word_id) {
    return Err(AppError::NotFound(format!("word {}", sub.word_id)));
  }
  let now = clock::now();
  let (outcome, lives) = state
    .store
    .transact(user_id, |rec| {
      clock::regenerate_all(&mut rec.game, now);
      let outcome = progress::apply_submission(rec, &sub, now);
      Ok((outcome, LivesOut::of(&rec.game)))
    })
    .await?;
  info!(target: "progress", user_id, status = ?outcome.status, newly_learned = outcome.newly_learned, total_lives = lives.total_lives, "Result recorded");
  Ok(lives)
}

/// An uploaded reading attempt.
pub struct AsrUpload {
  pub file_name: String,
  pub bytes: Vec<u8>,
  pub expected: String,
}

#[instrument(level = "info", skip(state, upload), fields(bytes = upload.bytes.len()))]
pub async fn asr_submit(state: &AppState, user_id: UserId, upload: AsrUpload) -> AppResult<AsrOut> {
  require("expected", &upload.expected)?;
  if upload.bytes.is_empty() {
    return Err(AppError::Validation("no file provided".into()));
  }
  let text = state
    .oracle
    .transcribe(&upload.file_name, upload.bytes)
    .await
    .map_err(AppError::DependencyUnavailable)?;
  let transcribed = text.trim().to_lowercase();
  let correct = transcript_matches(&upload.expected, &transcribed);
  info!(target: "oracle", user_id, correct, "Reading attempt scored");
  Ok(AsrOut { correct, transcribed })
}

#[instrument(level = "info", skip(state))]
pub async fn streak(state: &AppState, user_id: UserId) -> AppResult<StreakOut> {
  let record = state.store.load(user_id).await?;
  Ok(StreakOut::of(&record.game))
}

#[instrument(level = "info", skip(state))]
pub async fn update_streak(state: &AppState, user_id: UserId) -> AppResult<StreakOut> {
  let today = clock::now().date();
  let (roll, out) = state
    .store
    .transact(user_id, |rec| {
      let roll = clock::update_streak(&mut rec.game, today);
      Ok((roll, StreakOut::of(&rec.game)))
    })
    .await?;
  if roll != StreakRoll::SameDay {
    info!(target: "vocab_trainer", user_id, ?roll, streak = out.streak, "Streak updated");
  }
  Ok(out)
}

/// Top users by learned words; ties by id.
#[instrument(level = "info", skip(state))]
pub async fn leaderboard(state: &AppState, user_id: UserId) -> AppResult<Vec<LeaderboardEntry>> {
  let mut users = state.store.all_users().await;
  users.sort_by(|a, b| b.game.learned_words.cmp(&a.game.learned_words).then(a.id.cmp(&b.id)));
  Ok(
    users
      .into_iter()
      .take(LEADERBOARD_SIZE)
      .enumerate()
      .map(|(idx, u)| LeaderboardEntry {
        id: u.id,
        is_current: u.id == user_id,
        name: u.profile.name,
        avatar: u.profile.avatar,
        tree_xp: u.game.tree_xp,
        learned_words: u.game.learned_words,
        position: idx + 1,
      })
      .collect(),
  )
}

/// The user's words in one status, in word id order.
#[instrument(level = "info", skip(state))]
pub async fn word_list(state: &AppState, user_id: UserId, status: WordStatus) -> AppResult<Vec<WordListEntry>> {
  let record = state.store.load(user_id).await?;
  Ok(
    record
      .words
      .values()
      .filter(|w| w.status == status)
      .filter_map(|w| {
        let word = state.catalog.word(w.word_id)?;
        Some(WordListEntry {
          word_id: w.word_id,
          word: word.to_string(),
          translation: state.catalog.translation_of(w.word_id).unwrap_or_default().to_string(),
        })
      })
      .collect(),
  )
}

pub fn random_word(state: &AppState) -> AppResult<RandomWordOut> {
  let mut rng = StdRng::from_entropy();
  let t = state
    .catalog
    .random_task(&mut rng)
    .ok_or_else(|| AppError::NotFound("catalog is empty".into()))?;
  let word = state.catalog.word(t.word_id).unwrap_or(t.correct_answer.as_str());
  Ok(RandomWordOut { word: word.to_string(), translation: template_translation(t).to_string() })
}

#[instrument(level = "info", skip(state))]
pub async fn buy_life(state: &AppState, user_id: UserId) -> AppResult<PurchaseOut> {
  let now = clock::now();
  let out = state
    .store
    .transact(user_id, |rec| {
      clock::regenerate_all(&mut rec.game, now);
      let game = &mut rec.game;
      if game.lives >= MAX_LIVES {
        return Err(AppError::Validation("lives are already full".into()));
      }
      if game.coins < LIFE_PRICE_COINS {
        return Err(AppError::Validation("not enough coins".into()));
      }
      game.coins -= LIFE_PRICE_COINS;
      game.lives += 1;
      if game.lives == MAX_LIVES {
        game.life_regen_anchor = None;
      }
      Ok(PurchaseOut { coins: game.coins, lives: LivesOut::of(game) })
    })
    .await?;
  info!(target: "vocab_trainer", user_id, coins = out.coins, lives = out.lives.lives, "Life purchased");
  Ok(out)
}
