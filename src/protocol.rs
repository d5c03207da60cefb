//! Public request/response structs for the HTTP endpoints (serde ready).
//! Field names follow the mobile client (camelCase), with aliases for the
//! older snake_case spellings where clients still send them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ExerciseKind, Task, Tier, UserGameState, UserId, UserProfile, WeekdayLabel, WordId, WordStatus,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterIn {
    pub email: String,
    pub password: String,
    pub username: String,
    pub name: String,
    pub gender: String,
    pub language: String,
    #[serde(alias = "birthdate")]
    pub birth_date: String,
    pub goals: Vec<String>,
    pub current_level: String,
    pub aim_level: String,
    #[serde(rename = "time", alias = "studyTime")]
    pub study_time: String,
    pub avatar: String,
}

impl RegisterIn {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            email: self.email,
            username: self.username,
            name: self.name,
            gender: self.gender,
            language: self.language,
            birthdate: self.birth_date,
            current_level: self.current_level,
            aim_level: self.aim_level,
            study_time: self.study_time,
            goals: self.goals,
            avatar: self.avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOut {
    pub token: String,
    pub user_id: UserId,
}

/// One task of a batch, as the client renders it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOut {
    pub id: String,
    pub word_id: WordId,
    pub exercise_kind: ExerciseKind,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub sentence: String,
    pub masked_sentence: String,
    pub translation: String,
    pub difficulty_tier: Tier,
    pub text: String,
}

pub fn to_out(t: &Task) -> TaskOut {
    TaskOut {
        id: t.id.clone(),
        word_id: t.word_id,
        exercise_kind: t.kind,
        options: t.options.clone(),
        correct_answer: t.correct_answer.clone(),
        sentence: t.sentence.clone(),
        masked_sentence: t.masked_sentence.clone(),
        translation: t.translation.clone(),
        difficulty_tier: t.difficulty_tier,
        text: t.text.clone(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivesOut {
    pub lives: u32,
    pub bonus_lives: u32,
    pub total_lives: u32,
}

impl LivesOut {
    pub fn of(game: &UserGameState) -> Self {
        Self { lives: game.lives, bonus_lives: game.bonus_lives, total_lives: game.total_lives() }
    }
}

#[derive(Debug, Serialize)]
pub struct AsrOut {
    pub correct: bool,
    pub transcribed: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOut {
    pub id: UserId,
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(flatten)]
    pub game: UserGameState,
    pub daily_goal: u32,
    pub next_life_in_seconds: i64,
    pub server_time: String,
    pub total_lives: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdateIn {
    pub name: Option<String>,
    #[serde(alias = "birthdate")]
    pub birth_date: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateIn {
    #[serde(alias = "old_password")]
    pub old_password: String,
    #[serde(alias = "new_password", alias = "password")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakOut {
    pub streak: u32,
    pub days: Vec<WeekdayLabel>,
    pub last_login: Option<NaiveDate>,
    pub tree_phase: u8,
    pub tree_phase_progress_percent: f64,
}

impl StreakOut {
    pub fn of(game: &UserGameState) -> Self {
        Self {
            streak: game.streak_count,
            days: game.streak_calendar_days.labels(),
            last_login: game.last_active_date,
            tree_phase: game.tree_phase,
            tree_phase_progress_percent: game.tree_phase_progress_percent,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    pub tree_xp: u32,
    pub learned_words: u32,
    pub position: usize,
    pub is_current: bool,
}

#[derive(Debug, Deserialize)]
pub struct WordListQuery {
    #[serde(rename = "type")]
    pub status: WordStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordListEntry {
    pub word_id: WordId,
    pub word: String,
    pub translation: String,
}

#[derive(Debug, Serialize)]
pub struct RandomWordOut {
    pub word: String,
    pub translation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOut {
    pub coins: u32,
    #[serde(flatten)]
    pub lives: LivesOut,
}

#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}
