//! Domain models used by the backend: catalog entries, exercise kinds, per-word
//! progress, per-user game state and the user record that bundles them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type WordId = u32;

pub const MAX_LIVES: u32 = 5;
pub const INITIAL_XP_CAP: u32 = 20;
pub const XP_CAP_STEP: u32 = 20;

/// Coarse difficulty bucket. Declaration order is the tier order (A < B < C).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
  A,
  B,
  C,
}

impl Tier {
  /// Map a self-reported level ("A1", "medium", ...) onto a tier.
  /// Unknown labels land in A.
  pub fn from_level(level: &str) -> Self {
    match level.trim() {
      "start" | "A1" | "A2" => Tier::A,
      "medium" | "B1" | "B2" => Tier::B,
      "advanced" | "C1" | "C2" => Tier::C,
      _ => Tier::A,
    }
  }
}

/// Inclusive proficiency window used to gate task difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierWindow {
  pub min: Tier,
  pub max: Tier,
}

impl TierWindow {
  pub fn from_levels(current_level: &str, aim_level: &str) -> Self {
    Self { min: Tier::from_level(current_level), max: Tier::from_level(aim_level) }
  }

  /// An inverted window (min > max) contains nothing.
  pub fn contains(&self, tier: Tier) -> bool {
    tier >= self.min && tier <= self.max
  }
}

/// Exercise kinds, in the order the selector cycles through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
  Standard,
  WordTranslation,
  SentenceShuffle,
  AsrReading,
}

impl ExerciseKind {
  pub const CYCLE: [ExerciseKind; 4] = [
    ExerciseKind::Standard,
    ExerciseKind::WordTranslation,
    ExerciseKind::SentenceShuffle,
    ExerciseKind::AsrReading,
  ];

  /// Experience weight awarded on success. ASR reading is not rewarded.
  pub fn xp_weight(self) -> f64 {
    match self {
      ExerciseKind::Standard => 1.5,
      ExerciseKind::WordTranslation => 1.0,
      ExerciseKind::SentenceShuffle => 2.0,
      ExerciseKind::AsrReading => 0.0,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ExerciseKind::Standard => "standard",
      ExerciseKind::WordTranslation => "word_translation",
      ExerciseKind::SentenceShuffle => "sentence_shuffle",
      ExerciseKind::AsrReading => "asr_reading",
    }
  }
}

/// One value per tracked exercise kind. ASR reading has no slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerKind<T> {
  pub standard: T,
  pub word_translation: T,
  pub sentence_shuffle: T,
}

impl<T> PerKind<T> {
  pub fn get(&self, kind: ExerciseKind) -> Option<&T> {
    match kind {
      ExerciseKind::Standard => Some(&self.standard),
      ExerciseKind::WordTranslation => Some(&self.word_translation),
      ExerciseKind::SentenceShuffle => Some(&self.sentence_shuffle),
      ExerciseKind::AsrReading => None,
    }
  }

  pub fn get_mut(&mut self, kind: ExerciseKind) -> Option<&mut T> {
    match kind {
      ExerciseKind::Standard => Some(&mut self.standard),
      ExerciseKind::WordTranslation => Some(&mut self.word_translation),
      ExerciseKind::SentenceShuffle => Some(&mut self.sentence_shuffle),
      ExerciseKind::AsrReading => None,
    }
  }

  pub fn all(&self, pred: impl Fn(&T) -> bool) -> bool {
    pred(&self.standard) && pred(&self.word_translation) && pred(&self.sentence_shuffle)
  }
}

/// Lifecycle stage of a word for one user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
  #[default]
  New,
  Learning,
  Learned,
  Mistaken,
}

/// Static word entry from `words.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordRecord {
  #[serde(rename = "id")]
  pub word_id: WordId,
  #[serde(rename = "word")]
  pub surface_form: String,
}

/// Static exercise template from `tasks.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskTemplate {
  pub word_id: WordId,
  pub masked_sentence: String,
  #[serde(default)]
  pub sentence: String,
  pub correct_answer: String,
  #[serde(default)]
  pub translation: String,
  #[serde(rename = "difficulty")]
  pub difficulty_tier: Tier,
  #[serde(default)]
  pub translation_target: String,
  #[serde(default, rename = "text")]
  pub asr_text: String,
}

/// A materialized task handed to the client.
#[derive(Clone, Debug)]
pub struct Task {
  pub id: String,
  pub word_id: WordId,
  pub kind: ExerciseKind,
  pub options: Vec<String>,
  pub correct_answer: String,
  pub sentence: String,
  pub masked_sentence: String,
  pub translation: String,
  pub difficulty_tier: Tier,
  pub text: String,
}

/// Mastery record of one word for one user. Created on first submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWordProgress {
  pub word_id: WordId,
  pub status: WordStatus,
  pub repeats_total: u32,
  pub mistakes: u32,
  pub repeats_by_kind: PerKind<u32>,
  pub completed_by_kind: PerKind<bool>,
  pub passed_kinds: BTreeSet<ExerciseKind>,
  pub mastery_coefficient: f64,
  pub last_seen_date: Option<NaiveDate>,
}

impl UserWordProgress {
  pub fn new(word_id: WordId) -> Self {
    Self {
      word_id,
      status: WordStatus::New,
      repeats_total: 0,
      mistakes: 0,
      repeats_by_kind: PerKind::default(),
      completed_by_kind: PerKind::default(),
      passed_kinds: BTreeSet::new(),
      mastery_coefficient: 0.0,
      last_seen_date: None,
    }
  }
}

/// Weekday labels as shown in the client's streak calendar.
/// Declaration order is the canonical week order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekdayLabel {
  #[serde(rename = "ПН")]
  Mon,
  #[serde(rename = "ВТ")]
  Tue,
  #[serde(rename = "СР")]
  Wed,
  #[serde(rename = "ЧТ")]
  Thu,
  #[serde(rename = "ПТ")]
  Fri,
  #[serde(rename = "СБ")]
  Sat,
  #[serde(rename = "ВС")]
  Sun,
}

impl WeekdayLabel {
  pub fn of(date: NaiveDate) -> Self {
    match date.weekday() {
      Weekday::Mon => WeekdayLabel::Mon,
      Weekday::Tue => WeekdayLabel::Tue,
      Weekday::Wed => WeekdayLabel::Wed,
      Weekday::Thu => WeekdayLabel::Thu,
      Weekday::Fri => WeekdayLabel::Fri,
      Weekday::Sat => WeekdayLabel::Sat,
      Weekday::Sun => WeekdayLabel::Sun,
    }
  }
}

/// Weekday labels of the current unbroken streak window.
/// Ordered Mon–Sun and deduplicated by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreakCalendar(BTreeSet<WeekdayLabel>);

impl StreakCalendar {
  pub fn only(date: NaiveDate) -> Self {
    let mut cal = Self::default();
    cal.mark(date);
    cal
  }

  pub fn mark(&mut self, date: NaiveDate) {
    self.0.insert(WeekdayLabel::of(date));
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn contains(&self, label: WeekdayLabel) -> bool {
    self.0.contains(&label)
  }

  pub fn labels(&self) -> Vec<WeekdayLabel> {
    self.0.iter().copied().collect()
  }
}

/// Per-user gamification state: experience, currency, lives, streak and tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameState {
  pub xp: u32,
  pub xp_cap_for_level: u32,
  pub level: u32,
  pub coins: u32,

  pub lives: u32,
  pub bonus_lives: u32,
  /// Start of the fine-grained (900 s) regeneration window.
  pub life_regen_anchor: Option<NaiveDateTime>,
  /// Reference point of the coarse (15 min bucket) regeneration check.
  pub last_life_added: Option<NaiveDateTime>,

  pub streak_count: u32,
  pub streak_calendar_days: StreakCalendar,
  pub last_active_date: Option<NaiveDate>,

  pub tree_xp: u32,
  pub tree_phase: u8,
  pub tree_phase_progress_percent: f64,

  pub today_learned_word_count: u32,
  pub last_daily_goal_reward_date: Option<NaiveDate>,
  pub last_streak_reward_date: Option<NaiveDate>,

  pub learning_words: u32,
  pub learned_words: u32,
}

impl UserGameState {
  /// Baseline for a freshly registered user: day one of a streak, full lives.
  pub fn starting(now: NaiveDateTime) -> Self {
    let today = now.date();
    Self {
      xp: 0,
      xp_cap_for_level: INITIAL_XP_CAP,
      level: 1,
      coins: 0,
      lives: MAX_LIVES,
      bonus_lives: 0,
      life_regen_anchor: None,
      last_life_added: Some(now),
      streak_count: 1,
      streak_calendar_days: StreakCalendar::only(today),
      last_active_date: Some(today),
      tree_xp: 0,
      tree_phase: 1,
      tree_phase_progress_percent: 0.0,
      today_learned_word_count: 0,
      last_daily_goal_reward_date: None,
      last_streak_reward_date: None,
      learning_words: 0,
      learned_words: 0,
    }
  }

  pub fn total_lives(&self) -> u32 {
    self.lives + self.bonus_lives
  }
}

/// Self-reported profile data. Not interpreted by the core except for the
/// levels (task gating) and study time (daily goal).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub email: String,
  pub username: String,
  pub name: String,
  pub gender: String,
  pub language: String,
  pub birthdate: String,
  pub current_level: String,
  pub aim_level: String,
  pub study_time: String,
  pub goals: Vec<String>,
  pub avatar: String,
}

impl UserProfile {
  pub fn tier_window(&self) -> TierWindow {
    TierWindow::from_levels(&self.current_level, &self.aim_level)
  }
}

/// Everything owned by one user; the unit of a store transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
  pub id: UserId,
  pub password_hash: String,
  pub profile: UserProfile,
  pub game: UserGameState,
  #[serde(default)]
  pub words: BTreeMap<WordId, UserWordProgress>,
}

impl UserRecord {
  pub fn count_status(&self, status: WordStatus) -> u32 {
    self.words.values().filter(|w| w.status == status).count() as u32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn levels_map_onto_tiers() {
    assert_eq!(Tier::from_level("A1"), Tier::A);
    assert_eq!(Tier::from_level("start"), Tier::A);
    assert_eq!(Tier::from_level("B2"), Tier::B);
    assert_eq!(Tier::from_level("advanced"), Tier::C);
    assert_eq!(Tier::from_level("fluent-ish"), Tier::A);
  }

  #[test]
  fn window_is_inclusive_and_inverted_window_is_empty() {
    let w = TierWindow::from_levels("A1", "B2");
    assert!(w.contains(Tier::A));
    assert!(w.contains(Tier::B));
    assert!(!w.contains(Tier::C));

    let inverted = TierWindow::from_levels("C1", "A2");
    assert!(!inverted.contains(Tier::A));
    assert!(!inverted.contains(Tier::B));
    assert!(!inverted.contains(Tier::C));
  }

  #[test]
  fn calendar_keeps_canonical_order_without_duplicates() {
    // 2026-10-14 is a Wednesday
    let mut cal = StreakCalendar::only(date(2026, 10, 18)); // Sunday
    cal.mark(date(2026, 10, 14));
    cal.mark(date(2026, 10, 12)); // Monday
    cal.mark(date(2026, 10, 19)); // Monday again
    assert_eq!(cal.labels(), vec![WeekdayLabel::Mon, WeekdayLabel::Wed, WeekdayLabel::Sun]);

    for d in 1..=21 {
      cal.mark(date(2026, 10, d));
    }
    assert_eq!(cal.len(), 7);
  }

  #[test]
  fn calendar_serializes_as_client_labels() {
    let cal = StreakCalendar::only(date(2026, 10, 14));
    assert_eq!(serde_json::to_string(&cal).unwrap(), r#"["СР"]"#);
  }

  #[test]
  fn tracked_kinds_exclude_asr() {
    let mut per = PerKind::<u32>::default();
    *per.get_mut(ExerciseKind::SentenceShuffle).unwrap() += 2;
    assert_eq!(per.get(ExerciseKind::SentenceShuffle), Some(&2));
    assert!(per.get(ExerciseKind::AsrReading).is_none());
    assert!(!per.all(|n| *n > 0));
  }

  #[test]
  fn template_reads_catalog_json_shape() {
    let raw = r#"{"word_id":7,"masked_sentence":"Мен <mask> барамын.","sentence":"Мен үйге барамын.",
      "correct_answer":"үйге","translation":"I am going home.","difficulty":"B","text":"Мен үйге барамын"}"#;
    let t: TaskTemplate = serde_json::from_str(raw).unwrap();
    assert_eq!(t.word_id, 7);
    assert_eq!(t.difficulty_tier, Tier::B);
    assert_eq!(t.asr_text, "Мен үйге барамын");
    assert!(t.translation_target.is_empty());
  }
}
