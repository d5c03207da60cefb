//! Progress updater: the per-word mastery state machine and the user-level
//! side effects of one submitted result.
//!
//! Word lifecycle: `new → learning → {learned, mistaken}`; any renewed
//! activity on a non-terminal outcome lands back in `learning`.
//!
//! `apply_submission` mutates a `UserRecord` in place and is meant to run
//! inside a store transaction so lives, XP and counters never race.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::clock::{self, LifeSpent};
use crate::domain::{ExerciseKind, UserGameState, UserRecord, UserWordProgress, WordId, WordStatus, XP_CAP_STEP};

pub const COEFFICIENT_STEP_UP: f64 = 0.2;
pub const COEFFICIENT_STEP_DOWN: f64 = 0.1;
pub const REPEATS_TO_COMPLETE: u32 = 3;
pub const MAX_MISTAKES_TO_COMPLETE: u32 = 1;
pub const LEVEL_XP_MULTIPLIER: f64 = 1.2;

/// One submitted result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  #[serde(alias = "word_id")]
  pub word_id: WordId,
  #[serde(alias = "task_type")]
  pub exercise_kind: ExerciseKind,
  pub success: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubmissionOutcome {
  pub previous_status: WordStatus,
  pub status: WordStatus,
  pub newly_learned: bool,
  pub level_xp_gained: u32,
  pub tree_xp_gained: u32,
  pub leveled_up: bool,
  pub daily_goal_rewarded: bool,
  pub life_spent: Option<LifeSpent>,
}

/// Coefficient moves in tenths; rounding keeps repeated steps from drifting
/// just below 1.0.
fn step_coefficient(current: f64, success: bool) -> f64 {
  let next = if success { current + COEFFICIENT_STEP_UP } else { current - COEFFICIENT_STEP_DOWN };
  ((next * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

fn is_learned(w: &UserWordProgress) -> bool {
  w.completed_by_kind.all(|done| *done)
    && w.mistakes <= MAX_MISTAKES_TO_COMPLETE
    && w.mastery_coefficient >= 1.0
}

/// Word-level transition for one outcome.
pub fn step_word(w: &mut UserWordProgress, kind: ExerciseKind, success: bool, today: NaiveDate) {
  if success {
    w.repeats_total += 1;
    if let Some(repeats) = w.repeats_by_kind.get_mut(kind) {
      *repeats += 1;
    }
    w.passed_kinds.insert(kind);
    let repeats = w.repeats_by_kind.get(kind).copied().unwrap_or(0);
    if repeats >= REPEATS_TO_COMPLETE && w.mistakes <= MAX_MISTAKES_TO_COMPLETE {
      if let Some(done) = w.completed_by_kind.get_mut(kind) {
        *done = true;
      }
    }
  } else {
    w.mistakes += 1;
    if w.mistakes >= 2 {
      if let Some(done) = w.completed_by_kind.get_mut(kind) {
        *done = false;
      }
    }
  }

  w.mastery_coefficient = step_coefficient(w.mastery_coefficient, success);

  w.status = if success {
    if is_learned(w) { WordStatus::Learned } else { WordStatus::Learning }
  } else if w.mistakes >= 3 {
    WordStatus::Mistaken
  } else {
    WordStatus::Learning
  };
  w.last_seen_date = Some(today);
}

/// XP for a successful exercise: (level XP, tree XP), both truncated.
pub fn xp_reward(kind: ExerciseKind) -> (u32, u32) {
  let weight = kind.xp_weight();
  ((weight * LEVEL_XP_MULTIPLIER) as u32, weight as u32)
}

/// Level-up when XP reaches the cap. Overflow carries into the new level.
fn settle_level(game: &mut UserGameState) -> bool {
  if game.xp < game.xp_cap_for_level {
    return false;
  }
  game.xp -= game.xp_cap_for_level;
  game.level += 1;
  game.xp_cap_for_level += XP_CAP_STEP;
  true
}

/// Apply one submission to the user's word record and game state.
#[instrument(level = "debug", skip(record), fields(user_id = record.id, word_id = sub.word_id, kind = sub.exercise_kind.as_str(), success = sub.success))]
pub fn apply_submission(record: &mut UserRecord, sub: &Submission, now: NaiveDateTime) -> SubmissionOutcome {
  let today = now.date();
  let word = record
    .words
    .entry(sub.word_id)
    .or_insert_with(|| UserWordProgress::new(sub.word_id));
  let previous_status = word.status;
  step_word(word, sub.exercise_kind, sub.success, today);
  let status = word.status;

  let daily_goal = clock::daily_goal_for(&record.profile.study_time);
  let game = &mut record.game;
  let mut outcome = SubmissionOutcome {
    previous_status,
    status,
    newly_learned: false,
    level_xp_gained: 0,
    tree_xp_gained: 0,
    leveled_up: false,
    daily_goal_rewarded: false,
    life_spent: None,
  };

  if sub.success {
    let (level_xp, tree_xp) = xp_reward(sub.exercise_kind);
    game.xp += level_xp;
    game.tree_xp += tree_xp;
    outcome.level_xp_gained = level_xp;
    outcome.tree_xp_gained = tree_xp;

    if status == WordStatus::Learned && previous_status != WordStatus::Learned {
      game.today_learned_word_count += 1;
      game.coins += 1;
      outcome.newly_learned = true;
    }
    outcome.daily_goal_rewarded = clock::apply_daily_goal_xp(game, daily_goal, today);
    clock::refresh_tree_by_xp(game);
    outcome.leveled_up = settle_level(game);
  } else {
    game.tree_xp = game.tree_xp.saturating_sub(1);
    outcome.life_spent = Some(clock::consume_life(game, now));
  }

  record.game.learning_words = record.count_status(WordStatus::Learning);
  record.game.learned_words = record.count_status(WordStatus::Learned);

  debug!(target: "progress", ?previous_status, ?status, newly_learned = outcome.newly_learned, leveled_up = outcome.leveled_up, "Submission applied");
  outcome
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{UserProfile, MAX_LIVES};
  use rand::{rngs::StdRng, Rng, SeedableRng};
  use std::collections::BTreeMap;

  fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(12, 0, 0).unwrap()
  }

  fn record() -> UserRecord {
    UserRecord {
      id: 1,
      password_hash: String::new(),
      profile: UserProfile { study_time: "one".into(), ..UserProfile::default() },
      game: UserGameState::starting(now()),
      words: BTreeMap::new(),
    }
  }

  fn submit(rec: &mut UserRecord, word_id: WordId, kind: ExerciseKind, success: bool) -> SubmissionOutcome {
    apply_submission(rec, &Submission { word_id, exercise_kind: kind, success }, now())
  }

  const KINDS: [ExerciseKind; 4] = ExerciseKind::CYCLE;

  #[test]
  fn coefficient_stays_in_unit_range_and_learned_implies_its_conditions() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut rec = record();
    rec.game.bonus_lives = 1000;
    for _ in 0..2_000 {
      let word_id = rng.gen_range(1..4);
      let kind = KINDS[rng.gen_range(0..KINDS.len())];
      let success = rng.gen_bool(0.8);
      submit(&mut rec, word_id, kind, success);
      for w in rec.words.values() {
        assert!((0.0..=1.0).contains(&w.mastery_coefficient));
        if w.status == WordStatus::Learned {
          assert!(w.completed_by_kind.all(|c| *c));
          assert!(w.mistakes <= 1);
          assert!(w.mastery_coefficient >= 1.0);
        }
      }
      assert!(rec.game.lives <= MAX_LIVES);
    }
  }

  #[test]
  fn nine_clean_successes_learn_the_word_once() {
    let mut rec = record();
    let order = [ExerciseKind::Standard, ExerciseKind::WordTranslation, ExerciseKind::SentenceShuffle];
    let mut outcomes = vec![];
    for kind in order {
      for _ in 0..3 {
        outcomes.push(submit(&mut rec, 5, kind, true));
      }
    }
    assert!(outcomes[..8].iter().all(|o| o.status == WordStatus::Learning));
    let last = outcomes[8];
    assert_eq!(last.status, WordStatus::Learned);
    assert!(last.newly_learned);

    let w = &rec.words[&5];
    assert_eq!(w.repeats_total, 9);
    assert_eq!(w.mastery_coefficient, 1.0);
    assert_eq!(w.passed_kinds.len(), 3);
    assert_eq!(rec.game.coins, 1);
    assert_eq!(rec.game.today_learned_word_count, 1);
    assert_eq!(rec.game.learned_words, 1);
    assert_eq!(rec.game.learning_words, 0);
    // level XP 3*1 + 3*1 + 3*2, tree XP 3*1 + 3*1 + 3*2
    assert_eq!(rec.game.xp, 12);
    assert_eq!(rec.game.tree_xp, 12);

    let again = submit(&mut rec, 5, ExerciseKind::Standard, true);
    assert_eq!(again.status, WordStatus::Learned);
    assert!(!again.newly_learned);
    assert_eq!(rec.game.coins, 1);
  }

  #[test]
  fn second_mistake_clears_completion_of_the_attempted_kind() {
    let mut rec = record();
    let mut w = UserWordProgress::new(9);
    w.mistakes = 1;
    w.repeats_by_kind.standard = 4;
    w.completed_by_kind.standard = true;
    w.completed_by_kind.word_translation = true;
    w.mastery_coefficient = 0.6;
    rec.words.insert(9, w);

    let out = submit(&mut rec, 9, ExerciseKind::Standard, false);
    let w = &rec.words[&9];
    assert_eq!(w.mistakes, 2);
    assert!(!w.completed_by_kind.standard);
    assert!(w.completed_by_kind.word_translation);
    assert_eq!(out.status, WordStatus::Learning);
    assert!((w.mastery_coefficient - 0.5).abs() < 1e-9);
  }

  #[test]
  fn third_mistake_marks_word_mistaken_and_costs_lives() {
    let mut rec = record();
    rec.game.tree_xp = 1;
    rec.game.lives = 1;
    rec.game.bonus_lives = 1;
    let a = submit(&mut rec, 2, ExerciseKind::WordTranslation, false);
    let b = submit(&mut rec, 2, ExerciseKind::WordTranslation, false);
    let c = submit(&mut rec, 2, ExerciseKind::WordTranslation, false);
    assert_eq!(a.life_spent, Some(LifeSpent::Ordinary));
    assert_eq!(b.life_spent, Some(LifeSpent::Bonus));
    assert_eq!(c.life_spent, Some(LifeSpent::Nothing));
    assert_eq!(c.status, WordStatus::Mistaken);
    assert_eq!(rec.game.tree_xp, 0);
    assert_eq!(rec.game.total_lives(), 0);
    assert_eq!(rec.game.life_regen_anchor, Some(now()));
    assert_eq!(rec.words[&2].mastery_coefficient, 0.0);
    assert_eq!(rec.game.learning_words, 0);
  }

  #[test]
  fn failure_grants_no_experience() {
    let mut rec = record();
    let out = submit(&mut rec, 3, ExerciseKind::SentenceShuffle, false);
    assert_eq!((out.level_xp_gained, out.tree_xp_gained), (0, 0));
    assert_eq!(rec.game.xp, 0);
    assert_eq!(rec.words[&3].repeats_total, 0);
    assert_eq!(rec.words[&3].last_seen_date, Some(now().date()));
  }

  #[test]
  fn failure_costs_tree_xp_but_leaves_the_phase() {
    let mut rec = record();
    rec.game.tree_xp = 50;
    rec.game.tree_phase = 3;
    rec.game.tree_phase_progress_percent = 40.0;
    submit(&mut rec, 3, ExerciseKind::Standard, false);
    assert_eq!(rec.game.tree_xp, 49);
    assert_eq!(rec.game.tree_phase, 3);
    assert_eq!(rec.game.tree_phase_progress_percent, 40.0);
  }

  #[test]
  fn level_up_carries_overflow() {
    let mut rec = record();
    rec.game.xp = 19;
    rec.game.xp_cap_for_level = 20;
    let out = submit(&mut rec, 1, ExerciseKind::SentenceShuffle, true);
    assert_eq!(out.level_xp_gained, 2);
    assert!(out.leveled_up);
    assert_eq!(rec.game.level, 2);
    assert_eq!(rec.game.xp, 1);
    assert_eq!(rec.game.xp_cap_for_level, 40);
  }

  #[test]
  fn xp_weights_per_kind() {
    assert_eq!(xp_reward(ExerciseKind::Standard), (1, 1));
    assert_eq!(xp_reward(ExerciseKind::WordTranslation), (1, 1));
    assert_eq!(xp_reward(ExerciseKind::SentenceShuffle), (2, 2));
    assert_eq!(xp_reward(ExerciseKind::AsrReading), (0, 0));
  }

  #[test]
  fn asr_success_counts_a_repeat_without_kind_slot() {
    let mut rec = record();
    submit(&mut rec, 4, ExerciseKind::AsrReading, true);
    let w = &rec.words[&4];
    assert_eq!(w.repeats_total, 1);
    assert_eq!(w.repeats_by_kind, Default::default());
    assert!(w.passed_kinds.contains(&ExerciseKind::AsrReading));
    assert_eq!(w.status, WordStatus::Learning);
  }

  #[test]
  fn reaching_daily_goal_rewards_once() {
    let mut rec = record(); // study time "one" -> goal 3
    rec.game.today_learned_word_count = 2;
    let mut w = UserWordProgress::new(8);
    w.completed_by_kind.standard = true;
    w.completed_by_kind.word_translation = true;
    w.repeats_by_kind.sentence_shuffle = 2;
    w.mastery_coefficient = 0.8;
    rec.words.insert(8, w);

    let out = submit(&mut rec, 8, ExerciseKind::SentenceShuffle, true);
    assert!(out.newly_learned);
    assert!(out.daily_goal_rewarded);
    assert_eq!(rec.game.today_learned_word_count, 3);
    // 2 from the exercise + 3 from the goal
    assert_eq!(rec.game.tree_xp, 5);
    assert_eq!(rec.game.bonus_lives, 0);

    let out = submit(&mut rec, 8, ExerciseKind::SentenceShuffle, true);
    assert!(!out.daily_goal_rewarded);
  }

  #[test]
  fn submission_json_accepts_both_field_spellings() {
    let a: Submission = serde_json::from_str(r#"{"wordId":3,"exerciseKind":"sentence_shuffle","success":true}"#).unwrap();
    let b: Submission = serde_json::from_str(r#"{"word_id":3,"task_type":"sentence_shuffle","success":true}"#).unwrap();
    assert_eq!(a, b);
    assert!(serde_json::from_str::<Submission>(r#"{"wordId":3,"exerciseKind":"dance","success":true}"#).is_err());
  }
}
