//! Task selector: picks and materializes the next batch of exercises.
//!
//! Two phases:
//! 1. `plan_candidates` (pure) filters templates by the user's tier window,
//!    buckets them by word status and orders them weakest-first.
//! 2. `materialize` walks the ordered candidates and emits one task per
//!    exercise kind in the fixed cycle until the batch is full, calling the
//!    distractor oracle for the kinds that need wrong answers.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{ExerciseKind, Task, TaskTemplate, TierWindow, UserWordProgress, WordId, WordStatus};
use crate::error::{AppError, AppResult};
use crate::oracle::DistractorSource;
use crate::util::{fill_mask, normalized_sentence, sentence_tokens, BLANK_PLACEHOLDER, MASK_TOKEN};

pub const MAX_TASKS: usize = 10;
/// Chance per batch that already learned words are mixed back in.
pub const REVIEW_PROBABILITY: f64 = 0.2;

enum Bucket {
  Learning,
  Fresh,
  Learned,
}

fn bucket_of(progress: Option<&UserWordProgress>) -> Bucket {
  match progress.map(|p| p.status) {
    Some(WordStatus::Learning) => Bucket::Learning,
    Some(WordStatus::Learned) => Bucket::Learned,
    // absent, new and mistaken words all count as fresh material
    _ => Bucket::Fresh,
  }
}

/// Templates eligible for this user, weakest words first.
/// Ties keep catalog order.
pub fn plan_candidates<'a>(
  templates: &'a [TaskTemplate],
  window: TierWindow,
  progress: &BTreeMap<WordId, UserWordProgress>,
  include_learned: bool,
) -> Vec<&'a TaskTemplate> {
  let mut picked: Vec<(usize, f64, &'a TaskTemplate)> = templates
    .iter()
    .enumerate()
    .filter(|(_, t)| window.contains(t.difficulty_tier))
    .filter_map(|(idx, t)| {
      let p = progress.get(&t.word_id);
      let keep = match bucket_of(p) {
        Bucket::Learning | Bucket::Fresh => true,
        Bucket::Learned => include_learned,
      };
      keep.then(|| (idx, p.map_or(0.0, |p| p.mastery_coefficient), t))
    })
    .collect();
  picked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
  picked.into_iter().map(|(_, _, t)| t).collect()
}

/// Merge distractors with the correct answer: trimmed, no blanks, no
/// duplicates. None when no distractor survives.
fn option_set(distractors: &[String], correct: &str) -> Option<Vec<String>> {
  let correct_lower = correct.to_lowercase();
  let mut options: Vec<String> = Vec::with_capacity(distractors.len() + 1);
  for d in distractors {
    let d = d.trim();
    if d.is_empty() || d.to_lowercase() == correct_lower {
      continue;
    }
    if !options.iter().any(|o| o == d) {
      options.push(d.to_string());
    }
  }
  if options.is_empty() {
    return None;
  }
  options.push(correct.to_string());
  Some(options)
}

fn base_task(t: &TaskTemplate, kind: ExerciseKind, correct: &str) -> Task {
  Task {
    id: Uuid::now_v7().to_string(),
    word_id: t.word_id,
    kind,
    options: Vec::new(),
    correct_answer: correct.to_string(),
    sentence: String::new(),
    masked_sentence: t.masked_sentence.clone(),
    translation: t.translation.clone(),
    difficulty_tier: t.difficulty_tier,
    text: String::new(),
  }
}

fn shuffle_task<R: Rng + ?Sized>(t: &TaskTemplate, correct: &str, rng: &mut R) -> Option<Task> {
  let full = fill_mask(&t.masked_sentence, correct);
  let mut tokens = sentence_tokens(&full);
  if tokens.len() <= 1 {
    return None;
  }
  tokens.shuffle(rng);
  let mut task = base_task(t, ExerciseKind::SentenceShuffle, &normalized_sentence(&full));
  task.options = tokens;
  task.sentence = t.translation.clone();
  Some(task)
}

/// Emit tasks for the ordered candidates. Oracle failures only skip the
/// kinds that need distractors.
#[instrument(level = "debug", skip_all, fields(candidates = candidates.len()))]
pub async fn materialize<S, R>(candidates: &[&TaskTemplate], oracle: &S, rng: &mut R) -> Vec<Task>
where
  S: DistractorSource,
  R: Rng + ?Sized,
{
  let mut batch: Vec<Task> = Vec::with_capacity(MAX_TASKS);

  'templates: for t in candidates {
    let correct = t.correct_answer.trim();
    if correct.is_empty() {
      debug!(target: "selector", word_id = t.word_id, "Template without a correct answer skipped");
      continue;
    }
    // one oracle call per template, shared by standard and word_translation
    let mut distractors: Option<Option<Vec<String>>> = None;

    for kind in ExerciseKind::CYCLE {
      if batch.len() >= MAX_TASKS {
        break 'templates;
      }
      let task = match kind {
        ExerciseKind::Standard | ExerciseKind::WordTranslation => {
          if distractors.is_none() {
            let raw = oracle.suggest(&t.masked_sentence, correct).await;
            distractors = Some(option_set(&raw, correct));
          }
          let Some(Some(options)) = distractors.as_ref() else {
            debug!(target: "selector", word_id = t.word_id, kind = kind.as_str(), "No distractors; kind skipped");
            continue;
          };
          let mut task = base_task(t, kind, correct);
          let mut options = options.clone();
          options.shuffle(rng);
          task.options = options;
          if kind == ExerciseKind::Standard {
            task.sentence = t.masked_sentence.replacen(MASK_TOKEN, BLANK_PLACEHOLDER, 1);
          }
          Some(task)
        }
        ExerciseKind::SentenceShuffle => shuffle_task(t, correct, rng),
        ExerciseKind::AsrReading => {
          let text = t.asr_text.trim();
          (!text.is_empty()).then(|| {
            let mut task = base_task(t, kind, correct);
            task.text = text.to_string();
            task
          })
        }
      };
      if let Some(task) = task {
        batch.push(task);
      }
    }
  }
  batch
}

/// Full selection for one user: plan, review draw, materialize.
#[instrument(level = "info", skip_all, fields(min = ?window.min, max = ?window.max))]
pub async fn select_tasks<S, R>(
  templates: &[TaskTemplate],
  window: TierWindow,
  progress: &BTreeMap<WordId, UserWordProgress>,
  oracle: &S,
  rng: &mut R,
) -> AppResult<Vec<Task>>
where
  S: DistractorSource,
  R: Rng + ?Sized,
{
  let include_learned = rng.gen_bool(REVIEW_PROBABILITY);
  let candidates = plan_candidates(templates, window, progress, include_learned);
  if candidates.is_empty() {
    info!(target: "selector", include_learned, "No eligible templates");
    return Err(AppError::NoEligibleTasks);
  }
  let batch = materialize(&candidates, oracle, rng).await;
  info!(target: "selector", candidates = candidates.len(), tasks = batch.len(), include_learned, "Batch selected");
  Ok(batch)
}
