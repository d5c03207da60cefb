//! Word and task catalogs: loaded once at startup, read-only afterwards.

use std::{collections::HashMap, fs, path::Path};

use rand::{seq::SliceRandom, Rng};
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::config::CatalogSettings;
use crate::domain::{TaskTemplate, WordId, WordRecord};
use crate::seeds::{seed_tasks, seed_words};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
  #[error("failed to read {path}: {source}")]
  Read { path: String, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: serde_json::Error },
}

/// Immutable lookup of words plus the ordered template pool.
/// Template order is the catalog order used for stable tie-breaking.
#[derive(Debug, Default)]
pub struct Catalog {
  words: HashMap<WordId, String>,
  tasks: Vec<TaskTemplate>,
}

impl Catalog {
  pub fn new(words: Vec<WordRecord>, tasks: Vec<TaskTemplate>) -> Self {
    let words = words.into_iter().map(|w| (w.word_id, w.surface_form)).collect();
    Self { words, tasks }
  }

  /// Load both files. A missing file falls back to the built-in seeds;
  /// a file that exists but does not parse is an error.
  #[instrument(level = "info", skip_all, fields(words = %cfg.words_path.display(), tasks = %cfg.tasks_path.display()))]
  pub fn load(cfg: &CatalogSettings) -> Result<Self, CatalogError> {
    let words = load_json_or(&cfg.words_path, seed_words)?;
    let tasks = load_json_or(&cfg.tasks_path, seed_tasks)?;
    let catalog = Self::new(words, tasks);
    info!(target: "vocab_trainer", words = catalog.word_count(), tasks = catalog.tasks.len(), "Catalog loaded");
    Ok(catalog)
  }

  pub fn word(&self, id: WordId) -> Option<&str> {
    self.words.get(&id).map(String::as_str)
  }

  pub fn tasks(&self) -> &[TaskTemplate] {
    &self.tasks
  }

  /// Known either as a word entry or through at least one template.
  pub fn knows_word(&self, id: WordId) -> bool {
    self.words.contains_key(&id) || self.tasks.iter().any(|t| t.word_id == id)
  }

  /// Display translation of a word: the first template's target, falling
  /// back to its sentence translation.
  pub fn translation_of(&self, id: WordId) -> Option<&str> {
    self.tasks.iter().find(|t| t.word_id == id).map(template_translation)
  }

  pub fn word_count(&self) -> usize {
    self.words.len()
  }

  pub fn random_task<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&TaskTemplate> {
    self.tasks.choose(rng)
  }
}

pub fn template_translation(t: &TaskTemplate) -> &str {
  if t.translation_target.trim().is_empty() {
    &t.translation
  } else {
    &t.translation_target
  }
}

fn load_json_or<T: DeserializeOwned>(path: &Path, fallback: fn() -> Vec<T>) -> Result<Vec<T>, CatalogError> {
  let shown = path.display().to_string();
  if !path.exists() {
    warn!(target: "vocab_trainer", path = %shown, "Catalog file missing; using built-in seeds");
    return Ok(fallback());
  }
  let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read { path: shown.clone(), source })?;
  serde_json::from_str(&raw).map_err(|source| CatalogError::Parse { path: shown, source })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn missing_files_fall_back_to_seeds() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = CatalogSettings {
      words_path: dir.path().join("nope-words.json"),
      tasks_path: dir.path().join("nope-tasks.json"),
    };
    let catalog = Catalog::load(&cfg).unwrap();
    assert_eq!(catalog.word_count(), seed_words().len());
    assert_eq!(catalog.tasks().len(), seed_tasks().len());
    assert_eq!(catalog.word(1), Some("кітап"));
    assert_eq!(catalog.translation_of(1), Some("книга"));
    assert!(catalog.knows_word(6));
    assert!(!catalog.knows_word(600));
  }

  #[test]
  fn files_are_read_in_order_and_bad_json_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let words_path = dir.path().join("words.json");
    let tasks_path = dir.path().join("tasks.json");
    fs::write(&words_path, r#"[{"id": 10, "word": "алма"}]"#).unwrap();
    let mut f = fs::File::create(&tasks_path).unwrap();
    write!(
      f,
      r#"[{{"word_id":10,"masked_sentence":"Мен <mask> жедім.","correct_answer":"алма","difficulty":"A"}},
          {{"word_id":10,"masked_sentence":"<mask> қызыл.","correct_answer":"Алма","difficulty":"C"}}]"#
    )
    .unwrap();

    let catalog = Catalog::load(&CatalogSettings { words_path: words_path.clone(), tasks_path: tasks_path.clone() }).unwrap();
    assert_eq!(catalog.word(10), Some("алма"));
    assert_eq!(catalog.tasks()[1].correct_answer, "Алма");
    // no translation_target in the file and no sentence translation either
    assert_eq!(catalog.translation_of(10), Some(""));

    fs::write(&tasks_path, "{ not json").unwrap();
    let err = Catalog::load(&CatalogSettings { words_path, tasks_path }).unwrap_err();
    assert!(matches!(err, CatalogError::Parse { .. }));
  }
}
