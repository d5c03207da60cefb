//! Built-in seed catalog so the service is usable without data files.

use crate::domain::{TaskTemplate, Tier, WordRecord, WordId};

/// Minimal word list matching `seed_tasks`.
pub fn seed_words() -> Vec<WordRecord> {
  [
    (1, "кітап"),
    (2, "су"),
    (3, "мектеп"),
    (4, "дос"),
    (5, "жұмыс"),
    (6, "тәжірибе"),
  ]
  .into_iter()
  .map(|(word_id, surface)| WordRecord { word_id, surface_form: surface.to_string() })
  .collect()
}

fn template(
  word_id: WordId,
  masked: &str,
  correct: &str,
  translation: &str,
  target: &str,
  tier: Tier,
) -> TaskTemplate {
  let sentence = masked.replacen("<mask>", correct, 1);
  TaskTemplate {
    word_id,
    masked_sentence: masked.to_string(),
    asr_text: sentence.trim_end_matches(&['.', '!', '?'][..]).to_string(),
    sentence,
    correct_answer: correct.to_string(),
    translation: translation.to_string(),
    difficulty_tier: tier,
    translation_target: target.to_string(),
  }
}

/// One or two templates per seed word, spread over all three tiers.
pub fn seed_tasks() -> Vec<TaskTemplate> {
  vec![
    template(1, "Мен <mask> оқимын.", "кітап", "I read a book.", "книга", Tier::A),
    template(2, "Маған <mask> беріңізші.", "су", "Give me water, please.", "вода", Tier::A),
    template(2, "Бұл <mask> өте таза.", "су", "This water is very clean.", "вода", Tier::A),
    template(3, "Балалар <mask> барады.", "мектепке", "The children go to school.", "школа", Tier::A),
    template(4, "Менің <mask> қалада тұрады.", "досым", "My friend lives in the city.", "друг", Tier::B),
    template(5, "Ол ертең <mask> бастайды.", "жұмысты", "He starts the work tomorrow.", "работа", Tier::B),
    template(6, "Бұл <mask> бізге көп нәрсе үйретті.", "тәжірибе", "This experience taught us a lot.", "опыт", Tier::C),
  ]
}
