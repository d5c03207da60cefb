//! Small text helpers used across modules.

pub const MASK_TOKEN: &str = "<mask>";
pub const BLANK_PLACEHOLDER: &str = "___";

const SENTENCE_SPLIT: [char; 4] = ['.', ',', '?', '!'];
const TOKEN_TRIM: [char; 6] = ['.', ',', '!', '?', ':', ';'];

/// Replace the first mask token.
pub fn fill_mask(masked: &str, with: &str) -> String {
  masked.replacen(MASK_TOKEN, with, 1)
}

/// Split on whitespace and sentence punctuation, lowercase, trim punctuation,
/// drop empties. Order preserved.
pub fn sentence_tokens(sentence: &str) -> Vec<String> {
  sentence
    .split(|c: char| c.is_whitespace() || SENTENCE_SPLIT.contains(&c))
    .map(|t| t.trim_matches(&TOKEN_TRIM[..]).to_lowercase())
    .filter(|t| !t.is_empty())
    .collect()
}

/// Lowercased sentence with surrounding whitespace trimmed. Punctuation stays.
pub fn normalized_sentence(sentence: &str) -> String {
  sentence.trim().to_lowercase()
}

/// Case-insensitive containment of the expected phrase in the transcription.
/// An empty expected phrase never matches.
pub fn transcript_matches(expected: &str, transcribed: &str) -> bool {
  let expected = expected.trim().to_lowercase();
  if expected.is_empty() {
    return false;
  }
  transcribed.trim().to_lowercase().contains(&expected)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
