//! HTTP clients for the two model services: the fill-mask distractor
//! generator and the speech recognizer.
//!
//! Both are single-attempt calls bounded by the client timeout. Errors come
//! back as `String` and the caller decides whether to degrade or fail.
//! Payload contents are not logged, only sizes and latencies.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::OracleSettings;
use crate::util::trunc_for_log;

const CLIENT_UA: &str = "vocab-trainer/0.1";

/// Anything that can propose wrong answers for a masked sentence.
/// An empty list means "no distractors"; implementations never fail.
pub trait DistractorSource {
  fn suggest(&self, masked: &str, correct: &str) -> impl Future<Output = Vec<String>> + Send;
}

#[derive(Clone)]
pub struct OracleClient {
  client: reqwest::Client,
  distractor_url: String,
  transcription_url: String,
}

#[derive(Serialize)]
struct DistractorRequest<'a> {
  text: &'a str,
  correct: &'a str,
}

#[derive(Deserialize)]
struct DistractorResponse {
  #[serde(default)]
  words: Vec<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
  #[serde(default)]
  text: String,
}

impl OracleClient {
  pub fn new(cfg: &OracleSettings) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()
      .map_err(|e| e.to_string())?;
    Ok(Self {
      client,
      distractor_url: cfg.distractor_url.clone(),
      transcription_url: cfg.transcription_url.clone(),
    })
  }

  /// Ask the fill-mask model for wrong answers. Entries are trimmed and
  /// blanks dropped; deduplication against the answer is the caller's job.
  #[instrument(level = "debug", skip(self, masked, correct), fields(url = %self.distractor_url))]
  pub async fn distractors(&self, masked: &str, correct: &str) -> Result<Vec<String>, String> {
    let start = Instant::now();
    let res = self
      .client
      .post(&self.distractor_url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .json(&DistractorRequest { text: masked, correct })
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("Distractor HTTP {}: {}", status, trunc_for_log(&body, 200)));
    }

    let body: DistractorResponse = res.json().await.map_err(|e| format!("JSON parse error: {e}"))?;
    let words: Vec<String> = body
      .words
      .into_iter()
      .map(|w| w.trim().to_string())
      .filter(|w| !w.is_empty())
      .collect();
    info!(target: "oracle", elapsed = ?start.elapsed(), count = words.len(), "Distractors received");
    Ok(words)
  }

  /// Upload an audio file for transcription and return the recognized text.
  #[instrument(level = "info", skip(self, bytes), fields(url = %self.transcription_url, bytes = bytes.len()))]
  pub async fn transcribe(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, String> {
    let start = Instant::now();
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);

    let res = self
      .client
      .post(&self.transcription_url)
      .header(USER_AGENT, CLIENT_UA)
      .multipart(form)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = format!("Transcription HTTP {}: {}", status, trunc_for_log(&body, 200));
      error!(target: "oracle", elapsed = ?start.elapsed(), %status, "Transcription failed");
      return Err(msg);
    }

    let body: TranscriptionResponse = res.json().await.map_err(|e| format!("JSON parse error: {e}"))?;
    info!(target: "oracle", elapsed = ?start.elapsed(), text_len = body.text.len(), "Transcription received");
    Ok(body.text)
  }
}

impl DistractorSource for OracleClient {
  async fn suggest(&self, masked: &str, correct: &str) -> Vec<String> {
    match self.distractors(masked, correct).await {
      Ok(words) => words,
      Err(e) => {
        warn!(target: "oracle", error = %e, "Distractor oracle unavailable; kind will be skipped");
        Vec::new()
      }
    }
  }
}
