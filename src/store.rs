//! In-memory user store with per-user transactions and an optional JSON
//! snapshot on disk.
//!
//! Every read-modify-write on a user goes through `transact`, which holds that
//! user's lock for the whole closure and commits a working copy only when the
//! closure succeeds. Different users never contend.

use std::{
  collections::{BTreeMap, HashMap},
  path::PathBuf,
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument};

use crate::config::StoreSettings;
use crate::domain::{UserGameState, UserId, UserProfile, UserRecord};
use crate::error::{AppError, AppResult};

/// A bearer session. Lives in memory only.
#[derive(Clone, Debug)]
pub struct Session {
  pub user_id: UserId,
  pub expires_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
  users: Vec<UserRecord>,
}

pub struct Store {
  users: RwLock<BTreeMap<UserId, Arc<Mutex<UserRecord>>>>,
  emails: RwLock<HashMap<String, UserId>>,
  sessions: RwLock<HashMap<String, Session>>,
  next_id: AtomicU64,
  snapshot_path: Option<PathBuf>,
  persist_lock: Mutex<()>,
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

impl Store {
  pub fn in_memory() -> Self {
    Self::from_records(Vec::new(), None)
  }

  fn from_records(records: Vec<UserRecord>, snapshot_path: Option<PathBuf>) -> Self {
    let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    let emails = records.iter().map(|r| (normalize_email(&r.profile.email), r.id)).collect();
    let users = records.into_iter().map(|r| (r.id, Arc::new(Mutex::new(r)))).collect();
    Self {
      users: RwLock::new(users),
      emails: RwLock::new(emails),
      sessions: RwLock::new(HashMap::new()),
      next_id: AtomicU64::new(next_id),
      snapshot_path,
      persist_lock: Mutex::new(()),
    }
  }

  /// Open the store, reading the snapshot file if configured and present.
  #[instrument(level = "info", skip_all)]
  pub fn open(cfg: &StoreSettings) -> AppResult<Self> {
    let Some(path) = cfg.snapshot_path.clone() else {
      info!(target: "store", "No snapshot path configured; users live in memory only");
      return Ok(Self::in_memory());
    };
    if !path.exists() {
      info!(target: "store", path = %path.display(), "Snapshot not found; starting empty");
      return Ok(Self::from_records(Vec::new(), Some(path)));
    }
    let raw = std::fs::read_to_string(&path)
      .map_err(|e| AppError::Persistence(format!("read {}: {e}", path.display())))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
      .map_err(|e| AppError::Persistence(format!("parse {}: {e}", path.display())))?;
    info!(target: "store", path = %path.display(), users = snapshot.users.len(), "Snapshot loaded");
    Ok(Self::from_records(snapshot.users, Some(path)))
  }

  /// Insert a new user. Emails are unique case-insensitively.
  #[instrument(level = "info", skip_all)]
  pub async fn create_user(&self, profile: UserProfile, password_hash: String, now: NaiveDateTime) -> AppResult<UserId> {
    let key = normalize_email(&profile.email);
    let id = {
      let mut emails = self.emails.write().await;
      if emails.contains_key(&key) {
        return Err(AppError::Validation("user with this email already exists".into()));
      }
      let id = self.next_id.fetch_add(1, Ordering::SeqCst);
      let record = UserRecord {
        id,
        password_hash,
        profile: UserProfile { email: key.clone(), ..profile },
        game: UserGameState::starting(now),
        words: BTreeMap::new(),
      };
      self.users.write().await.insert(id, Arc::new(Mutex::new(record)));
      emails.insert(key, id);
      id
    };
    info!(target: "store", user_id = id, "User created");
    self.persist().await?;
    Ok(id)
  }

  pub async fn find_by_email(&self, email: &str) -> Option<UserId> {
    self.emails.read().await.get(&normalize_email(email)).copied()
  }

  async fn cell(&self, user_id: UserId) -> AppResult<Arc<Mutex<UserRecord>>> {
    self
      .users
      .read()
      .await
      .get(&user_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
  }

  /// Consistent copy of one user.
  pub async fn load(&self, user_id: UserId) -> AppResult<UserRecord> {
    let cell = self.cell(user_id).await?;
    let guard = cell.lock().await;
    Ok(guard.clone())
  }

  /// Run `f` on a working copy of the user under that user's lock. The copy
  /// replaces the stored record only when `f` returns `Ok`.
  pub async fn transact<T, F>(&self, user_id: UserId, f: F) -> AppResult<T>
  where
    F: FnOnce(&mut UserRecord) -> AppResult<T>,
  {
    let cell = self.cell(user_id).await?;
    let (value, changed) = {
      let mut guard = cell.lock().await;
      let mut working = guard.clone();
      let value = f(&mut working)?;
      let changed = working != *guard;
      if changed {
        *guard = working;
      }
      (value, changed)
    };
    if changed {
      debug!(target: "store", user_id, "Transaction committed");
      self.persist().await?;
    }
    Ok(value)
  }

  /// Copies of all users, in id order.
  pub async fn all_users(&self) -> Vec<UserRecord> {
    let cells: Vec<_> = self.users.read().await.values().cloned().collect();
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
      out.push(cell.lock().await.clone());
    }
    out
  }

  /// Store a session and sweep the ones that expired by `now`.
  pub async fn insert_session(&self, token: String, session: Session, now: NaiveDateTime) {
    let mut sessions = self.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    let swept = before - sessions.len();
    if swept > 0 {
      debug!(target: "store", swept, "Expired sessions removed");
    }
    sessions.insert(token, session);
  }

  pub async fn session(&self, token: &str) -> Option<Session> {
    self.sessions.read().await.get(token).cloned()
  }

  pub async fn remove_session(&self, token: &str) {
    self.sessions.write().await.remove(token);
  }

  /// Rewrite the snapshot file (temp file + rename). No-op without a path.
  async fn persist(&self) -> AppResult<()> {
    let Some(path) = &self.snapshot_path else {
      return Ok(());
    };
    let _guard = self.persist_lock.lock().await;
    let snapshot = Snapshot { users: self.all_users().await };
    let raw = serde_json::to_vec_pretty(&snapshot).map_err(|e| AppError::Persistence(e.to_string()))?;
    let tmp = path.with_extension("tmp");
    let result = async {
      tokio::fs::write(&tmp, raw).await?;
      tokio::fs::rename(&tmp, path).await
    }
    .await;
    result.map_err(|e| {
      error!(target: "store", path = %path.display(), error = %e, "Snapshot write failed");
      AppError::Persistence(format!("write {}: {e}", path.display()))
    })
  }
}
