//! Connection Registry
//!
//! In-memory store of typing jobs and voice sessions, keyed by identifier.
//! Every record sits behind its own lock; the owning task and the HTTP
//! handlers only touch it through [`JobEntry`] / [`SessionEntry`].
//!
//! Terminal records stay pollable for the configured retention and are then
//! removed by [`ConnectionRegistry::spawn_sweeper`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{session_id, JobStatus, SessionStatus, TypingJob, VoiceSession};

/// Resolve once `signal` holds `true`, including when it was already set
/// before this receiver was created or last polled.
pub async fn raised(signal: &mut watch::Receiver<bool>) {
    while !*signal.borrow_and_update() {
        if signal.changed().await.is_err() {
            // Sender gone without raising: nothing will ever ask us to stop.
            std::future::pending::<()>().await;
        }
    }
}

/// A typing job record plus its cancellation signal.
#[derive(Debug)]
pub struct JobEntry {
    record: RwLock<TypingJob>,
    cancel: watch::Sender<bool>,
}

impl JobEntry {
    fn new(job: TypingJob) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            record: RwLock::new(job),
            cancel,
        }
    }

    pub fn snapshot(&self) -> TypingJob {
        self.record.read().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.record.read().status
    }

    /// Apply a mutation under the record lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut TypingJob) -> R) -> R {
        f(&mut self.record.write())
    }

    /// Mark the job stopped and wake its runner. Returns the resulting status.
    pub fn stop(&self) -> JobStatus {
        let status = self.update(|job| {
            job.stop();
            job.status
        });
        self.cancel.send_replace(true);
        status
    }

    /// Receiver that flips to `true` once the job is stopped.
    pub fn cancelled(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    fn expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        self.record
            .read()
            .finished_at
            .is_some_and(|finished| now - finished > retention)
    }
}

/// A voice session record plus the supervision handle of the task that owns
/// its gateway connection.
#[derive(Debug)]
pub struct SessionEntry {
    record: RwLock<VoiceSession>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionEntry {
    fn new(session: VoiceSession) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            record: RwLock::new(session),
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> String {
        self.record.read().connection_id.clone()
    }

    pub fn snapshot(&self) -> VoiceSession {
        self.record.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.record.read().status
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut VoiceSession) -> R) -> R {
        f(&mut self.record.write())
    }

    /// Bind the task that owns this session's connection.
    pub fn attach(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Receiver that flips to `true` when shutdown is requested.
    pub fn shutdown_requested(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Ask the owning task to stop and wait up to `timeout` for it to release
    /// the connection. The task is aborted if it does not finish in time.
    ///
    /// Returns `true` if the task finished on its own.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.shutdown.send_replace(true);

        let handle = self.task.lock().take();
        let Some(mut handle) = handle else {
            return true;
        };

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(session_id = %self.id(), "Session task did not stop in time, aborting");
                handle.abort();
                false
            }
        }
    }

    fn abort_task(&self) {
        self.shutdown.send_replace(true);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    fn expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        self.record
            .read()
            .finished_at
            .is_some_and(|finished| now - finished > retention)
    }
}

/// Outcome of claiming the session slot for a guild voice channel.
#[derive(Debug)]
pub enum SessionClaim {
    /// A live (connecting or connected) session already holds the slot.
    Existing(Arc<SessionEntry>),
    /// A fresh record was inserted; a terminal predecessor, if any, is returned
    /// so its task can be shut down.
    Created {
        entry: Arc<SessionEntry>,
        replaced: Option<Arc<SessionEntry>>,
    },
}

/// Process-wide registry of jobs and sessions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    jobs: DashMap<String, Arc<JobEntry>>,
    sessions: DashMap<String, Arc<SessionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: TypingJob) -> Arc<JobEntry> {
        let id = job.job_id.clone();
        let entry = Arc::new(JobEntry::new(job));
        self.jobs.insert(id, entry.clone());
        entry
    }

    pub fn job(&self, job_id: &str) -> Option<Arc<JobEntry>> {
        self.jobs.get(job_id).map(|e| e.value().clone())
    }

    pub fn session(&self, connection_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.get(connection_id).map(|e| e.value().clone())
    }

    /// Atomically check for a live session on `(guild_id, channel_id)` and
    /// insert a new `connecting` record if there is none.
    pub fn claim_session(&self, guild_id: &str, channel_id: &str) -> SessionClaim {
        let id = session_id(guild_id, channel_id);
        match self.sessions.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().status().is_live() {
                    return SessionClaim::Existing(occupied.get().clone());
                }
                let entry = Arc::new(SessionEntry::new(VoiceSession::new(guild_id, channel_id)));
                let replaced = occupied.insert(entry.clone());
                SessionClaim::Created {
                    entry,
                    replaced: Some(replaced),
                }
            }
            Entry::Vacant(vacant) => {
                let entry = Arc::new(SessionEntry::new(VoiceSession::new(guild_id, channel_id)));
                vacant.insert(entry.clone());
                SessionClaim::Created {
                    entry,
                    replaced: None,
                }
            }
        }
    }

    /// Jobs that have not reached a terminal status
    pub fn active_job_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|e| !e.value().status().is_terminal())
            .count()
    }

    /// Sessions that are connecting or connected
    pub fn active_session_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().status().is_live())
            .count()
    }

    /// Remove terminal records finished more than `retention` before `now`.
    ///
    /// Returns `(jobs_removed, sessions_removed)`.
    pub fn sweep_expired(&self, now: DateTime<Utc>, retention: Duration) -> (usize, usize) {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return (0, 0);
        };

        let jobs_before = self.jobs.len();
        self.jobs.retain(|_, entry| !entry.expired(now, retention));

        let mut sessions_removed = 0;
        self.sessions.retain(|_, entry| {
            if entry.expired(now, retention) {
                entry.abort_task();
                sessions_removed += 1;
                false
            } else {
                true
            }
        });

        (jobs_before.saturating_sub(self.jobs.len()), sessions_removed)
    }

    /// Periodically sweep expired records for the lifetime of the registry.
    pub fn spawn_sweeper(self: &Arc<Self>, retention: Duration, every: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // Skip first immediate tick
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let (jobs, sessions) = registry.sweep_expired(Utc::now(), retention);
                if jobs + sessions > 0 {
                    tracing::debug!(jobs, sessions, "Expired records removed");
                }
            }
        })
    }
}
