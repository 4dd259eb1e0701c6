//! Typing job record and its state machine.
//!
//! `starting -> running -> {completed | error | stopped}`; a job may also be
//! stopped before it starts running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a typing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Running,
    Completed,
    Error,
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress record of one typing job, as exposed to status polls.
///
/// `current` is the 1-based index of the line most recently handed to the
/// sender. It never decreases and never exceeds `total`.
#[derive(Debug, Clone, Serialize)]
pub struct TypingJob {
    pub job_id: String,
    pub status: JobStatus,
    pub total: usize,
    pub current: usize,
    pub last_message: String,
    /// Per-line delay in seconds
    pub delay: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TypingJob {
    pub fn new(job_id: impl Into<String>, total: usize, delay: u64) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Starting,
            total,
            current: 0,
            last_message: String::new(),
            delay,
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// `starting -> running`. Returns false if the job was stopped first.
    pub fn begin(&mut self) -> bool {
        if self.status != JobStatus::Starting {
            return false;
        }
        self.status = JobStatus::Running;
        self.current = 0;
        self.last_message.clear();
        self.touch();
        true
    }

    /// Record that line `index` (0-based) is about to be sent.
    pub fn record_progress(&mut self, index: usize, line: &str) {
        let position = (index + 1).min(self.total);
        if position >= self.current {
            self.current = position;
            self.last_message = line.to_string();
            self.touch();
        }
    }

    /// `running -> error`. A job stopped while its last send was in flight stays stopped.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.finish();
        true
    }

    /// `running -> completed`
    pub fn complete(&mut self) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Completed;
        self.finish();
        true
    }

    /// `starting | running -> stopped`. Terminal jobs are left untouched.
    pub fn stop(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Stopped;
        self.finish();
        true
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn finish(&mut self) {
        self.touch();
        self.finished_at = Some(self.updated_at);
    }
}
