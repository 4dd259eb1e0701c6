//! Typing Service
//!
//! Creates typing jobs and runs each one on its own task, posting lines in
//! order with a fixed delay between them.

use std::sync::Arc;
use std::time::Duration;

use crate::config::TypingSettings;
use crate::domain::{JobStatus, TypingJob};
use crate::infrastructure::metrics;
use crate::infrastructure::platform::MessageSender;
use crate::infrastructure::registry::{self, ConnectionRegistry, JobEntry};
use crate::shared::snowflake::JobIdGenerator;

/// Error text recorded on a job whose send was rejected
pub const SEND_FAILED_MESSAGE: &str = "Failed to send. Check token/channel.";

/// Typing service trait
pub trait TypingService: Send + Sync {
    /// Register a job and start posting its lines in the background
    fn start_job(&self, request: CreateJobDto) -> Result<TypingJob, TypingError>;

    /// Current record of a job
    fn get_job(&self, job_id: &str) -> Result<TypingJob, TypingError>;

    /// Request cancellation; the runner stops before its next line
    fn stop_job(&self, job_id: &str) -> Result<TypingJob, TypingError>;
}

/// Create job request
#[derive(Clone)]
pub struct CreateJobDto {
    pub token: String,
    pub channel_id: String,
    pub lines: Vec<String>,
    /// Delay between lines in seconds
    pub delay: u64,
}

impl std::fmt::Debug for CreateJobDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateJobDto")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("lines", &self.lines.len())
            .field("delay", &self.delay)
            .finish()
    }
}

/// Typing service errors
#[derive(Debug, thiserror::Error)]
pub enum TypingError {
    #[error("Job not found")]
    NotFound,

    #[error("File is empty")]
    NoLines,

    #[error("Too many lines (max {0})")]
    TooManyLines(usize),

    #[error("Delay must be at most {0} seconds")]
    DelayTooLong(u64),
}

/// TypingService implementation
pub struct TypingServiceImpl {
    registry: Arc<ConnectionRegistry>,
    sender: Arc<dyn MessageSender>,
    ids: JobIdGenerator,
    settings: TypingSettings,
}

impl TypingServiceImpl {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sender: Arc<dyn MessageSender>,
        settings: TypingSettings,
    ) -> Self {
        Self {
            registry,
            sender,
            ids: JobIdGenerator::default(),
            settings,
        }
    }
}

impl TypingService for TypingServiceImpl {
    fn start_job(&self, request: CreateJobDto) -> Result<TypingJob, TypingError> {
        if request.lines.is_empty() {
            return Err(TypingError::NoLines);
        }
        if request.lines.len() > self.settings.max_lines {
            return Err(TypingError::TooManyLines(self.settings.max_lines));
        }
        if request.delay > self.settings.max_delay_secs {
            return Err(TypingError::DelayTooLong(self.settings.max_delay_secs));
        }

        let job = TypingJob::new(self.ids.next_job_id(), request.lines.len(), request.delay);
        let entry = self.registry.insert_job(job);
        let snapshot = entry.snapshot();

        tracing::info!(
            job_id = %snapshot.job_id,
            channel_id = %request.channel_id,
            total = snapshot.total,
            delay = snapshot.delay,
            "Typing job created"
        );

        tokio::spawn(run_job(entry, self.sender.clone(), request));

        Ok(snapshot)
    }

    fn get_job(&self, job_id: &str) -> Result<TypingJob, TypingError> {
        self.registry
            .job(job_id)
            .map(|entry| entry.snapshot())
            .ok_or(TypingError::NotFound)
    }

    fn stop_job(&self, job_id: &str) -> Result<TypingJob, TypingError> {
        let entry = self.registry.job(job_id).ok_or(TypingError::NotFound)?;
        let was_terminal = entry.status().is_terminal();
        let status = entry.stop();
        if !was_terminal && status == JobStatus::Stopped {
            metrics::record_job_finished(status.as_str());
            tracing::info!(job_id = %job_id, "Typing job stop requested");
        }
        Ok(entry.snapshot())
    }
}

/// Post every line of `request` in order, honouring the delay and stopping
/// at the first failed send or as soon as the job leaves `running`.
///
/// Status is checked before every line; the inter-line sleep also wakes on
/// the job's cancellation signal. An in-flight send is never interrupted.
pub async fn run_job(job: Arc<JobEntry>, sender: Arc<dyn MessageSender>, request: CreateJobDto) {
    let job_id = job.snapshot().job_id;

    if !job.update(TypingJob::begin) {
        tracing::debug!(job_id = %job_id, "Job stopped before it started");
        return;
    }

    let mut cancelled = job.cancelled();
    let delay = Duration::from_secs(request.delay);
    let last_index = request.lines.len().saturating_sub(1);

    for (index, line) in request.lines.iter().enumerate() {
        let proceed = job.update(|record| {
            if !record.is_running() {
                return false;
            }
            record.record_progress(index, line);
            true
        });
        if !proceed {
            tracing::info!(job_id = %job_id, sent = index, "Typing job stopped");
            return;
        }

        if !sender
            .send_message(&request.token, &request.channel_id, line)
            .await
        {
            if job.update(|record| record.fail(SEND_FAILED_MESSAGE)) {
                metrics::record_job_finished(JobStatus::Error.as_str());
                tracing::warn!(job_id = %job_id, line = index + 1, "Typing job failed");
            }
            return;
        }
        tracing::debug!(job_id = %job_id, line = index + 1, "Line sent");

        if index < last_index && !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = registry::raised(&mut cancelled) => {}
            }
        }
    }

    if job.update(TypingJob::complete) {
        metrics::record_job_finished(JobStatus::Completed.as_str());
        tracing::info!(job_id = %job_id, "Typing job completed");
    }
}
