use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::transcription::{JobStatus, TranscriptionService};
use super::PipelineError;

/// Fixed-interval, bounded status polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }

    /// Upper bound on the time spent waiting between checks.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed { attempts: u32 },
    Failed { attempts: u32, reason: String },
    /// Budget exhausted while the job was still running.
    TimedOut { attempts: u32, last_status: JobStatus },
}

/// Check `job_id` until it reaches a terminal status or the budget runs out.
///
/// Stops on the first terminal status. Sleeps `interval` between checks but not
/// after the last one. A failing status call aborts polling.
pub async fn wait_for_job(
    service: &dyn TranscriptionService,
    job_id: &str,
    policy: &PollPolicy,
) -> Result<PollOutcome, PipelineError> {
    let mut last_status = JobStatus::Submitted;

    for attempt in 1..=policy.max_attempts {
        last_status = service
            .get_job_status(job_id)
            .await
            .map_err(PipelineError::TranscriptionService)?;

        match last_status {
            JobStatus::Completed => {
                info!("Transcription job {} completed after {} checks", job_id, attempt);
                return Ok(PollOutcome::Completed { attempts: attempt });
            }
            JobStatus::Failed(ref reason) => {
                warn!("Transcription job {} failed after {} checks: {}", job_id, attempt, reason);
                return Ok(PollOutcome::Failed {
                    attempts: attempt,
                    reason: reason.clone(),
                });
            }
            _ => {}
        }

        if attempt < policy.max_attempts {
            info!(
                "Waiting for transcription {} ({}, check {}/{})",
                job_id, last_status, attempt, policy.max_attempts
            );
            sleep(policy.interval).await;
        }
    }

    warn!(
        "Transcription job {} still {} after {} checks",
        job_id, last_status, policy.max_attempts
    );
    Ok(PollOutcome::TimedOut {
        attempts: policy.max_attempts,
        last_status,
    })
}
