//! Render job records and the job state machine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preset::RenderOptions;

/// Job lifecycle status. Transitions run
/// `pending → running → {completed, failed, cancelled}` and never leave a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Progress snapshot for one job, mutated only from engine callbacks and
/// terminal settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderProgress {
    pub status: JobStatus,

    pub current_frame: u64,

    /// Fixed at job creation from timeline duration at the resolved rate;
    /// widened only when the engine reports its own total.
    pub total_frames: u64,

    /// `round(current/total * 100)` clamped to [0, 100]; 0 when the total
    /// is zero.
    pub percentage: u8,

    pub estimated_remaining_secs: Option<f64>,
    pub fps: Option<f64>,

    pub error: Option<String>,
    pub output_path: Option<PathBuf>,
}

impl RenderProgress {
    pub(crate) fn new(total_frames: u64) -> Self {
        Self {
            status: JobStatus::Pending,
            current_frame: 0,
            total_frames,
            percentage: 0,
            estimated_remaining_secs: None,
            fps: None,
            error: None,
            output_path: None,
        }
    }

    pub(crate) fn set_frames(&mut self, current_frame: u64, total_frames: u64) {
        self.current_frame = current_frame;
        self.total_frames = total_frames;
        self.percentage = percentage(current_frame, total_frames);
    }
}

pub(crate) fn percentage(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current as f64 / total as f64) * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// One render submission. Created by the orchestrator, exclusively owned
/// and mutated by it, retained for the process lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct RenderJob {
    pub id: String,
    pub status: JobStatus,
    pub options: RenderOptions,
    pub progress: RenderProgress,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub(crate) fn new(id: String, options: RenderOptions, total_frames: u64) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            options,
            progress: RenderProgress::new(total_frames),
            started_at: None,
            completed_at: None,
        }
    }

    /// Apply a state transition if it is legal; a terminal state is never
    /// left. Returns whether the transition was applied.
    pub(crate) fn transition(&mut self, next: JobStatus) -> bool {
        let legal = matches!(
            (self.status, next),
            (JobStatus::Pending, JobStatus::Running)
                | (
                    JobStatus::Running,
                    JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
                )
        );
        if !legal {
            return false;
        }

        self.status = next;
        self.progress.status = next;
        if next == JobStatus::Running {
            self.started_at = Some(Utc::now());
        } else {
            self.completed_at = Some(Utc::now());
        }
        true
    }
}
