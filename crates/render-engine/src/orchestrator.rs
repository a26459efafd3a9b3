//! Render job orchestration: the job registry, state transitions, and
//! derived progress metrics.
//!
//! One [`RenderService`] instance per process owns every job. Submissions
//! run concurrently and share only the registry; each job has a single
//! logical writer, and progress updates are applied in arrival order with
//! stale updates discarded so ETA math stays monotonic.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use cinecut_common::config::AppConfig;
use cinecut_compiler::compile;
use cinecut_timeline::Timeline;

use crate::engine::{EngineProgressFn, InvokeRequest, RenderEngine};
use crate::job::{JobStatus, RenderJob, RenderProgress};
use crate::preset::{resolve, RenderOptions, RenderPreset};

/// Callback fired after every applied progress update for a job.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync>;

/// How long a terminal job keeps its progress-callback registration so an
/// in-flight event can still be delivered.
const CALLBACK_RELEASE_GRACE: Duration = Duration::from_secs(5);

/// Registry cap. Past it, terminal jobs are evicted oldest-completed-first;
/// active jobs are never evicted.
const MAX_RETAINED_JOBS: usize = 256;

/// The render job orchestrator.
///
/// Cheap to clone; clones share the same registry and engine.
pub struct RenderService<E: RenderEngine> {
    engine: Arc<E>,
    jobs: Arc<Mutex<HashMap<String, RenderJob>>>,
    callbacks: Arc<Mutex<HashMap<String, ProgressCallback>>>,
    renders_dir: PathBuf,
}

impl<E: RenderEngine> Clone for RenderService<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            jobs: Arc::clone(&self.jobs),
            callbacks: Arc::clone(&self.callbacks),
            renders_dir: self.renders_dir.clone(),
        }
    }
}

impl<E: RenderEngine + 'static> RenderService<E> {
    pub fn new(engine: E, config: &AppConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            renders_dir: config.renders_dir.clone(),
        }
    }

    /// Submit a render. Always returns a job that has reached, or will
    /// reach, a terminal state; no error escapes this boundary.
    pub async fn submit_render(
        &self,
        timeline: &Timeline,
        options: RenderOptions,
        on_progress: Option<ProgressCallback>,
    ) -> RenderJob {
        let resolved = resolve(&options);
        let rate = resolved.profile.frame_rate();
        let total_frames = timeline.duration().to_frames(rate).max(0) as u64;

        let id = Uuid::new_v4().to_string();
        let job = RenderJob::new(id.clone(), options.clone(), total_frames);
        let registered = job.clone();

        {
            let mut jobs = self.jobs.lock().unwrap();
            evict_terminal_overflow(&mut jobs);
            jobs.insert(id.clone(), job);
        }
        if let Some(cb) = on_progress {
            self.callbacks.lock().unwrap().insert(id.clone(), cb);
        }

        {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(&id) {
                job.transition(JobStatus::Running);
            }
        }

        tracing::info!(
            job_id = %id,
            total_frames,
            preset = options.preset.as_str(),
            output = %options.output_path.display(),
            "Render job submitted"
        );

        let availability = self.engine.check_availability().await;
        if !availability.available {
            let message = availability
                .error
                .unwrap_or_else(|| "render engine unavailable".to_string());
            self.settle(&id, JobStatus::Failed, Some(message), None);
            return self.snapshot(&id, registered);
        }

        let program = match compile(timeline, &resolved.profile) {
            Ok(program) => program,
            Err(e) => {
                self.settle(&id, JobStatus::Failed, Some(e.to_string()), None);
                return self.snapshot(&id, registered);
            }
        };

        let request = InvokeRequest {
            job_id: id.clone(),
            program,
            output_path: options.output_path.clone(),
            encode: resolved.encode.clone(),
            total_frames,
            start_frame: options.start_frame,
            end_frame: options.end_frame,
        };

        let hook: EngineProgressFn = {
            let service = self.clone();
            let job_id = id.clone();
            Box::new(move |current, total| service.on_engine_progress(&job_id, current, total))
        };

        let outcome = self.engine.invoke(request, Some(hook)).await;

        if outcome.cancelled {
            self.settle(&id, JobStatus::Cancelled, outcome.error, None);
        } else if outcome.success {
            self.settle(&id, JobStatus::Completed, None, outcome.output_path);
        } else {
            let message = outcome
                .error
                .unwrap_or_else(|| "render engine invocation failed".to_string());
            self.settle(&id, JobStatus::Failed, Some(message), None);
        }

        self.snapshot(&id, registered)
    }

    /// Submit a preview-quality render.
    pub async fn submit_preview_render(
        &self,
        timeline: &Timeline,
        output_path: impl Into<PathBuf>,
    ) -> RenderJob {
        self.submit_render(
            timeline,
            RenderOptions::new(output_path, RenderPreset::Preview),
            None,
        )
        .await
    }

    /// Submit an export render at the given preset.
    pub async fn submit_export_render(
        &self,
        timeline: &Timeline,
        output_path: impl Into<PathBuf>,
        preset: RenderPreset,
    ) -> RenderJob {
        self.submit_render(timeline, RenderOptions::new(output_path, preset), None)
            .await
    }

    /// Apply an engine progress update.
    ///
    /// Unknown and terminal jobs are ignored; updates with a lower frame
    /// than the last recorded one are discarded. When the engine reports a
    /// positive total it replaces the computed one.
    pub fn on_engine_progress(&self, job_id: &str, current_frame: u64, total_from_engine: u64) {
        let snapshot = {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(job_id) else {
                return;
            };
            if job.status != JobStatus::Running {
                return;
            }

            if current_frame < job.progress.current_frame {
                tracing::debug!(
                    job_id,
                    current_frame,
                    last = job.progress.current_frame,
                    "Discarding stale progress update"
                );
                return;
            }

            let total = if total_from_engine > 0 {
                total_from_engine
            } else {
                job.progress.total_frames
            };
            job.progress.set_frames(current_frame, total);

            if current_frame > 0 {
                if let Some(started_at) = job.started_at {
                    let elapsed_ms = (Utc::now() - started_at).num_milliseconds().max(0) as f64;
                    if elapsed_ms > 0.0 {
                        let ms_per_frame = elapsed_ms / current_frame as f64;
                        let remaining = total.saturating_sub(current_frame) as f64;
                        job.progress.estimated_remaining_secs =
                            Some(remaining * ms_per_frame / 1000.0);
                        job.progress.fps = Some(current_frame as f64 / (elapsed_ms / 1000.0));
                    }
                }
            }

            job.progress.clone()
        };

        if let Some(cb) = self.callbacks.lock().unwrap().get(job_id) {
            cb(snapshot);
        }
    }

    /// Cancel a running job. Returns `false` for unknown, pending, or
    /// terminal jobs; never errors.
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        let running = {
            let jobs = self.jobs.lock().unwrap();
            jobs.get(job_id)
                .map(|job| job.status == JobStatus::Running)
                .unwrap_or(false)
        };
        if !running {
            return false;
        }

        let acked = self.engine.cancel(job_id).await;
        if acked {
            self.settle(
                job_id,
                JobStatus::Cancelled,
                Some("render cancelled".to_string()),
                None,
            );
        } else {
            tracing::warn!(job_id, "Cancellation not acknowledged by engine");
        }
        acked
    }

    pub fn get_job(&self, job_id: &str) -> Option<RenderJob> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    /// Jobs still pending or running.
    pub fn get_active_jobs(&self) -> Vec<RenderJob> {
        self.jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| !job.status.is_terminal())
            .cloned()
            .collect()
    }

    /// Build an output path from a base name, preset, and timestamp.
    /// Collision-resistant, but not guaranteed unique under concurrent
    /// identical calls.
    pub fn generate_output_path(&self, base_name: &str, preset: RenderPreset) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.renders_dir
            .join(format!("{base_name}_{}_{timestamp}.mp4", preset.as_str()))
    }

    /// Drive a job into a terminal state and release its callback after the
    /// grace delay. A job already terminal is left untouched.
    fn settle(
        &self,
        job_id: &str,
        status: JobStatus,
        error: Option<String>,
        output_path: Option<PathBuf>,
    ) {
        {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(job_id) else {
                return;
            };
            if !job.transition(status) {
                return;
            }

            job.progress.error = error.clone();
            if status == JobStatus::Completed {
                job.progress.current_frame = job.progress.total_frames;
                job.progress.percentage = 100;
                job.progress.estimated_remaining_secs = Some(0.0);
                job.progress.output_path = output_path;
            }
        }

        match status {
            JobStatus::Completed => tracing::info!(job_id, "Render job completed"),
            JobStatus::Cancelled => tracing::info!(job_id, "Render job cancelled"),
            _ => tracing::warn!(job_id, error = ?error, "Render job failed"),
        }

        self.schedule_callback_release(job_id);
    }

    fn schedule_callback_release(&self, job_id: &str) {
        let callbacks = Arc::clone(&self.callbacks);
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(CALLBACK_RELEASE_GRACE).await;
            callbacks.lock().unwrap().remove(&job_id);
        });
    }

    fn snapshot(&self, job_id: &str, fallback: RenderJob) -> RenderJob {
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or(fallback)
    }
}

/// Make room for one incoming job by evicting the oldest-completed terminal
/// jobs once the registry is at capacity.
fn evict_terminal_overflow(jobs: &mut HashMap<String, RenderJob>) {
    if jobs.len() < MAX_RETAINED_JOBS {
        return;
    }

    let mut terminal: Vec<(String, chrono::DateTime<Utc>)> = jobs
        .values()
        .filter(|job| job.status.is_terminal())
        .map(|job| (job.id.clone(), job.completed_at.unwrap_or_else(Utc::now)))
        .collect();
    terminal.sort_by_key(|(_, completed_at)| *completed_at);

    let excess = jobs.len() + 1 - MAX_RETAINED_JOBS;
    for (id, _) in terminal.into_iter().take(excess) {
        jobs.remove(&id);
    }

    if jobs.len() >= MAX_RETAINED_JOBS {
        tracing::warn!(
            retained = jobs.len(),
            "Job registry at capacity with active jobs only"
        );
    }
}
