//! Render engine gateway: the boundary to the external `melt` process.
//!
//! The orchestrator talks to this boundary through [`RenderEngine`], an
//! async trait with four operations: availability, invocation, cooperative
//! cancellation, and program validation. [`MeltEngine`] is the production
//! implementation; tests drive the orchestrator with stubs.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

use cinecut_common::config::AppConfig;

use crate::preset::EncodeSettings;

/// Result of an engine availability check.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub available: bool,
    pub version: Option<String>,
    pub path: Option<String>,
    pub error: Option<String>,
}

/// Result of structural program validation.
#[derive(Debug, Clone)]
pub struct ProgramValidation {
    pub valid: bool,
    pub error: Option<String>,
}

/// Outcome of one engine invocation.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub success: bool,

    /// The invocation stopped because cancellation was requested.
    pub cancelled: bool,

    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl InvokeOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            cancelled: false,
            output_path: None,
            error: Some(message.into()),
        }
    }
}

/// Everything the engine needs for one invocation.
#[derive(Debug)]
pub struct InvokeRequest {
    pub job_id: String,

    /// The compiled composition program.
    pub program: String,

    pub output_path: PathBuf,
    pub encode: EncodeSettings,

    /// Expected frame total, reported back alongside progress updates.
    pub total_frames: u64,

    /// Optional playback range; the engine clips to it.
    pub start_frame: Option<i64>,
    pub end_frame: Option<i64>,
}

/// Progress hook invoked with `(current_frame, total_frames)`.
pub type EngineProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// The render engine boundary. All methods are async; invocation may run
/// for minutes and must stay cancellable from another task.
pub trait RenderEngine: Send + Sync {
    fn check_availability(&self) -> impl Future<Output = EngineStatus> + Send;

    fn invoke(
        &self,
        request: InvokeRequest,
        progress: Option<EngineProgressFn>,
    ) -> impl Future<Output = InvokeOutcome> + Send;

    /// Request cooperative cancellation of a running invocation. Returns
    /// whether the request was acknowledged (the job was known and running).
    fn cancel(&self, job_id: &str) -> impl Future<Output = bool> + Send;

    fn validate(&self, program: &str) -> impl Future<Output = ProgramValidation> + Send;
}

/// Binary locations probed before falling back to `which`.
const MELT_CANDIDATES: &[&str] = &[
    "melt",
    "/usr/bin/melt",
    "/usr/local/bin/melt",
    "/opt/homebrew/bin/melt",
];

/// Production gateway driving MLT's `melt`.
pub struct MeltEngine {
    temp_dir: PathBuf,
    active: Mutex<HashMap<String, oneshot::Sender<()>>>,
}

impl MeltEngine {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.temp_dir.clone())
    }
}

impl RenderEngine for MeltEngine {
    fn check_availability(&self) -> impl Future<Output = EngineStatus> + Send {
        async move {
            match find_melt().await {
                Some(path) => {
                    let version = Command::new(&path)
                        .arg("--version")
                        .output()
                        .await
                        .ok()
                        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());
                    EngineStatus {
                        available: true,
                        version,
                        path: Some(path),
                        error: None,
                    }
                }
                None => EngineStatus {
                    available: false,
                    version: None,
                    path: None,
                    error: Some(
                        "melt not found. Install the MLT framework (e.g. apt install melt)"
                            .to_string(),
                    ),
                },
            }
        }
    }

    fn invoke(
        &self,
        request: InvokeRequest,
        progress: Option<EngineProgressFn>,
    ) -> impl Future<Output = InvokeOutcome> + Send {
        async move {
            let Some(melt_path) = find_melt().await else {
                return InvokeOutcome::failure("melt not found on system");
            };

            if let Err(e) = tokio::fs::create_dir_all(&self.temp_dir).await {
                return InvokeOutcome::failure(format!(
                    "failed to create temp directory {}: {e}",
                    self.temp_dir.display()
                ));
            }

            let xml_path = self.temp_dir.join(format!("{}.mlt", request.job_id));
            if let Err(e) = tokio::fs::write(&xml_path, &request.program).await {
                return InvokeOutcome::failure(format!(
                    "failed to write program {}: {e}",
                    xml_path.display()
                ));
            }

            let (cancel_tx, mut cancel_rx) = oneshot::channel();
            self.active
                .lock()
                .unwrap()
                .insert(request.job_id.clone(), cancel_tx);

            let outcome =
                run_melt(&melt_path, &xml_path, &request, progress, &mut cancel_rx).await;

            self.active.lock().unwrap().remove(&request.job_id);
            let _ = tokio::fs::remove_file(&xml_path).await;

            outcome
        }
    }

    fn cancel(&self, job_id: &str) -> impl Future<Output = bool> + Send {
        let acked = self
            .active
            .lock()
            .unwrap()
            .remove(job_id)
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false);
        async move { acked }
    }

    fn validate(&self, program: &str) -> impl Future<Output = ProgramValidation> + Send {
        async move {
            let Some(melt_path) = find_melt().await else {
                return ProgramValidation {
                    valid: false,
                    error: Some("melt not found".to_string()),
                };
            };

            if let Err(e) = tokio::fs::create_dir_all(&self.temp_dir).await {
                return ProgramValidation {
                    valid: false,
                    error: Some(format!(
                        "failed to create temp directory {}: {e}",
                        self.temp_dir.display()
                    )),
                };
            }

            let xml_path = self
                .temp_dir
                .join(format!("validate_{}.mlt", uuid::Uuid::new_v4()));
            if let Err(e) = tokio::fs::write(&xml_path, program).await {
                return ProgramValidation {
                    valid: false,
                    error: Some(format!("failed to write program: {e}")),
                };
            }

            // Render back to XML: structurally valid programs round-trip,
            // broken ones make melt exit non-zero.
            let output = Command::new(&melt_path)
                .arg(&xml_path)
                .arg("-consumer")
                .arg("xml")
                .output()
                .await;

            let _ = tokio::fs::remove_file(&xml_path).await;

            match output {
                Ok(out) if out.status.success() => ProgramValidation {
                    valid: true,
                    error: None,
                },
                Ok(out) => ProgramValidation {
                    valid: false,
                    error: Some(String::from_utf8_lossy(&out.stderr).trim().to_string()),
                },
                Err(e) => ProgramValidation {
                    valid: false,
                    error: Some(format!("failed to run melt: {e}")),
                },
            }
        }
    }
}

/// Find the melt binary on the system.
async fn find_melt() -> Option<String> {
    for path in MELT_CANDIDATES {
        if let Ok(output) = Command::new(path).arg("--version").output().await {
            if output.status.success() {
                return Some(path.to_string());
            }
        }
    }

    if let Ok(output) = Command::new("which").arg("melt").output().await {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return Some(path);
            }
        }
    }

    None
}

async fn run_melt(
    melt_path: &str,
    xml_path: &Path,
    request: &InvokeRequest,
    progress: Option<EngineProgressFn>,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> InvokeOutcome {
    let mut cmd = Command::new(melt_path);
    cmd.arg(xml_path);
    for arg in encode_args(&request.encode) {
        cmd.arg(arg);
    }
    if let Some(start) = request.start_frame {
        cmd.arg(format!("in={start}"));
    }
    if let Some(end) = request.end_frame {
        cmd.arg(format!("out={end}"));
    }
    cmd.arg("-consumer")
        .arg(format!("avformat:{}", request.output_path.display()))
        .arg("-progress");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return InvokeOutcome::failure(format!("failed to start melt: {e}")),
    };

    tracing::info!(
        job_id = %request.job_id,
        pid = child.id().unwrap_or(0),
        total_frames = request.total_frames,
        output = %request.output_path.display(),
        "melt process started"
    );

    let Some(stderr) = child.stderr.take() else {
        return InvokeOutcome::failure("failed to capture melt stderr");
    };

    // Drain stderr concurrently so melt never blocks on a full pipe; progress
    // updates are carriage-return separated.
    let total_frames = request.total_frames;
    let reader_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut tail: VecDeque<String> = VecDeque::new();
        loop {
            buf.clear();
            let read = match reader.read_until(b'\r', &mut buf).await {
                Ok(n) => n,
                Err(_) => 0,
            };
            if read == 0 {
                break;
            }

            let chunk = String::from_utf8_lossy(&buf);
            for piece in chunk.split('\n') {
                let piece = piece.trim_matches(['\r', ' ', '\t']);
                if piece.is_empty() {
                    continue;
                }
                if let Some(frame) = parse_progress_line(piece) {
                    if let Some(cb) = &progress {
                        cb(frame, total_frames);
                    }
                } else {
                    if tail.len() >= 20 {
                        tail.pop_front();
                    }
                    tail.push_back(piece.to_string());
                }
            }
        }
        tail.into_iter().collect::<Vec<_>>().join("\n")
    });

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel_rx => {
            tracing::info!(job_id = %request.job_id, "Cancellation requested, stopping melt");
            let _ = child.start_kill();
            let _ = child.wait().await;
            let _ = reader_task.await;
            return InvokeOutcome {
                success: false,
                cancelled: true,
                output_path: None,
                error: Some("render cancelled".to_string()),
            };
        }
    };

    let stderr_tail = reader_task.await.unwrap_or_default();

    match status {
        Ok(status) if status.success() => InvokeOutcome {
            success: true,
            cancelled: false,
            output_path: Some(request.output_path.clone()),
            error: None,
        },
        Ok(status) => InvokeOutcome::failure(format!(
            "melt exited with {status}: {}",
            stderr_tail.trim()
        )),
        Err(e) => InvokeOutcome::failure(format!("failed to wait on melt: {e}")),
    }
}

/// Encode arguments handed to melt ahead of the consumer.
fn encode_args(encode: &EncodeSettings) -> Vec<String> {
    vec![
        format!("vcodec={}", encode.video_codec),
        format!("acodec={}", encode.audio_codec),
        format!("ab={}", encode.audio_bitrate),
        format!("crf={}", encode.crf),
        format!("width={}", encode.width),
        format!("height={}", encode.height),
        format!("frame_rate_num={}", encode.frame_rate.num),
        format!("frame_rate_den={}", encode.frame_rate.den),
        "preset=medium".to_string(),
    ]
}

/// Parse a `Current Frame:` progress line from melt's stderr.
fn parse_progress_line(line: &str) -> Option<u64> {
    let rest = line.split("Current Frame:").nth(1)?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinecut_common::time::FrameRate;

    #[test]
    fn test_parse_progress_line_extracts_frame() {
        assert_eq!(
            parse_progress_line("Current Frame:         75, percentage:        25"),
            Some(75)
        );
        assert_eq!(parse_progress_line("Current Frame: 0, percentage: 0"), Some(0));
        assert_eq!(parse_progress_line("Frames per second: 30"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn test_encode_args_cover_all_settings() {
        let encode = EncodeSettings {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            crf: 18,
            width: 1920,
            height: 1080,
            frame_rate: FrameRate::whole(30),
        };

        assert_eq!(
            encode_args(&encode),
            vec![
                "vcodec=libx264",
                "acodec=aac",
                "ab=192k",
                "crf=18",
                "width=1920",
                "height=1080",
                "frame_rate_num=30",
                "frame_rate_den=1",
                "preset=medium",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_of_unknown_job_is_not_acknowledged() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MeltEngine::new(dir.path());
        assert!(!engine.cancel("no-such-job").await);
    }
}
