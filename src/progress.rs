//! Training progress reporting for `pb train --wait`.
//!
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts. The reporter is fed fresh [`TrainingStatus`] snapshots by the
//! polling loop; it decides how (or whether) to render them.

use std::io::Write;

use crate::models::TrainingStatus;

/// Renders training status snapshots. Implementations write to stderr
/// (human or JSON).
pub trait TrainProgressReporter: Send + Sync {
    /// Called whenever the polled status changes.
    fn report(&self, status: &TrainingStatus);
}

/// Human-friendly progress on stderr: "train  Embedding vectors...  63%".
pub struct StderrProgress;

impl StderrProgress {
    fn format_line(status: &TrainingStatus) -> String {
        format!("train  {}  {}%\n", status.stage, status.progress)
    }
}

impl TrainProgressReporter for StderrProgress {
    fn report(&self, status: &TrainingStatus) {
        let line = Self::format_line(status);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl TrainProgressReporter for JsonProgress {
    fn report(&self, status: &TrainingStatus) {
        let obj = serde_json::json!({
            "event": "progress",
            "is_training": status.is_training,
            "stage": status.stage,
            "progress": status.progress,
            "message": status.message,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl TrainProgressReporter for NoProgress {
    fn report(&self, _status: &TrainingStatus) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn TrainProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_line_shows_stage_and_percent() {
        let status = TrainingStatus {
            is_training: true,
            stage: "Embedding vectors...".to_string(),
            progress: 63,
            message: String::new(),
        };
        let line = StderrProgress::format_line(&status);
        assert_eq!(line, "train  Embedding vectors...  63%\n");
    }
}
