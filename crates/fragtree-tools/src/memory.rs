//! Memory and duration tracking across solve stages.

use std::time::{Duration, Instant};
use sysinfo::System;
use tracing::trace;

/// Errors produced by memory instrumentation.
#[derive(Debug, Clone)]
pub enum MemoryError {
    ProcessNotFound { pid: u32 },
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ProcessNotFound { pid } => {
                write!(f, "failed to locate process {}", pid)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

fn current_rss_bytes() -> Result<u64, MemoryError> {
    let pid = sysinfo::Pid::from(std::process::id() as usize);

    // Only refresh the current process, not the entire system
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[pid]),
        true,
        sysinfo::ProcessRefreshKind::nothing().with_memory(),
    );

    let process = sys.process(pid).ok_or(MemoryError::ProcessNotFound {
        pid: std::process::id(),
    })?;
    Ok(process.memory())
}

/// Resident set size of the current process, or `None` if unavailable.
pub fn capture_rss_bytes(stage: &str) -> Option<u64> {
    match current_rss_bytes() {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            trace!(
                component = "tools",
                operation = "capture_rss",
                status = "warn",
                stage,
                error = %err,
                "RSS not available"
            );
            None
        }
    }
}

/// Signed difference between two optional RSS readings.
pub fn rss_delta(before: Option<u64>, after: Option<u64>) -> Option<i64> {
    match (before, after) {
        (Some(before), Some(after)) => Some(after as i64 - before as i64),
        _ => None,
    }
}

/// Duration and memory of one completed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageMeasurement {
    pub stage: String,
    pub duration: Duration,
    pub rss_before_bytes: Option<u64>,
    pub rss_after_bytes: Option<u64>,
    pub rss_delta_bytes: Option<i64>,
}

impl StageMeasurement {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Token returned by [`MeasurementRecorder::begin_stage`].
#[derive(Debug)]
#[must_use = "pass the token to end_stage to record the stage"]
pub struct StageStart {
    stage: String,
    started: Instant,
    rss_before_bytes: Option<u64>,
}

/// Records stage measurements in the order stages complete.
#[derive(Debug, Default)]
pub struct MeasurementRecorder {
    stages: Vec<StageMeasurement>,
    capture_memory: bool,
}

impl MeasurementRecorder {
    /// Recorder that captures both durations and RSS.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            capture_memory: true,
        }
    }

    /// Recorder that only captures durations.
    pub fn durations_only() -> Self {
        Self {
            stages: Vec::new(),
            capture_memory: false,
        }
    }

    pub fn begin_stage(&self, stage: &str) -> StageStart {
        let rss_before_bytes = if self.capture_memory {
            capture_rss_bytes(stage)
        } else {
            None
        };
        StageStart {
            stage: stage.to_string(),
            started: Instant::now(),
            rss_before_bytes,
        }
    }

    pub fn end_stage(&mut self, start: StageStart) -> &StageMeasurement {
        let duration = start.started.elapsed();
        let rss_after_bytes = if self.capture_memory {
            capture_rss_bytes(&start.stage)
        } else {
            None
        };
        self.stages.push(StageMeasurement {
            stage: start.stage,
            duration,
            rss_before_bytes: start.rss_before_bytes,
            rss_after_bytes,
            rss_delta_bytes: rss_delta(start.rss_before_bytes, rss_after_bytes),
        });
        &self.stages[self.stages.len() - 1]
    }

    pub fn stages(&self) -> &[StageMeasurement] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<StageMeasurement> {
        self.stages
    }

    /// Total duration of all recorded stages.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_rss_bytes() {
        let rss = capture_rss_bytes("test_stage");
        assert!(rss.is_some_and(|bytes| bytes > 0));
    }

    #[test]
    fn test_rss_delta() {
        assert_eq!(rss_delta(Some(1000), Some(1500)), Some(500));
        assert_eq!(rss_delta(Some(1500), Some(1000)), Some(-500));
        assert_eq!(rss_delta(None, Some(1000)), None);
    }

    #[test]
    fn test_recorder_keeps_stage_order() {
        let mut recorder = MeasurementRecorder::durations_only();
        let start = recorder.begin_stage("prepare");
        recorder.end_stage(start);
        let start = recorder.begin_stage("solve");
        let solve = recorder.end_stage(start);
        assert_eq!(solve.stage, "solve");
        assert!(solve.rss_before_bytes.is_none());

        let names: Vec<&str> = recorder.stages().iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["prepare", "solve"]);
        assert!(recorder.total_duration() >= recorder.stages()[0].duration);
    }

    #[test]
    fn test_recorder_captures_memory() {
        let mut recorder = MeasurementRecorder::new();
        let start = recorder.begin_stage("total");
        let measurement = recorder.end_stage(start);
        assert!(measurement.rss_after_bytes.is_some());
        assert!(measurement.rss_delta_bytes.is_some());
    }
}
