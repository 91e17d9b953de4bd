use crate::errors::RequestLogError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Append-only per-request log. Callers only enqueue; a background worker owns the file.
/// The queue is lossy: when it is full, lines are dropped and the drop count is
/// reported through `tracing` on the next record.
#[derive(Debug, Clone)]
pub struct RequestLog {
    writer: NonBlocking,
    reported_drops: Arc<AtomicUsize>,
    _guard: Arc<WorkerGuard>,
}

impl RequestLog {
    pub fn open(path: &Path) -> Result<Self, RequestLogError> {
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RequestLogError::InvalidPath(path.display().to_string()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        Ok(Self {
            writer,
            reported_drops: Arc::new(AtomicUsize::new(0)),
            _guard: Arc::new(guard),
        })
    }

    /// Fire-and-forget: a failed enqueue is reported to the operator and otherwise ignored.
    pub fn record(&self, method: &str, raw_path: &str) {
        let line = format_line(Utc::now(), method, raw_path);
        let mut writer = self.writer.clone();
        if let Err(error) = writer.write_all(line.as_bytes()) {
            tracing::warn!(error = %error, "failed to enqueue request log line");
        }

        let dropped = self.newly_dropped(self.writer.error_counter().dropped_lines());
        if dropped > 0 {
            tracing::warn!(dropped, "request log queue full; lines dropped");
        }
    }

    /// Lines dropped since the last report, given the writer's running total.
    fn newly_dropped(&self, total: usize) -> usize {
        let previous = self.reported_drops.fetch_max(total, Ordering::Relaxed);
        total.saturating_sub(previous)
    }
}

pub fn format_line(timestamp: DateTime<Utc>, method: &str, raw_path: &str) -> String {
    format!(
        "{} - {} {}\n",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        method,
        raw_path
    )
}
