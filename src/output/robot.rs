//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, trace, warn};

use crate::database::{MergeReport, TableSummary};
use crate::error::SwitchError;
use crate::replicate::ReplicationReport;
use crate::workflow::MigrationReport;

use super::{Output, RobotFormat};

/// JSON output implementation for scripting.
///
/// Results go to stdout, errors to stderr.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> Option<String> {
        let rendered = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        match rendered {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON serialized");
                Some(json)
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize output");
                None
            }
        }
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        if let Some(json) = self.render(data) {
            println!("{json}");
        }
    }

    fn output_json_stderr<T: Serialize + ?Sized>(&self, data: &T) {
        if let Some(json) = self.render(data) {
            eprintln!("{json}");
        }
    }
}

/// The JSON object reported for an error.
pub fn error_json(error: &SwitchError) -> Value {
    json!({
        "error": true,
        "code": error.code(),
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&json!({ "success": true, "message": message }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &SwitchError) {
        debug!(error = %error, "Robot: error");
        self.output_json_stderr(&error_json(error));
    }

    fn warning(&self, message: &str) {
        self.output_json(&json!({ "warning": true, "message": message }));
    }

    #[instrument(skip(self, report))]
    fn replication(&self, step: &str, src: &Path, dst: &Path, report: &ReplicationReport) {
        debug!(files = report.files_written(), "Robot: replication");
        self.output_json(&json!({
            "command": step,
            "ok": true,
            "source": src,
            "destination": dst,
            "report": report,
        }));
    }

    fn truncated(&self, database: &Path, table: &str, rows: usize) {
        self.output_json(&json!({
            "command": "truncate",
            "ok": true,
            "database": database,
            "table": table,
            "rows_deleted": rows,
        }));
    }

    #[instrument(skip_all, fields(rows = report.rows_inserted))]
    fn merge(&self, report: &MergeReport) {
        debug!("Robot: merge");
        self.output_json(&json!({
            "command": "merge",
            "ok": true,
            "report": report,
        }));
    }

    #[instrument(skip_all, fields(stage = %report.stage))]
    fn migration(&self, report: &MigrationReport) {
        debug!("Robot: migration");
        self.output_json(&json!({
            "command": "run",
            "ok": true,
            "report": report,
        }));
    }

    fn table_summary(&self, summary: &TableSummary) {
        self.output_json(summary);
    }

    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        self.output_json(&json!({
            "version": version,
            "git_sha": git_sha,
            "build_time": build_time
        }));
    }
}
