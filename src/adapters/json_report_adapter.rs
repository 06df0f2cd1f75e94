//! JSON report adapter implementing ReportPort.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::MltraderError;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes the full backtest report as pretty-printed JSON.
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), MltraderError> {
        let json = serde_json::to_string_pretty(report).map_err(|e| MltraderError::Report {
            reason: format!("failed to serialize report: {}", e),
        })?;

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MltraderError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(output_path, json).map_err(|e| MltraderError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;

        info!(path = %output_path.display(), models = report.results.len(), "report written");
        Ok(())
    }
}
