use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::TestbenchError;
use crate::models::Report;

const SHIELDS_URL: &str = "https://img.shields.io/badge/Security-{grade}-{color}";

/// Write the JSON report and the markdown badge artifact.
///
/// Returns the badge path.
pub async fn write_report(report: &Report, out_dir: &Path) -> Result<PathBuf, TestbenchError> {
    tokio::fs::create_dir_all(out_dir).await?;

    let json = serde_json::to_string_pretty(report)?;
    let json_path = out_dir.join("mcp_testbench_report.json");
    tokio::fs::write(&json_path, &json).await?;
    info!(path = %json_path.display(), "Wrote JSON report");

    let badge_path = out_dir.join("SECURITY_BADGE.md");
    tokio::fs::write(&badge_path, badge_markdown(report)).await?;
    info!(path = %badge_path.display(), "Wrote badge");

    Ok(badge_path)
}

pub fn badge_markdown(report: &Report) -> String {
    let url = SHIELDS_URL
        .replace("{grade}", report.grade.as_str())
        .replace("{color}", report.grade.badge_color());
    format!("![MCP Security Score]({})", url)
}
