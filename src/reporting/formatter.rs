use console::style;

use crate::models::{Report, RiskLevel, SuiteStatus};

/// Render the human-readable run summary printed after a scan.
pub fn format_summary(report: &Report) -> String {
    let mut out = String::new();
    let rule = "=".repeat(65);

    out.push_str(&format!("\n{}\nSECURITY TEST RESULTS\n{}\n", rule, rule));

    for suite in &report.suites {
        out.push_str(&format!("\n{}\n{}\n", style(&suite.suite).bold(), "-".repeat(65)));

        match suite.status {
            SuiteStatus::Completed => {
                out.push_str(&format!("  Status: completed ({} probes)\n", suite.probes.len()));
                let crashes = suite.crash_count();
                let timeouts = suite.timeout_count();
                if crashes > 0 {
                    out.push_str(&format!("  Crashes: {}\n", style(crashes).red()));
                }
                if timeouts > 0 {
                    out.push_str(&format!("  Timeouts: {}\n", style(timeouts).yellow()));
                }
            }
            SuiteStatus::Failed => {
                let error = suite.findings["error"].as_str().unwrap_or("unknown");
                out.push_str(&format!("  Status: {} ({})\n", style("failed").red(), error));
            }
            SuiteStatus::Incomplete => {
                out.push_str(&format!("  Status: {}\n", style("incomplete").yellow()));
            }
        }

        let risk = match suite.risk_level {
            RiskLevel::Critical | RiskLevel::High => style(suite.risk_level.as_str()).red(),
            RiskLevel::Medium => style(suite.risk_level.as_str()).yellow(),
            RiskLevel::Low | RiskLevel::None => style(suite.risk_level.as_str()).green(),
        };
        out.push_str(&format!("  Risk Level: {}\n", risk));
    }

    let grade = match report.grade.rank() {
        0 | 1 => style(report.grade.as_str()).green(),
        2 => style(report.grade.as_str()).yellow(),
        _ => style(report.grade.as_str()).red(),
    };
    out.push_str(&format!("\n{}\nGrade: {}  ({} ms)\n", rule, grade.bold(), report.duration_ms));

    out
}
