use serde::{Deserialize, Serialize};

use crate::models::{Report, RiskLevel};

/// Ordinal grade used for pass/fail gating in CI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Numeric rank where higher values indicate a worse grade.
    pub fn rank(&self) -> u8 {
        match self {
            Grade::A => 0,
            Grade::B => 1,
            Grade::C => 2,
            Grade::D => 3,
            Grade::F => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Badge color used by the shields.io report artifact.
    pub fn badge_color(&self) -> &'static str {
        match self {
            Grade::A => "brightgreen",
            Grade::B => "green",
            Grade::C => "yellow",
            Grade::D => "orange",
            Grade::F => "red",
        }
    }

    pub fn parse(s: &str) -> Option<Grade> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce the multiset of suite risk levels to a grade.
///
/// Pure function of its input: any CRITICAL → F, else any HIGH → D, else any
/// MEDIUM → C, else any LOW → B, else A. Ties resolve to the worse grade.
pub fn score(risk_levels: &[RiskLevel]) -> Grade {
    let worst = risk_levels
        .iter()
        .copied()
        .fold(RiskLevel::None, RiskLevel::max);

    match worst {
        RiskLevel::Critical => Grade::F,
        RiskLevel::High => Grade::D,
        RiskLevel::Medium => Grade::C,
        RiskLevel::Low => Grade::B,
        RiskLevel::None => Grade::A,
    }
}

/// Score a finished report. Used by the gating step to re-derive the grade
/// and by tests to check idempotence.
pub fn score_report(report: &Report) -> Grade {
    let levels: Vec<RiskLevel> = report.suites.iter().map(|s| s.risk_level).collect();
    score(&levels)
}
