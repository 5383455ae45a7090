const MAX_EVIDENCE_LENGTH: usize = 4_000;
const MAX_ERROR_LENGTH: usize = 2_000;

/// Cap response evidence kept in a report, preserving head and tail.
pub fn truncate_evidence(output: &str) -> String {
    if output.len() <= MAX_EVIDENCE_LENGTH {
        output.to_string()
    } else {
        let half = MAX_EVIDENCE_LENGTH / 2;
        let start: String = output.chars().take(half).collect();
        let end: String = output
            .chars()
            .skip(output.chars().count().saturating_sub(half))
            .collect();
        format!(
            "{}\n\n... [truncated {} chars] ...\n\n{}",
            start,
            output.len() - MAX_EVIDENCE_LENGTH,
            end
        )
    }
}

pub fn truncate_error(error: &str) -> String {
    if error.len() <= MAX_ERROR_LENGTH {
        error.to_string()
    } else {
        let head: String = error.chars().take(MAX_ERROR_LENGTH).collect();
        format!("{}...", head)
    }
}
