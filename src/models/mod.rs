pub mod probe;
pub mod report;
pub mod risk;
pub mod suite_result;

pub use probe::{Probe, ProbeOutcome, ProbeRecord};
pub use report::Report;
pub use risk::RiskLevel;
pub use suite_result::{SuiteResult, SuiteStatus};
