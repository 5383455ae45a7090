pub mod cve_scanner;
pub mod fuzzer;
pub mod injection;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TestbenchError;
use crate::models::SuiteResult;
use crate::transport::Transport;

pub use cve_scanner::CveScanner;
pub use fuzzer::Fuzzer;
pub use injection::InjectionTester;

/// One cohesive set of probes plus a classifier, producing one result.
///
/// Suites are side-effect-free with respect to the harness: they only talk to
/// the target through the transport handed to them. A suite that returns an
/// error (or panics) is degraded to a CRITICAL result by the scheduler; it
/// never aborts the run.
#[async_trait]
pub trait ProbeSuite: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError>;
}

/// Explicit registry of built-in suites. Registration order defines report
/// order.
pub fn builtin_suites() -> Vec<Box<dyn ProbeSuite>> {
    vec![
        Box::new(Fuzzer),
        Box::new(CveScanner),
        Box::new(InjectionTester),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_is_stable() {
        let names: Vec<&str> = builtin_suites().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["fuzzer", "cve_scanner", "injection"]);
    }
}
