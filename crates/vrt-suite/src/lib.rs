//! # vrt-suite
//!
//! Environment/assertion test orchestration for the VRT pipeline.
//!
//! A suite runs a set of assertions (existence, overlap, clipping,
//! accessibility, contrast, responsiveness) against a component's rendered
//! tree under three simulated environments. Assertion failures and check
//! errors are recorded as failed results; the run itself only withholds
//! output when authorization is denied or the suite is disabled.

pub mod assertions;
pub mod environment;
mod runner;

pub use assertions::{AssertionKind, AssertionOutcome, TestAssertion};
pub use environment::TestEnvironment;
pub use runner::{
    EnvironmentStats, SuiteMetadata, SuiteStatistics, TestOrchestrator, TestResult, TestSuite,
    TestSummary,
};
