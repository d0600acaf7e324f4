//! Karate Executor Runner
//!
//! Launches the Karate test tool for a single execution request and turns
//! its JUnit XML reports into an [`ExecutionResult`].
//!
//! # Flow
//!
//! ```text
//! ExecutionRequest
//!   -> data dir check            (config)
//!   -> working dir + argv        (plan)
//!   -> child environment         (secret manager)
//!   -> java -jar karate.jar ...  (process)
//!   -> target/karate-reports/*.xml -> steps   (junit)
//!   -> ExecutionResult
//! ```
//!
//! [`ExecutionResult`]: karate_executor_common::ExecutionResult

pub mod config;
pub mod junit;
pub mod karate;
pub mod plan;
pub mod process;

pub use config::RunnerConfig;
pub use karate::{KarateRunner, Runner, TEST_FAILURES_MESSAGE};
pub use plan::{Invocation, Job, PlanError};
pub use process::{Exit, ProcessExecutor, ProcessOutput, SystemExecutor};
