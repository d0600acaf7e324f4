//! Karate execution adapter
//!
//! Runs one execution request end to end: check the data directory, plan
//! the invocation, launch Karate with the request's environment, then read
//! the JUnit reports it left behind.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use karate_executor_common::output::{EventSink, TracingSink};
use karate_executor_common::secret::{EnvManager, SecretManager};
use karate_executor_common::types::OUTPUT_TYPE_TEXT;
use karate_executor_common::{Error, ExecutionRequest, ExecutionResult, ExecutionStatus, Result};

use crate::config::RunnerConfig;
use crate::junit;
use crate::plan::{self, Invocation, Job};
use crate::process::{ProcessExecutor, SystemExecutor};

/// Error message reported when tests ran and some failed
pub const TEST_FAILURES_MESSAGE: &str = "there are test failures";

/// Trailing output lines kept in a tool failure reason
const FAILURE_TAIL_LINES: usize = 10;

/// Host-facing entry point: run one request
pub trait Runner {
    fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult>;
}

/// Runner that drives the Karate standalone jar
pub struct KarateRunner<E = SystemExecutor, S = TracingSink> {
    config: RunnerConfig,
    executor: E,
    events: S,
}

impl KarateRunner {
    /// Create a runner configured from the process environment
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::from_env())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            executor: SystemExecutor,
            events: TracingSink,
        }
    }
}

impl Default for KarateRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> KarateRunner<E, S>
where
    E: ProcessExecutor,
    S: EventSink,
{
    /// Replace the process executor
    pub fn with_executor<E2: ProcessExecutor>(self, executor: E2) -> KarateRunner<E2, S> {
        KarateRunner {
            config: self.config,
            executor,
            events: self.events,
        }
    }

    /// Replace the event sink
    pub fn with_events<S2: EventSink>(self, events: S2) -> KarateRunner<E, S2> {
        KarateRunner {
            config: self.config,
            executor: self.executor,
            events,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a request with an explicit secret manager
    pub fn run_with<M: SecretManager>(
        &self,
        request: &ExecutionRequest,
        secrets: &M,
    ) -> Result<ExecutionResult> {
        let data_dir = &self.config.data_dir;
        if !data_dir.is_dir() {
            return Err(Error::DataDirMissing(data_dir.clone()));
        }

        let invocation = match plan::plan(&self.config, request) {
            Ok(invocation) => invocation,
            Err(e) => {
                debug!("Not running {}: {}", request.test_type, e);
                return Ok(ExecutionResult::err(e.to_string()));
            }
        };

        if let Job::Feature { source, file } = &invocation.job {
            // The content may already carry the extension
            if let Err(e) = std::fs::rename(source, file) {
                debug!("Could not rename {}: {}", source.display(), e);
            }
        }

        let env = self.child_env(request, secrets);

        let mut details = vec![
            invocation.directory.display().to_string(),
            invocation.program.clone(),
        ];
        details.extend(invocation.args.iter().cloned());
        self.events.event("Running", &details);

        let outcome = self.executor.execute(&invocation, &env).map_err(|e| Error::ToolFailed {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let output = secrets.obfuscate(&outcome.output);
        let output = String::from_utf8_lossy(&output).into_owned();

        let mut result = ExecutionResult::default();
        if outcome.exit.success() {
            result.status = Some(ExecutionStatus::Passed);
        } else if outcome.exit.is_test_failure() {
            result.status = Some(ExecutionStatus::Failed);
            result.error_message = Some(TEST_FAILURES_MESSAGE.to_string());
        } else {
            if !output.trim().is_empty() {
                self.events.log(&output);
            }
            return Err(Error::ToolFailed {
                program: invocation.program.clone(),
                reason: failure_reason(&outcome.exit.to_string(), &output),
            });
        }

        result.output = output;
        result.output_type = OUTPUT_TYPE_TEXT.to_string();
        result.steps = self.collect_steps(&invocation);

        info!(
            "Execution {} {} with {} step(s)",
            request.id,
            result.status.map(|s| s.to_string()).unwrap_or_default(),
            result.steps.len()
        );

        Ok(result)
    }

    /// Resolved variables, then explicit envs; later entries win
    fn child_env<M: SecretManager>(
        &self,
        request: &ExecutionRequest,
        secrets: &M,
    ) -> BTreeMap<String, String> {
        let mut env = secrets.collect_vars(&request.variables);
        for (name, value) in &request.envs {
            if env.insert(name.clone(), value.clone()).is_some() {
                debug!("Env {} overrides variable of the same name", name);
            }
        }
        env
    }

    fn collect_steps(&self, invocation: &Invocation) -> Vec<karate_executor_common::StepResult> {
        let report_dir = invocation.directory.join(&self.config.report_dir);
        if !report_dir.is_dir() {
            warn!("No report directory at {}", report_dir.display());
        }
        junit::collect_steps(&report_dir)
    }
}

/// Exit description followed by the last few lines the tool printed
fn failure_reason(exit: &str, output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return exit.to_string();
    }
    let tail = &lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..];
    format!("{}: {}", exit, tail.join("\n"))
}

impl<E, S> Runner for KarateRunner<E, S>
where
    E: ProcessExecutor,
    S: EventSink,
{
    fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let secrets = EnvManager::with_vars(&request.variables);
        debug!("Masking {} secret value(s) in tool output", secrets.secret_count());
        self.run_with(&request, &secrets)
    }
}
