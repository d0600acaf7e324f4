//! Invocation planning
//!
//! Turns an execution request into the working directory and argument
//! vector for the Karate launcher. Planning is pure: it never touches the
//! filesystem.

use std::path::{Component, Path, PathBuf};

use karate_executor_common::{ExecutionRequest, TestType};
use thiserror::Error;

use crate::config::RunnerConfig;

/// Flags that make Karate write JUnit XML reports
pub const REPORT_FLAGS: [&str; 2] = ["-f", "junit:xml"];

/// Reasons a request cannot be turned into an invocation
///
/// These are reported on the result, not as executor errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unsupported content for test type {test_type}")]
    Unsupported { test_type: TestType },

    #[error("args are required for test type {test_type}")]
    MissingArgs { test_type: TestType },
}

/// What kind of run was planned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Single feature file in the data directory
    Feature {
        /// Raw content written by the host
        source: PathBuf,
        /// Content renamed with the feature extension
        file: PathBuf,
    },
    /// Repository checkout with report flags injected
    Project,
    /// Repository checkout with a caller-owned command line
    Standalone,
}

/// A fully resolved tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub directory: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub job: Job,
}

/// Resolve the invocation for a request
pub fn plan(config: &RunnerConfig, request: &ExecutionRequest) -> Result<Invocation, PlanError> {
    let test_type = request.test_type;
    let content = &request.content;

    let (directory, args, job) = match test_type {
        TestType::Feature if content.is_file() => {
            let file_name = config.feature_file_name();
            let mut args = launcher_args(config);
            args.extend(request.args.iter().cloned());
            args.push(file_name.clone());

            let job = Job::Feature {
                source: config.content_file(),
                file: config.data_dir.join(&file_name),
            };
            (config.data_dir.clone(), args, job)
        }
        TestType::Project if content.is_dir() => {
            let mut args = launcher_args(config);
            args.extend(request.args.iter().cloned());

            (repo_directory(config, request), args, Job::Project)
        }
        TestType::Standalone if content.is_dir() => {
            if request.args.is_empty() {
                return Err(PlanError::MissingArgs { test_type });
            }
            (repo_directory(config, request), request.args.clone(), Job::Standalone)
        }
        _ => return Err(PlanError::Unsupported { test_type }),
    };

    Ok(Invocation {
        directory,
        program: config.java_binary.clone(),
        args,
        job,
    })
}

/// `-jar <jar>` followed by the report flags
fn launcher_args(config: &RunnerConfig) -> Vec<String> {
    let mut args = vec![
        "-jar".to_string(),
        config.karate_jar.to_string_lossy().into_owned(),
    ];
    args.extend(REPORT_FLAGS.iter().map(|flag| flag.to_string()));
    args
}

/// Repository checkout, plus the sub-path when one is given
///
/// Only plain components of the sub-path are kept, so a leading `/` or a
/// `..` never leaves the checkout.
fn repo_directory(config: &RunnerConfig, request: &ExecutionRequest) -> PathBuf {
    let mut directory = config.repo_dir();
    if let Some(path) = request.content.repository().and_then(|repo| repo.sub_path()) {
        directory.extend(
            Path::new(path)
                .components()
                .filter(|c| matches!(c, Component::Normal(_))),
        );
    }
    directory
}
