//! Tool process launching

use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::plan::Invocation;

/// Exit code Karate uses when tests ran and some failed
pub const TEST_FAILURE_EXIT_CODE: i32 = 1;

/// How the tool process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Code(i32),
    /// Terminated without an exit code (killed by a signal)
    Signal,
}

impl Exit {
    pub fn success(&self) -> bool {
        matches!(self, Exit::Code(0))
    }

    /// Tests ran and at least one failed
    pub fn is_test_failure(&self) -> bool {
        matches!(self, Exit::Code(TEST_FAILURE_EXIT_CODE))
    }
}

impl std::fmt::Display for Exit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exit::Code(code) => write!(f, "exit status {}", code),
            Exit::Signal => write!(f, "terminated by signal"),
        }
    }
}

/// Captured result of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit: Exit,
    /// Stdout followed by stderr
    pub output: Vec<u8>,
}

/// Launches the planned invocation and waits for it
pub trait ProcessExecutor {
    /// Run to completion with `env` added to the inherited environment.
    /// An `Err` means the process could not be started.
    fn execute(&self, invocation: &Invocation, env: &BTreeMap<String, String>)
        -> io::Result<ProcessOutput>;
}

impl<T: ProcessExecutor + ?Sized> ProcessExecutor for &T {
    fn execute(
        &self,
        invocation: &Invocation,
        env: &BTreeMap<String, String>,
    ) -> io::Result<ProcessOutput> {
        (**self).execute(invocation, env)
    }
}

/// Executor that spawns a real child process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(
        &self,
        invocation: &Invocation,
        env: &BTreeMap<String, String>,
    ) -> io::Result<ProcessOutput> {
        debug!(
            "Spawning {} in {}",
            invocation.program,
            invocation.directory.display()
        );

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(env)
            .current_dir(&invocation.directory)
            .stdin(Stdio::null())
            .output()?;

        let exit = match output.status.code() {
            Some(code) => Exit::Code(code),
            None => Exit::Signal,
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        Ok(ProcessOutput {
            exit,
            output: combined,
        })
    }
}
