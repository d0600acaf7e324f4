//! Agent command line and the single-run flow

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};

use karate_executor_common::{ExecutionRequest, JsonLineSink, OutputLine};
use karate_executor_runner::{KarateRunner, Runner, RunnerConfig};

/// Karate executor agent - runs one execution and prints the result
#[derive(Parser, Debug)]
#[command(name = "karate-agent")]
#[command(about = "Run one Karate execution and report the result as JSON lines")]
#[command(version)]
pub struct Cli {
    /// Execution request as JSON
    #[arg(required_unless_present = "execution_file", conflicts_with = "execution_file")]
    pub execution: Option<String>,

    /// Read the execution request from a file instead
    #[arg(long)]
    pub execution_file: Option<PathBuf>,

    /// Runner configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Data directory prepared by the host
    #[arg(long, env = "RUNNER_DATADIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the Karate jar
    #[arg(long, env = "RUNNER_KARATE_JAR")]
    pub karate_jar: Option<PathBuf>,

    /// Java launcher
    #[arg(long, env = "RUNNER_JAVA_BINARY")]
    pub java: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Config file (or defaults) with command line and env overrides applied
    pub fn runner_config(&self) -> anyhow::Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(jar) = &self.karate_jar {
            config.karate_jar = jar.clone();
        }
        if let Some(java) = &self.java {
            config.java_binary = java.clone();
        }

        Ok(config)
    }

    /// Decode the execution request
    pub fn request(&self) -> anyhow::Result<ExecutionRequest> {
        let json = match (&self.execution, &self.execution_file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => anyhow::bail!("No execution request given"),
        };

        ExecutionRequest::from_json(&json).context("Invalid execution request")
    }
}

/// Run one execution, writing events and the outcome to `out`
///
/// A hard failure is written as an `error` line and also returned.
pub fn run<W: Write>(cli: &Cli, out: W) -> anyhow::Result<()> {
    let sink = JsonLineSink::new(out);

    let outcome = execute(cli, &sink);

    let mut out = sink.into_inner();
    match outcome {
        Ok(result) => {
            OutputLine::Result { result }.write_to(&mut out)?;
            Ok(())
        }
        Err(e) => {
            error!("Execution failed: {:#}", e);
            OutputLine::Error {
                content: format!("{:#}", e),
            }
            .write_to(&mut out)?;
            Err(e)
        }
    }
}

fn execute<W: Write>(
    cli: &Cli,
    sink: &JsonLineSink<W>,
) -> anyhow::Result<karate_executor_common::ExecutionResult> {
    let config = cli.runner_config()?;
    let request = cli.request()?;
    debug!("Running {} ({}) in {}", request.id, request.test_type, config.data_dir.display());

    let runner = KarateRunner::with_config(config).with_events(sink);
    Ok(runner.run(request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use karate_executor_common::ExecutionStatus;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["karate-agent"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn lines(out: &[u8]) -> Vec<OutputLine> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_requires_an_execution() {
        assert!(Cli::try_parse_from(["karate-agent"]).is_err());
    }

    #[test]
    fn test_rejects_both_execution_sources() {
        let parsed = Cli::try_parse_from(["karate-agent", "{}", "--execution-file", "x.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(&path, "data_dir = \"/from-file\"\nkarate_jar = \"/opt/karate.jar\"\n").unwrap();

        let cli = parse(&[
            "{}",
            "--config",
            path.to_str().unwrap(),
            "--data-dir",
            "/from-flag",
            "--java",
            "/opt/jdk/bin/java",
        ]);
        let config = cli.runner_config().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/from-flag"));
        assert_eq!(config.karate_jar, PathBuf::from("/opt/karate.jar"));
        assert_eq!(config.java_binary, "/opt/jdk/bin/java");
    }

    #[test]
    fn test_request_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution.json");
        std::fs::write(
            &path,
            r#"{"test_type": "karate/feature", "content": {"type": "string", "data": "Feature: x"}}"#,
        )
        .unwrap();

        let cli = parse(&["--execution-file", path.to_str().unwrap()]);
        let request = cli.request().unwrap();
        assert!(request.content.is_file());
    }

    #[test]
    fn test_prints_result_line_for_result_errors() {
        let dir = tempfile::tempdir().unwrap();
        let execution = r#"{
            "test_type": "karate/standalone",
            "content": {"type": "git-dir", "repository": {"uri": "http://not-used", "branch": "main"}}
        }"#;
        let cli = parse(&[execution, "--data-dir", dir.path().to_str().unwrap()]);

        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();

        let lines = lines(&out);
        assert_eq!(lines.len(), 1);
        match &lines[0] {
            OutputLine::Result { result } => {
                assert_eq!(result.status, Some(ExecutionStatus::Failed));
                assert_eq!(
                    result.error_message.as_deref(),
                    Some("args are required for test type karate/standalone")
                );
            }
            other => panic!("expected result line, got {:?}", other),
        }
    }

    #[test]
    fn test_prints_error_line_for_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let execution = r#"{"test_type": "karate/feature", "content": {"type": "string"}}"#;
        let cli = parse(&[execution, "--data-dir", missing.to_str().unwrap()]);

        let mut out = Vec::new();
        assert!(run(&cli, &mut out).is_err());

        let lines = lines(&out);
        assert_eq!(lines.len(), 1);
        assert!(matches!(&lines[0], OutputLine::Error { content } if content.contains("missing")));
    }

    #[test]
    fn test_prints_error_line_for_bad_request() {
        let cli = parse(&[r#"{"test_type": "karate/nope", "content": {"type": "string"}}"#]);

        let mut out = Vec::new();
        assert!(run(&cli, &mut out).is_err());
        assert!(matches!(&lines(&out)[0], OutputLine::Error { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_emits_running_event_before_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        let execution = r#"{
            "test_type": "karate/standalone",
            "content": {"type": "git", "repository": {"uri": "http://not-used", "branch": "main"}},
            "args": ["-c", "echo ran"]
        }"#;
        let cli = parse(&[execution, "--data-dir", dir.path().to_str().unwrap(), "--java", "sh"]);

        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();

        let lines = lines(&out);
        assert_eq!(lines.len(), 2);
        assert!(matches!(&lines[0], OutputLine::Event { content } if content.starts_with("Running")));
        match &lines[1] {
            OutputLine::Result { result } => {
                assert!(result.is_passed());
                assert_eq!(result.output, "ran\n");
            }
            other => panic!("expected result line, got {:?}", other),
        }
    }
}
