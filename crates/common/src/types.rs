//! Core execution types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Namespace prefix every test type tag carries
pub const TEST_TYPE_NAMESPACE: &str = "karate";

/// Output type reported for captured tool output
pub const OUTPUT_TYPE_TEXT: &str = "text/plain";

/// Kind of Karate execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TestType {
    /// A single feature file written into the data directory
    Feature,
    /// A checked-out repository with caller-chosen feature paths
    Project,
    /// Caller supplies the complete command line
    Standalone,
}

impl TestType {
    /// Variant part of the tag (`feature`, `project`, `standalone`)
    pub fn variant(&self) -> &'static str {
        match self {
            TestType::Feature => "feature",
            TestType::Project => "project",
            TestType::Standalone => "standalone",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", TEST_TYPE_NAMESPACE, self.variant())
    }
}

impl FromStr for TestType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, variant) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidTestType(s.to_string()))?;

        if namespace != TEST_TYPE_NAMESPACE {
            return Err(Error::InvalidTestType(s.to_string()));
        }

        match variant {
            "feature" => Ok(TestType::Feature),
            "project" => Ok(TestType::Project),
            "standalone" => Ok(TestType::Standalone),
            _ => Err(Error::InvalidTestType(s.to_string())),
        }
    }
}

impl TryFrom<String> for TestType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TestType> for String {
    fn from(value: TestType) -> Self {
        value.to_string()
    }
}

/// Git repository the host checked out for the execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub uri: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Sub-path inside the checkout to start from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Repository {
    pub fn new(uri: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            branch: branch.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sub-path, ignoring an empty string
    pub fn sub_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Test content descriptor
///
/// The host materializes the payload before the executor runs: file
/// content lands in `<data_dir>/test-content`, directory content is
/// checked out under `<data_dir>/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TestContent {
    /// Inline payload
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    /// Payload downloaded from a URI
    FileUri { uri: String },
    /// Single file from a repository
    GitFile { repository: Repository },
    /// Directory from a repository
    GitDir { repository: Repository },
    /// Whole repository
    Git { repository: Repository },
}

impl TestContent {
    pub fn string(data: impl Into<String>) -> Self {
        TestContent::String {
            data: Some(data.into()),
        }
    }

    pub fn git_dir(repository: Repository) -> Self {
        TestContent::GitDir { repository }
    }

    /// Content is a single file
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            TestContent::String { .. } | TestContent::FileUri { .. } | TestContent::GitFile { .. }
        )
    }

    /// Content is a directory checkout
    pub fn is_dir(&self) -> bool {
        matches!(self, TestContent::GitDir { .. } | TestContent::Git { .. })
    }

    pub fn repository(&self) -> Option<&Repository> {
        match self {
            TestContent::GitFile { repository }
            | TestContent::GitDir { repository }
            | TestContent::Git { repository } => Some(repository),
            TestContent::String { .. } | TestContent::FileUri { .. } => None,
        }
    }
}

/// How a variable value is sourced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    #[default]
    Basic,
    Secret,
}

/// Reference to the secret backing a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Execution variable, exported to the tool's environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub type_: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
}

impl Variable {
    pub fn basic(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            type_: VariableType::Basic,
            secret_ref: None,
        }
    }

    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_: VariableType::Secret,
            ..Self::basic(name, value)
        }
    }

    pub fn is_secret(&self) -> bool {
        self.type_ == VariableType::Secret
    }
}

/// A single execution the host asks the executor to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub test_type: TestType,
    pub content: TestContent,
    /// Extra tool arguments, in order
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
}

impl ExecutionRequest {
    pub fn new(test_type: TestType, content: TestContent) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            test_type,
            content,
            args: Vec::new(),
            variables: BTreeMap::new(),
            envs: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(name.into(), value.into());
        self
    }

    /// Decode a request from its JSON form
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome status of an execution or a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Passed,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Passed => write!(f, "passed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one test case from the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    /// Human-readable duration, e.g. `1.5s`
    pub duration: String,
    pub status: ExecutionStatus,
}

/// Normalized result handed back to the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub output_type: String,
    #[serde(default)]
    pub steps: Vec<StepResult>,
}

impl ExecutionResult {
    /// Failed result for an execution that never started
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == Some(ExecutionStatus::Passed)
    }

    pub fn is_failed(&self) -> bool {
        self.status == Some(ExecutionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("karate/feature", TestType::Feature)]
    #[test_case("karate/project", TestType::Project)]
    #[test_case("karate/standalone", TestType::Standalone)]
    fn test_type_parses_tag(tag: &str, expected: TestType) {
        let parsed: TestType = tag.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), tag);
    }

    #[test_case("karate" ; "missing variant")]
    #[test_case("postman/collection" ; "foreign namespace")]
    #[test_case("karate/gatling" ; "unknown variant")]
    #[test_case("" ; "empty")]
    fn test_type_rejects_unknown_tags(tag: &str) {
        assert!(matches!(tag.parse::<TestType>(), Err(Error::InvalidTestType(_))));
    }

    #[test]
    fn test_content_shape() {
        assert!(TestContent::string("Feature: x").is_file());
        assert!(TestContent::FileUri { uri: "https://x/y.feature".into() }.is_file());
        let repo = Repository::new("https://github.com/org/repo", "main");
        assert!(TestContent::GitFile { repository: repo.clone() }.is_file());
        assert!(TestContent::git_dir(repo.clone()).is_dir());
        assert!(TestContent::Git { repository: repo }.is_dir());
    }

    #[test]
    fn test_repository_sub_path_ignores_empty() {
        let repo = Repository::new("https://x", "main");
        assert_eq!(repo.sub_path(), None);
        assert_eq!(repo.clone().with_path("").sub_path(), None);
        assert_eq!(repo.with_path("my-dir").sub_path(), Some("my-dir"));
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "id": "62a4f0d1",
            "test_type": "karate/project",
            "content": {
                "type": "git-dir",
                "repository": { "uri": "https://github.com/org/repo", "branch": "main", "path": "api" }
            },
            "args": ["."],
            "variables": {
                "TOKEN": { "name": "TOKEN", "value": "abc", "type": "secret" }
            },
            "envs": { "KARATE_ENV": "staging" }
        }"#;

        let request = ExecutionRequest::from_json(json).unwrap();
        assert_eq!(request.test_type, TestType::Project);
        assert!(request.content.is_dir());
        assert_eq!(request.content.repository().unwrap().sub_path(), Some("api"));
        assert_eq!(request.args, vec!["."]);
        assert!(request.variables["TOKEN"].is_secret());
        assert_eq!(request.envs["KARATE_ENV"], "staging");
    }

    #[test]
    fn test_request_rejects_unknown_test_type() {
        let json = r#"{"test_type": "karate/unknown", "content": {"type": "string"}}"#;
        assert!(ExecutionRequest::from_json(json).is_err());
    }

    #[test]
    fn test_result_err_is_failed() {
        let result = ExecutionResult::err("boom");
        assert!(result.is_failed());
        assert_eq!(result.error_message.as_deref(), Some("boom"));
        assert!(result.steps.is_empty());
    }

    #[test]
    fn test_result_serialization_skips_missing_status() {
        let json = serde_json::to_value(ExecutionResult::default()).unwrap();
        assert!(json.get("status").is_none());
        assert_eq!(json["steps"], serde_json::json!([]));
    }
}
