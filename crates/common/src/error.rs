//! Error types for the Karate executor

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the executor Error
pub type Result<T> = std::result::Result<T, Error>;

/// Executor error types
///
/// Only configuration problems and tool launch failures surface here.
/// Test failures and unsupported requests are reported on the
/// [`ExecutionResult`](crate::ExecutionResult) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid test type: {0}")]
    InvalidTestType(String),

    #[error("Data directory does not exist: {}", .0.display())]
    DataDirMissing(PathBuf),

    #[error("Failed to run {program}: {reason}")]
    ToolFailed { program: String, reason: String },
}
