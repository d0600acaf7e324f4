//! Karate Executor Common Library
//!
//! Execution model, error type, secret handling and the host output
//! protocol shared by the runner and the agent binary.

pub mod error;
pub mod output;
pub mod secret;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use output::{EventSink, JsonLineSink, OutputLine, TracingSink};
pub use secret::{EnvManager, SecretManager};
pub use types::*;

/// Executor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
