//! Variable resolution and secret masking
//!
//! Secret variables arrive without their value in most setups; the host
//! mounts the value into the executor's environment as
//! `RUNNER_SECRET_VAR_<NAME>`. The manager takes one snapshot of those
//! values when it is built and never touches the process environment
//! afterwards.

use std::collections::BTreeMap;

use crate::types::Variable;

/// Prefix of environment variables carrying secret values
pub const SECRET_VAR_PREFIX: &str = "RUNNER_SECRET_VAR_";

/// Replacement written over secret values in captured output
pub const MASK: &str = "********";

/// Resolves execution variables and masks secrets in tool output
pub trait SecretManager {
    /// Resolve every variable to the value the tool should see
    fn collect_vars(&self, variables: &BTreeMap<String, Variable>) -> BTreeMap<String, String>;

    /// Mask secret values in captured output
    fn obfuscate(&self, output: &[u8]) -> Vec<u8>;
}

/// Secret manager backed by a snapshot of the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    /// Secret values keyed by variable name
    secrets: BTreeMap<String, String>,
}

impl EnvManager {
    /// Build from the request's variables, reading secret values from the
    /// process environment
    pub fn with_vars(variables: &BTreeMap<String, Variable>) -> Self {
        Self::with_lookup(variables, |key| std::env::var(key).ok())
    }

    /// Build from the request's variables with a custom environment lookup
    pub fn with_lookup<F>(variables: &BTreeMap<String, Variable>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = variables
            .values()
            .filter(|var| var.is_secret())
            .map(|var| {
                let value = lookup(&format!("{}{}", SECRET_VAR_PREFIX, var.name))
                    .unwrap_or_else(|| var.value.clone());
                (var.name.clone(), value)
            })
            .collect();

        Self { secrets }
    }

    /// Number of secret values this manager masks
    pub fn secret_count(&self) -> usize {
        self.secrets.values().filter(|v| !v.is_empty()).count()
    }
}

impl SecretManager for EnvManager {
    fn collect_vars(&self, variables: &BTreeMap<String, Variable>) -> BTreeMap<String, String> {
        variables
            .values()
            .map(|var| {
                let value = if var.is_secret() {
                    self.secrets.get(&var.name).cloned().unwrap_or_default()
                } else {
                    var.value.clone()
                };
                (var.name.clone(), value)
            })
            .collect()
    }

    fn obfuscate(&self, output: &[u8]) -> Vec<u8> {
        let mut masked = output.to_vec();

        // Longest first so a secret containing another is masked whole
        let mut values: Vec<&str> = self
            .secrets
            .values()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        values.sort_by(|a, b| b.len().cmp(&a.len()));

        for value in values {
            masked = replace_all(&masked, value.as_bytes(), MASK.as_bytes());
        }

        masked
    }
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;

    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }

    out.extend_from_slice(rest);
    out
}
