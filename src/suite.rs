use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// System instructions sent with every prompt unless the suite overrides them
pub const DEFAULT_INSTRUCTIONS: [&str; 4] = [
    "You are an AI programming assistant.",
    "You return only code snippets with NO OTHER TEXT, code fences, etc.",
    "Assume your responses will be used in a code editor within an existing HTML document.",
    "You may include inline CSS or JavaScript, but only as much as absolutely necessary.",
];

#[derive(Debug, Error)]
pub enum SuiteFormatError {
    #[error("failed to read test suite {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed test suite: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("test {index} has an unusable title {title:?}: {reason}")]
    InvalidTitle {
        index: usize,
        title: String,
        reason: &'static str,
    },
}

/// A named group of prompts sharing an optional prefix
#[derive(Debug, Clone, Deserialize)]
pub struct TestGroup {
    /// Used verbatim as the output directory name
    pub title: String,
    #[serde(default)]
    pub prefix: String,
    pub prompts: Vec<String>,
}

/// Root of the test suite document
#[derive(Debug, Clone, Deserialize)]
pub struct TestSuite {
    pub tests: Vec<TestGroup>,
    /// Replaces the built-in system instructions when present
    #[serde(default)]
    pub instructions: Option<Vec<String>>,
}

impl TestSuite {
    /// Load and validate a test suite from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, SuiteFormatError> {
        let content = std::fs::read_to_string(path).map_err(|source| SuiteFormatError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SuiteFormatError> {
        let suite: TestSuite = serde_json::from_str(content)?;
        for (index, group) in suite.tests.iter().enumerate() {
            check_title(&group.title).map_err(|reason| SuiteFormatError::InvalidTitle {
                index: index + 1,
                title: group.title.clone(),
                reason,
            })?;
        }
        Ok(suite)
    }

    /// Instructions to send as the system message
    pub fn instructions(&self) -> Vec<String> {
        match &self.instructions {
            Some(instructions) => instructions.clone(),
            None => DEFAULT_INSTRUCTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Titles become a single directory component under the output root.
fn check_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("title is empty");
    }
    if title == "." || title == ".." {
        return Err("title is a relative path component");
    }
    if title.contains(['/', '\\', '\0']) {
        return Err("title contains a path separator");
    }
    Ok(())
}
