use serde::Serialize;
use std::path::PathBuf;

/// Outcome of sampling a single prompt
#[derive(Debug, Clone, Serialize)]
pub struct PromptSummary {
    /// 1-based position of the prompt within its test group
    pub index: usize,
    /// Prompt as sent, prefix included
    pub prompt: String,
    /// Number of requests made
    pub attempts: u32,
    /// Number of distinct responses saved
    pub unique_responses: usize,
    /// Directory holding the saved responses
    pub directory: PathBuf,
    /// Files written during this run
    pub files: Vec<PathBuf>,
}

/// Outcome of one test group
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub title: String,
    pub directory: PathBuf,
    pub prompts: Vec<PromptSummary>,
}

/// Outcome of a full suite run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub groups: Vec<GroupSummary>,
}

impl RunSummary {
    /// Total number of response files written
    pub fn total_files(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.prompts)
            .map(|prompt| prompt.files.len())
            .sum()
    }
}
