use crate::client::CompletionClient;
use crate::config::Config;
use crate::models::{GroupSummary, RunSummary};
use crate::runner::{IterationRunner, ensure_directory_exists};
use crate::suite::{TestGroup, TestSuite};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Runs every prompt of a test suite, one after another
pub struct SuiteDriver<C> {
    client: C,
    config: Config,
    output_root: PathBuf,
}

impl<C: CompletionClient> SuiteDriver<C> {
    pub fn new(client: C, config: Config, output_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            config,
            output_root: output_root.into(),
        }
    }

    /// Run all test groups in document order. Stops at the first failure;
    /// files already written stay in place.
    pub async fn run_all(&self, suite: &TestSuite) -> Result<RunSummary> {
        let instructions = suite.instructions();
        let runner = IterationRunner::new(&self.client, &self.config, &instructions);
        let total_groups = suite.tests.len();
        let mut summary = RunSummary::default();

        for (group_index, group) in suite.tests.iter().enumerate() {
            info!(
                title = %group.title,
                group = group_index + 1,
                total = total_groups,
                "running test group"
            );
            let group_summary = self
                .run_group(&runner, group)
                .await
                .with_context(|| format!("Test group {:?} failed", group.title))?;
            summary.groups.push(group_summary);
        }

        Ok(summary)
    }

    async fn run_group(
        &self,
        runner: &IterationRunner<'_, C>,
        group: &TestGroup,
    ) -> Result<GroupSummary> {
        let test_folder = self.output_root.join(&group.title);
        ensure_directory_exists(&test_folder)?;

        let total_prompts = group.prompts.len();
        let mut prompts = Vec::with_capacity(total_prompts);

        for (position, prompt) in group.prompts.iter().enumerate() {
            let prompt_index = position + 1;
            info!(
                title = %group.title,
                prompt = prompt_index,
                total = total_prompts,
                "processing prompt"
            );
            let prompt_summary = runner
                .run(&test_folder, &group.prefix, prompt, prompt_index)
                .await?;
            prompts.push(prompt_summary);
        }

        Ok(GroupSummary {
            title: group.title.clone(),
            directory: test_folder,
            prompts,
        })
    }
}
