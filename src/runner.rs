use crate::client::CompletionClient;
use crate::config::Config;
use crate::models::PromptSummary;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// Full prompt sent for a prefix/prompt pair
pub fn compose_prompt(prefix: &str, prompt: &str) -> String {
    format!("{} {}", prefix, prompt).trim().to_string()
}

/// Create a directory and its parents; an existing directory is left as is
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Samples one prompt repeatedly and keeps each distinct response as a file
pub struct IterationRunner<'a, C> {
    client: &'a C,
    config: &'a Config,
    instructions: &'a [String],
}

impl<'a, C: CompletionClient> IterationRunner<'a, C> {
    pub fn new(client: &'a C, config: &'a Config, instructions: &'a [String]) -> Self {
        Self {
            client,
            config,
            instructions,
        }
    }

    /// Run every attempt for one prompt, writing unique responses under
    /// `test_folder/<prompt_index>/`. The first failed request aborts.
    pub async fn run(
        &self,
        test_folder: &Path,
        prefix: &str,
        prompt: &str,
        prompt_index: usize,
    ) -> Result<PromptSummary> {
        let prompt_folder = test_folder.join(prompt_index.to_string());
        ensure_directory_exists(&prompt_folder)?;

        let full_prompt = compose_prompt(prefix, prompt);
        let mut unique_responses = HashSet::new();
        let mut files = Vec::new();

        for attempt in 1..=self.config.iterations {
            let response = self
                .client
                .generate(self.instructions, &full_prompt)
                .await
                .with_context(|| {
                    format!(
                        "Request {}/{} failed for prompt {}",
                        attempt, self.config.iterations, prompt_index
                    )
                })?;

            if unique_responses.contains(&response) {
                debug!(prompt_index, attempt, "duplicate response discarded");
            } else {
                let path = self.write_response(&prompt_folder, &response)?;
                debug!(prompt_index, attempt, path = %path.display(), "saved unique response");
                files.push(path);
                unique_responses.insert(response);
            }

            sleep(self.config.sleep).await;
        }

        info!(
            prompt_index,
            attempts = self.config.iterations,
            unique = files.len(),
            "prompt completed"
        );

        Ok(PromptSummary {
            index: prompt_index,
            prompt: full_prompt,
            attempts: self.config.iterations,
            unique_responses: files.len(),
            directory: prompt_folder,
            files,
        })
    }

    /// Write a response to a freshly named file, never replacing an existing one
    fn write_response(&self, prompt_folder: &Path, response: &str) -> Result<PathBuf> {
        let path = prompt_folder.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.output_extension
        ));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Failed to create response file: {}", path.display()))?;
        file.write_all(response.as_bytes())
            .with_context(|| format!("Failed to write response to: {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::RequestError;
    use crate::config::test_config;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Replays scripted responses and records every prompt it receives
    pub(crate) struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, RequestError>>>,
        prompts: Mutex<Vec<String>>,
        pub(crate) instructions: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedClient {
        pub(crate) fn new(replies: Vec<Result<String, RequestError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                instructions: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl CompletionClient for ScriptedClient {
        async fn generate(
            &self,
            instructions: &[String],
            prompt: &str,
        ) -> Result<String, RequestError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.instructions.lock().unwrap().push(instructions.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RequestError::EmptyResponse))
        }
    }

    fn file_contents(dir: &Path) -> Vec<String> {
        let mut contents: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        contents
    }

    #[test]
    fn test_compose_prompt() {
        assert_eq!(compose_prompt("Using Tailwind,", "make a card"), "Using Tailwind, make a card");
        assert_eq!(compose_prompt("", "Make a button"), "Make a button");
        assert_eq!(compose_prompt("", "  Make a button  "), "Make a button");
        assert_eq!(compose_prompt("  Prefix ", "prompt\n"), "Prefix  prompt");
    }

    #[tokio::test]
    async fn test_duplicates_are_discarded() {
        let temp_dir = tempdir().unwrap();
        let config = test_config();
        let client = ScriptedClient::replying(&["A", "A", "B"]);
        let instructions = vec!["Be brief.".to_string()];
        let runner = IterationRunner::new(&client, &config, &instructions);

        let summary = runner
            .run(temp_dir.path(), "", "Make a button", 1)
            .await
            .unwrap();

        let prompt_dir = temp_dir.path().join("1");
        assert_eq!(file_contents(&prompt_dir), vec!["A", "B"]);
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.unique_responses, 2);
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.directory, prompt_dir);
    }

    #[tokio::test]
    async fn test_distinct_responses_all_saved() {
        let temp_dir = tempdir().unwrap();
        let config = test_config();
        let client = ScriptedClient::replying(&["A", "B", "C"]);
        let runner = IterationRunner::new(&client, &config, &[]);

        runner.run(temp_dir.path(), "", "p", 2).await.unwrap();

        assert_eq!(file_contents(&temp_dir.path().join("2")), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_files_use_configured_extension() {
        let temp_dir = tempdir().unwrap();
        let mut config = test_config();
        config.iterations = 1;
        config.output_extension = "jsx".to_string();
        let client = ScriptedClient::replying(&["<div/>"]);
        let runner = IterationRunner::new(&client, &config, &[]);

        let summary = runner.run(temp_dir.path(), "", "p", 1).await.unwrap();

        let path = &summary.files[0];
        assert_eq!(path.extension().unwrap(), "jsx");
        assert!(Uuid::parse_str(path.file_stem().unwrap().to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_every_attempt_sends_composed_prompt() {
        let temp_dir = tempdir().unwrap();
        let config = test_config();
        let client = ScriptedClient::replying(&["A", "B", "C"]);
        let instructions = vec!["One.".to_string(), "Two.".to_string()];
        let runner = IterationRunner::new(&client, &config, &instructions);

        runner
            .run(temp_dir.path(), "Using Tailwind,", "make a card", 1)
            .await
            .unwrap();

        assert_eq!(client.prompts(), vec!["Using Tailwind, make a card"; 3]);
        assert!(client
            .instructions
            .lock()
            .unwrap()
            .iter()
            .all(|sent| sent == &instructions));
    }

    #[test]
    fn test_ensure_directory_exists_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("T1").join("1");

        ensure_directory_exists(&nested).unwrap();
        fs::write(nested.join("kept.html"), "A").unwrap();
        ensure_directory_exists(&nested).unwrap();

        assert_eq!(file_contents(&nested), vec!["A"]);
    }

    #[test]
    fn test_ensure_directory_exists_reports_file_in_the_way() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("T1");
        fs::write(&blocker, "not a directory").unwrap();

        let err = ensure_directory_exists(&blocker.join("1")).unwrap_err();
        assert!(err.to_string().contains("Failed to create directory"));
    }

    #[tokio::test]
    async fn test_rerun_keeps_existing_files() {
        let temp_dir = tempdir().unwrap();
        let mut config = test_config();
        config.iterations = 2;
        let instructions = Vec::new();

        let first = ScriptedClient::replying(&["A", "B"]);
        IterationRunner::new(&first, &config, &instructions)
            .run(temp_dir.path(), "", "p", 1)
            .await
            .unwrap();

        let second = ScriptedClient::replying(&["A", "C"]);
        IterationRunner::new(&second, &config, &instructions)
            .run(temp_dir.path(), "", "p", 1)
            .await
            .unwrap();

        // The unique set does not outlive a run, so "A" is saved again.
        assert_eq!(file_contents(&temp_dir.path().join("1")), vec!["A", "A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failure_aborts_and_keeps_earlier_files() {
        let temp_dir = tempdir().unwrap();
        let config = test_config();
        let client = ScriptedClient::new(vec![
            Ok("A".to_string()),
            Err(RequestError::EmptyResponse),
            Ok("C".to_string()),
        ]);
        let runner = IterationRunner::new(&client, &config, &[]);

        let err = runner.run(temp_dir.path(), "", "p", 1).await.unwrap_err();

        assert!(err.downcast_ref::<RequestError>().is_some());
        assert_eq!(client.prompts().len(), 2);
        assert_eq!(file_contents(&temp_dir.path().join("1")), vec!["A"]);
    }
}
