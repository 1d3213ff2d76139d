use std::time::Duration;

use async_openai::{
    Client,
    config::AzureConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use backoff::ExponentialBackoffBuilder;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to build completion request: {0}")]
    Build(#[source] OpenAIError),
    #[error("completion request failed: {0}")]
    Api(#[source] OpenAIError),
    #[error("completion response contained no message content")]
    EmptyResponse,
}

/// One request/response exchange with a text-generation service
pub trait CompletionClient {
    /// Send `instructions` as the system message and `prompt` as the user
    /// message, returning the generated text untouched.
    async fn generate(&self, instructions: &[String], prompt: &str) -> Result<String, RequestError>;
}

/// Completion client for an Azure OpenAI chat deployment
pub struct AzureCompletionClient {
    client: Client<AzureConfig>,
    config: Config,
}

impl AzureCompletionClient {
    pub fn new(config: Config) -> Result<Self, RequestError> {
        let azure_config = AzureConfig::new()
            .with_api_base(&config.api_base)
            .with_api_key(&config.api_key)
            .with_deployment_id(&config.deployment)
            .with_api_version(&config.api_version);

        let http_client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RequestError::Build(OpenAIError::Reqwest(e)))?;

        // A failed request ends the run, so the library's own retries are off.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        let client = Client::with_config(azure_config)
            .with_http_client(http_client)
            .with_backoff(no_retry);

        Ok(Self { client, config })
    }
}

impl CompletionClient for AzureCompletionClient {
    async fn generate(&self, instructions: &[String], prompt: &str) -> Result<String, RequestError> {
        debug!(prompt, "sending prompt");

        let request = build_request(&self.config, instructions, prompt).map_err(RequestError::Build)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(RequestError::Api)?;
        let content = extract_content(response)?;

        debug!(response = %content, "received response");
        Ok(content)
    }
}

/// Build the chat completion request for one attempt
pub fn build_request(
    config: &Config,
    instructions: &[String],
    prompt: &str,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let system_message = ChatCompletionRequestSystemMessageArgs::default()
        .content(instructions.join(" "))
        .build()?
        .into();

    let user_message = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt.to_string())
        .build()?
        .into();

    CreateChatCompletionRequestArgs::default()
        .model(&config.deployment)
        .messages([system_message, user_message])
        .temperature(config.temperature)
        .top_p(config.top_p)
        .max_tokens(config.max_tokens)
        .frequency_penalty(0.0)
        .presence_penalty(0.0)
        .stream(false)
        .build()
}

/// Text of the first choice, verbatim
fn extract_content(response: CreateChatCompletionResponse) -> Result<String, RequestError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(RequestError::EmptyResponse)
}
