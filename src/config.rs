use std::collections::HashMap;
use std::env::VarError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const API_BASE: &str = "AZURE_OPENAI_API_BASE";
pub const API_MODEL: &str = "AZURE_OPENAI_API_MODEL";
pub const API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ITERATIONS_PER_PROMPT: &str = "ITERATIONS_PER_PROMPT";
pub const TEMPERATURE: &str = "TEMPERATURE";
pub const TOP_P: &str = "TOP_P";
pub const MAX_TOKENS: &str = "MAX_TOKENS";
pub const SLEEP_TIME: &str = "SLEEP_TIME";
pub const OUTPUT_EXTENSION: &str = "OUTPUT_EXTENSION";

/// Every setting a run needs, in the order they are reported when missing.
pub const REQUIRED_KEYS: [&str; 10] = [
    API_BASE,
    API_MODEL,
    API_VERSION,
    API_KEY,
    ITERATIONS_PER_PROMPT,
    TEMPERATURE,
    TOP_P,
    MAX_TOKENS,
    SLEEP_TIME,
    OUTPUT_EXTENSION,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read settings file {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Settings for a whole run, resolved once at startup
#[derive(Clone)]
pub struct Config {
    /// Azure OpenAI resource address, without a trailing slash
    pub api_base: String,
    /// Deployment (model) identifier
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
    /// Generation attempts per prompt
    pub iterations: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u16,
    /// Pause after every attempt
    pub sleep: Duration,
    /// File extension for saved responses, without the leading dot
    pub output_extension: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .field("iterations", &self.iterations)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("sleep", &self.sleep)
            .field("output_extension", &self.output_extension)
            .finish()
    }
}

impl Config {
    /// Load settings from a dotenv file, with process environment variables
    /// taking precedence. A missing file is fine as long as the environment
    /// supplies every key.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let mut settings = read_env_file(env_file)?;
        apply_env_overrides(&mut settings, |key| std::env::var(key))?;
        Self::from_settings(&settings)
    }

    /// Build a configuration from raw key/value settings. Either every key
    /// parses or nothing is returned.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let iterations: u32 = parse(settings, ITERATIONS_PER_PROMPT)?;
        if iterations == 0 {
            return Err(invalid(settings, ITERATIONS_PER_PROMPT, "must be at least 1"));
        }

        let max_tokens: u16 = parse(settings, MAX_TOKENS)?;
        if max_tokens == 0 {
            return Err(invalid(settings, MAX_TOKENS, "must be at least 1"));
        }

        let sleep_secs: f64 = parse(settings, SLEEP_TIME)?;
        let sleep = Duration::try_from_secs_f64(sleep_secs).map_err(|e| {
            invalid(
                settings,
                SLEEP_TIME,
                &format!("must be a non-negative number of seconds ({e})"),
            )
        })?;

        let output_extension = required(settings, OUTPUT_EXTENSION)?
            .trim()
            .trim_start_matches('.')
            .to_string();
        if output_extension.is_empty() {
            return Err(invalid(settings, OUTPUT_EXTENSION, "must not be empty"));
        }

        Ok(Self {
            api_base: required(settings, API_BASE)?.trim_end_matches('/').to_string(),
            deployment: required(settings, API_MODEL)?.to_string(),
            api_version: required(settings, API_VERSION)?.to_string(),
            api_key: required(settings, API_KEY)?.to_string(),
            iterations,
            temperature: parse(settings, TEMPERATURE)?,
            top_p: parse(settings, TOP_P)?,
            max_tokens,
            sleep,
            output_extension,
        })
    }

    /// Full chat-completions URL for the configured deployment
    pub fn endpoint(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.api_base, self.deployment, self.api_version
        )
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let source_error = |source: dotenvy::Error| ConfigError::Source {
        path: path.to_path_buf(),
        source,
    };

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HashMap::new());
        }
        Err(e) => return Err(source_error(e)),
    };

    entries
        .map(|entry| entry.map_err(source_error))
        .collect()
}

/// Overlay environment values onto the file settings. A variable that is set
/// but not valid UTF-8 is an error rather than a silent fallback.
fn apply_env_overrides(
    settings: &mut HashMap<String, String>,
    lookup: impl Fn(&str) -> Result<String, VarError>,
) -> Result<(), ConfigError> {
    for key in REQUIRED_KEYS {
        match lookup(key) {
            Ok(value) => {
                settings.insert(key.to_string(), value);
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(raw)) => {
                return Err(ConfigError::Invalid {
                    key,
                    value: raw.to_string_lossy().into_owned(),
                    reason: "environment value is not valid UTF-8".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn required<'a>(
    settings: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    settings
        .get(key)
        .map(String::as_str)
        .ok_or(ConfigError::Missing(key))
}

fn parse<T>(settings: &HashMap<String, String>, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = required(settings, key)?;
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(settings: &HashMap<String, String>, key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: settings.get(key).cloned().unwrap_or_default(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_base: "https://example.openai.azure.com".to_string(),
        deployment: "gpt-test".to_string(),
        api_version: "2024-02-01".to_string(),
        api_key: "test-key".to_string(),
        iterations: 3,
        temperature: 0.7,
        top_p: 0.95,
        max_tokens: 800,
        sleep: Duration::ZERO,
        output_extension: "html".to_string(),
    }
}
