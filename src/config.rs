use std::env;
use std::time::Duration;
use thiserror::Error;

/// Summarization endpoint used when `HF_API_URL` is not set.
pub const DEFAULT_HF_API_URL: &str =
    "https://api-inference.huggingface.co/models/google/pegasus-xsum";
/// Default word budget per chunk.
pub const DEFAULT_CHUNK_MAX_WORDS: usize = 700;
const DEFAULT_SUMMARY_MAX_LENGTH: u32 = 150;
const DEFAULT_SUMMARY_MIN_LENGTH: u32 = 70;
const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docsum server and CLI.
///
/// Built once at start-up and handed to the components that need it; nothing reads the
/// environment after that.
#[derive(Clone)]
pub struct Config {
    /// Bearer credential sent to the summarization endpoint.
    pub hf_api_token: String,
    /// Full URL of the hosted summarization model.
    pub hf_api_url: String,
    /// Maximum number of whitespace-delimited words per chunk.
    pub chunk_max_words: usize,
    /// Upper bound on generated summary length, in model tokens.
    pub summary_max_length: u32,
    /// Lower bound on generated summary length, in model tokens.
    pub summary_min_length: u32,
    /// Deadline for a single summarization request.
    pub summary_timeout: Duration,
    /// Number of chunks of one document summarized concurrently.
    pub summary_concurrency: usize,
    /// Deadline for text extraction of a single upload.
    pub extraction_timeout: Duration,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Report failures with HTTP error statuses instead of `200 OK` plus an `error` field.
    pub strict_status_codes: bool,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("hf_api_token", &"<redacted>")
            .field("hf_api_url", &self.hf_api_url)
            .field("chunk_max_words", &self.chunk_max_words)
            .field("summary_max_length", &self.summary_max_length)
            .field("summary_min_length", &self.summary_min_length)
            .field("summary_timeout", &self.summary_timeout)
            .field("summary_concurrency", &self.summary_concurrency)
            .field("extraction_timeout", &self.extraction_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("strict_status_codes", &self.strict_status_codes)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let config = Self {
            hf_api_token: vars.required("HUGGINGFACE_API_TOKEN")?,
            hf_api_url: vars
                .optional("HF_API_URL")
                .unwrap_or_else(|| DEFAULT_HF_API_URL.to_string()),
            chunk_max_words: vars
                .parsed("CHUNK_MAX_WORDS")?
                .unwrap_or(DEFAULT_CHUNK_MAX_WORDS),
            summary_max_length: vars
                .parsed("SUMMARY_MAX_LENGTH")?
                .unwrap_or(DEFAULT_SUMMARY_MAX_LENGTH),
            summary_min_length: vars
                .parsed("SUMMARY_MIN_LENGTH")?
                .unwrap_or(DEFAULT_SUMMARY_MIN_LENGTH),
            summary_timeout: Duration::from_secs(
                vars.parsed("SUMMARY_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_SUMMARY_TIMEOUT_SECS),
            ),
            summary_concurrency: vars.parsed("SUMMARY_CONCURRENCY")?.unwrap_or(1),
            extraction_timeout: Duration::from_secs(
                vars.parsed("EXTRACTION_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_EXTRACTION_TIMEOUT_SECS),
            ),
            max_upload_bytes: vars
                .parsed("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            strict_status_codes: vars
                .optional("STRICT_STATUS_CODES")
                .map(|value| parse_flag(&value, "STRICT_STATUS_CODES"))
                .transpose()?
                .unwrap_or(false),
            server_port: vars.parsed("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_max_words == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_MAX_WORDS".into()));
        }
        if self.summary_concurrency == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONCURRENCY".into()));
        }
        if self.summary_min_length > self.summary_max_length {
            return Err(ConfigError::InvalidValue("SUMMARY_MIN_LENGTH".into()));
        }
        if self.summary_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("SUMMARY_TIMEOUT_SECS".into()));
        }
        if self.extraction_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("EXTRACTION_TIMEOUT_SECS".into()));
        }
        Ok(())
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }
}

fn parse_flag(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Load `.env` (if present) and build the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        hf_api_url = %config.hf_api_url,
        chunk_max_words = config.chunk_max_words,
        summary_concurrency = config.summary_concurrency,
        strict_status_codes = config.strict_status_codes,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
