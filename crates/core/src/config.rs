use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub news: NewsConfig,
    pub alerting: AlertingConfig,
    pub cloud: CloudConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct WeatherConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NewsConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AlertingConfig {
    pub pubsub_topic: Option<String>,
    pub pubsub_access_token: Option<SecretString>,
    pub pubsub_endpoint: String,
    pub alert_email: Option<String>,
    pub poll_interval_secs: u64,
    pub delay_threshold_days: u32,
    pub poller_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct CloudConfig {
    pub project: Option<String>,
    pub region: String,
    pub staging_bucket: Option<String>,
    pub agent_resource_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    None,
    Gemini,
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Gemini | Self::OpenAi | Self::Anthropic)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub weather_api_key: Option<String>,
    pub weather_base_url: Option<String>,
    pub news_api_key: Option<String>,
    pub news_base_url: Option<String>,
    pub pubsub_topic: Option<String>,
    pub pubsub_endpoint: Option<String>,
    pub server_port: Option<u16>,
    pub poller_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://guardian.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::None,
                api_key: None,
                base_url: None,
                model: "gemini-2.0-flash".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            weather: WeatherConfig {
                api_key: None,
                base_url: "https://api.openweathermap.org/data/2.5".to_string(),
                timeout_secs: 10,
            },
            news: NewsConfig {
                api_key: None,
                base_url: "https://newsapi.org/v2".to_string(),
                timeout_secs: 10,
            },
            alerting: AlertingConfig {
                pubsub_topic: None,
                pubsub_access_token: None,
                pubsub_endpoint: "https://pubsub.googleapis.com/v1".to_string(),
                alert_email: None,
                poll_interval_secs: 300,
                delay_threshold_days: 3,
                poller_enabled: true,
            },
            cloud: CloudConfig {
                project: None,
                region: "us-central1".to_string(),
                staging_bucket: None,
                agent_resource_name: None,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "disabled" => Ok(Self::None),
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected none|gemini|openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("guardian.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_deployment_env()?;
        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Fully qualified Pub/Sub topic path, or `None` when alert publishing is not configured.
    pub fn pubsub_topic_path(&self) -> Option<String> {
        let topic = self.alerting.pubsub_topic.as_deref()?.trim();
        if topic.is_empty() {
            return None;
        }
        if topic.starts_with("projects/") {
            return Some(topic.to_string());
        }
        let project = self.cloud.project.as_deref()?;
        Some(format!("projects/{project}/topics/{topic}"))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(weather) = patch.weather {
            if let Some(api_key) = weather.api_key {
                self.weather.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = weather.base_url {
                self.weather.base_url = base_url;
            }
            if let Some(timeout_secs) = weather.timeout_secs {
                self.weather.timeout_secs = timeout_secs;
            }
        }

        if let Some(news) = patch.news {
            if let Some(api_key) = news.api_key {
                self.news.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = news.base_url {
                self.news.base_url = base_url;
            }
            if let Some(timeout_secs) = news.timeout_secs {
                self.news.timeout_secs = timeout_secs;
            }
        }

        if let Some(alerting) = patch.alerting {
            if let Some(topic) = alerting.pubsub_topic {
                self.alerting.pubsub_topic = Some(topic);
            }
            if let Some(token) = alerting.pubsub_access_token {
                self.alerting.pubsub_access_token = Some(secret_value(token));
            }
            if let Some(endpoint) = alerting.pubsub_endpoint {
                self.alerting.pubsub_endpoint = endpoint;
            }
            if let Some(alert_email) = alerting.alert_email {
                self.alerting.alert_email = Some(alert_email);
            }
            if let Some(poll_interval_secs) = alerting.poll_interval_secs {
                self.alerting.poll_interval_secs = poll_interval_secs;
            }
            if let Some(delay_threshold_days) = alerting.delay_threshold_days {
                self.alerting.delay_threshold_days = delay_threshold_days;
            }
            if let Some(poller_enabled) = alerting.poller_enabled {
                self.alerting.poller_enabled = poller_enabled;
            }
        }

        if let Some(cloud) = patch.cloud {
            if let Some(project) = cloud.project {
                self.cloud.project = Some(project);
            }
            if let Some(region) = cloud.region {
                self.cloud.region = region;
            }
            if let Some(staging_bucket) = cloud.staging_bucket {
                self.cloud.staging_bucket = Some(staging_bucket);
            }
            if let Some(agent_resource_name) = cloud.agent_resource_name {
                self.cloud.agent_resource_name = Some(agent_resource_name);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    /// Unprefixed variables used by container and cloud deployments.
    fn apply_deployment_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DB_CONNECTION_STRING") {
            self.database.url = value;
        }
        if let Some(value) = read_env("WEATHER_API_KEY") {
            self.weather.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("NEWS_API_KEY") {
            self.news.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PUBSUB_TOPIC") {
            self.alerting.pubsub_topic = Some(value);
        }
        if let Some(value) = read_env("ALERT_EMAIL") {
            self.alerting.alert_email = Some(value);
        }
        if let Some(value) = read_env("GOOGLE_CLOUD_PROJECT") {
            self.cloud.project = Some(value);
        }
        if let Some(value) = read_env("GOOGLE_CLOUD_REGION") {
            self.cloud.region = value;
        }
        if let Some(value) = read_env("STAGING_BUCKET") {
            self.cloud.staging_bucket = Some(value);
        }
        if let Some(value) = read_env("AGENT_RESOURCE_NAME") {
            self.cloud.agent_resource_name = Some(value);
        }
        if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GUARDIAN_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("GUARDIAN_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("GUARDIAN_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("GUARDIAN_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("GUARDIAN_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GUARDIAN_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("GUARDIAN_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("GUARDIAN_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("GUARDIAN_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("GUARDIAN_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("GUARDIAN_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("GUARDIAN_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("GUARDIAN_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("GUARDIAN_WEATHER_API_KEY") {
            self.weather.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("GUARDIAN_WEATHER_BASE_URL") {
            self.weather.base_url = value;
        }
        if let Some(value) = read_env("GUARDIAN_NEWS_API_KEY") {
            self.news.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("GUARDIAN_NEWS_BASE_URL") {
            self.news.base_url = value;
        }

        if let Some(value) = read_env("GUARDIAN_ALERTING_PUBSUB_TOPIC") {
            self.alerting.pubsub_topic = Some(value);
        }
        if let Some(value) = read_env("GUARDIAN_ALERTING_PUBSUB_ACCESS_TOKEN") {
            self.alerting.pubsub_access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("GUARDIAN_ALERTING_POLL_INTERVAL_SECS") {
            self.alerting.poll_interval_secs =
                parse_u64("GUARDIAN_ALERTING_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("GUARDIAN_ALERTING_DELAY_THRESHOLD_DAYS") {
            self.alerting.delay_threshold_days =
                parse_u32("GUARDIAN_ALERTING_DELAY_THRESHOLD_DAYS", &value)?;
        }
        if let Some(value) = read_env("GUARDIAN_ALERTING_POLLER_ENABLED") {
            self.alerting.poller_enabled =
                parse_bool("GUARDIAN_ALERTING_POLLER_ENABLED", &value)?;
        }

        if let Some(value) = read_env("GUARDIAN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GUARDIAN_SERVER_PORT") {
            self.server.port = parse_u16("GUARDIAN_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("GUARDIAN_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("GUARDIAN_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("GUARDIAN_LOGGING_LEVEL").or_else(|| read_env("GUARDIAN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GUARDIAN_LOGGING_FORMAT").or_else(|| read_env("GUARDIAN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(weather_api_key) = overrides.weather_api_key {
            self.weather.api_key = Some(secret_value(weather_api_key));
        }
        if let Some(weather_base_url) = overrides.weather_base_url {
            self.weather.base_url = weather_base_url;
        }
        if let Some(news_api_key) = overrides.news_api_key {
            self.news.api_key = Some(secret_value(news_api_key));
        }
        if let Some(news_base_url) = overrides.news_base_url {
            self.news.base_url = news_base_url;
        }
        if let Some(pubsub_topic) = overrides.pubsub_topic {
            self.alerting.pubsub_topic = Some(pubsub_topic);
        }
        if let Some(pubsub_endpoint) = overrides.pubsub_endpoint {
            self.alerting.pubsub_endpoint = pubsub_endpoint;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(poller_enabled) = overrides.poller_enabled {
            self.alerting.poller_enabled = poller_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_http_source("weather", &self.weather.base_url, self.weather.timeout_secs)?;
        validate_http_source("news", &self.news.base_url, self.news.timeout_secs)?;
        validate_alerting(&self.alerting)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("guardian.toml"), PathBuf::from("config/guardian.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.provider != LlmProvider::None && llm.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.model must be set when an llm provider is configured".to_string(),
        ));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_http_source(section: &str, base_url: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{section}.base_url must start with http:// or https://"
        )));
    }

    if timeout_secs == 0 || timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=120"
        )));
    }

    Ok(())
}

fn validate_alerting(alerting: &AlertingConfig) -> Result<(), ConfigError> {
    if alerting.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "alerting.poll_interval_secs must be greater than zero".to_string(),
        ));
    }

    if !alerting.pubsub_endpoint.starts_with("http://")
        && !alerting.pubsub_endpoint.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "alerting.pubsub_endpoint must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Redacted view of an optional secret for operator output.
pub fn describe_secret(secret: Option<&SecretString>) -> &'static str {
    match secret {
        Some(value) if !value.expose_secret().trim().is_empty() => "set (redacted)",
        _ => "unset",
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    weather: Option<HttpSourcePatch>,
    news: Option<HttpSourcePatch>,
    alerting: Option<AlertingPatch>,
    cloud: Option<CloudPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpSourcePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertingPatch {
    pubsub_topic: Option<String>,
    pubsub_access_token: Option<String>,
    pubsub_endpoint: Option<String>,
    alert_email: Option<String>,
    poll_interval_secs: Option<u64>,
    delay_threshold_days: Option<u32>,
    poller_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CloudPatch {
    project: Option<String>,
    region: Option<String>,
    staging_bucket: Option<String>,
    agent_resource_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const TOUCHED_VARS: &[&str] = &[
        "DB_CONNECTION_STRING",
        "WEATHER_API_KEY",
        "NEWS_API_KEY",
        "PUBSUB_TOPIC",
        "GOOGLE_CLOUD_PROJECT",
        "PORT",
        "GUARDIAN_DATABASE_URL",
        "GUARDIAN_WEATHER_API_KEY",
        "GUARDIAN_LOG_LEVEL",
        "GUARDIAN_LOG_FORMAT",
        "GUARDIAN_SERVER_PORT",
        "GUARDIAN_ALERTING_POLL_INTERVAL_SECS",
        "TEST_GUARDIAN_WEATHER_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_any_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.provider == LlmProvider::None, "default provider should be none")?;
        ensure(config.weather.api_key.is_none(), "weather key should be unset by default")?;
        ensure(config.news.api_key.is_none(), "news key should be unset by default")?;
        ensure(config.server.port == 8080, "container contract port should be 8080")?;
        ensure(config.server.bind_address == "0.0.0.0", "server should bind all interfaces")?;
        ensure(config.pubsub_topic_path().is_none(), "pubsub should be unconfigured")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);
        env::set_var("TEST_GUARDIAN_WEATHER_KEY", "owm-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("guardian.toml");
            fs::write(
                &path,
                r#"
[weather]
api_key = "${TEST_GUARDIAN_WEATHER_KEY}"

[alerting]
poll_interval_secs = 60
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.weather.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(key.as_deref() == Some("owm-from-env"), "weather key should be interpolated")?;
            ensure(config.alerting.poll_interval_secs == 60, "poll interval should come from file")
        })();

        clear_vars(TOUCHED_VARS);
        result
    }

    #[test]
    fn deployment_variables_map_onto_sections() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        env::set_var("DB_CONNECTION_STRING", "sqlite://from-deploy.db");
        env::set_var("PUBSUB_TOPIC", "inventory-alerts");
        env::set_var("GOOGLE_CLOUD_PROJECT", "guardian-prod");
        env::set_var("PORT", "9090");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.database.url == "sqlite://from-deploy.db", "database url from env")?;
            ensure(config.server.port == 9090, "PORT should override server port")?;
            ensure(
                config.pubsub_topic_path().as_deref()
                    == Some("projects/guardian-prod/topics/inventory-alerts"),
                "short topic names should be qualified with the project",
            )
        })();

        clear_vars(TOUCHED_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        env::set_var("GUARDIAN_LOG_LEVEL", "warn");
        env::set_var("GUARDIAN_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(TOUCHED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        env::set_var("DB_CONNECTION_STRING", "sqlite://from-deploy.db");
        env::set_var("GUARDIAN_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("GUARDIAN_SERVER_PORT", "7070");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("guardian.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 6060

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-env.db",
                "namespaced env should win over deployment env and file",
            )?;
            ensure(config.server.port == 7070, "namespaced env port should win over file")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(TOUCHED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        env::set_var("GUARDIAN_ALERTING_POLL_INTERVAL_SECS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("alerting.poll_interval_secs")
            );
            ensure(has_message, "validation failure should mention alerting.poll_interval_secs")
        })();

        clear_vars(TOUCHED_VARS);
        result
    }

    #[test]
    fn non_sqlite_connection_strings_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgresql://user@localhost/guardian".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("database.url")),
            "postgres url should fail database validation",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(TOUCHED_VARS);

        env::set_var("WEATHER_API_KEY", "owm-secret-value");
        env::set_var("NEWS_API_KEY", "news-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("owm-secret-value"), "debug output should not contain weather key")?;
            ensure(!debug.contains("news-secret-value"), "debug output should not contain news key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(TOUCHED_VARS);
        result
    }
}
