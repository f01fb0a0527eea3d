use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use guardian_core::config::{describe_secret, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.into(), env_keys }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: overrides > GUARDIAN_* env > deployment env > file > default):"
            .to_string(),
    ];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let unset = || "<unset>".to_string();
    vec![
        field(
            "database.url",
            &config.database.url,
            &["GUARDIAN_DATABASE_URL", "DB_CONNECTION_STRING"],
        ),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["GUARDIAN_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["GUARDIAN_DATABASE_TIMEOUT_SECS"],
        ),
        field("llm.provider", config.llm.provider.as_str(), &["GUARDIAN_LLM_PROVIDER"]),
        field("llm.model", &config.llm.model, &["GUARDIAN_LLM_MODEL"]),
        field(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(unset),
            &["GUARDIAN_LLM_BASE_URL"],
        ),
        field(
            "llm.api_key",
            describe_secret(config.llm.api_key.as_ref()),
            &["GUARDIAN_LLM_API_KEY"],
        ),
        field(
            "weather.api_key",
            describe_secret(config.weather.api_key.as_ref()),
            &["GUARDIAN_WEATHER_API_KEY", "WEATHER_API_KEY"],
        ),
        field("weather.base_url", &config.weather.base_url, &["GUARDIAN_WEATHER_BASE_URL"]),
        field(
            "news.api_key",
            describe_secret(config.news.api_key.as_ref()),
            &["GUARDIAN_NEWS_API_KEY", "NEWS_API_KEY"],
        ),
        field("news.base_url", &config.news.base_url, &["GUARDIAN_NEWS_BASE_URL"]),
        field(
            "alerting.pubsub_topic",
            config.pubsub_topic_path().unwrap_or_else(unset),
            &["GUARDIAN_ALERTING_PUBSUB_TOPIC", "PUBSUB_TOPIC"],
        ),
        field(
            "alerting.pubsub_access_token",
            describe_secret(config.alerting.pubsub_access_token.as_ref()),
            &["GUARDIAN_ALERTING_PUBSUB_ACCESS_TOKEN"],
        ),
        field(
            "alerting.alert_email",
            config.alerting.alert_email.clone().unwrap_or_else(unset),
            &["ALERT_EMAIL"],
        ),
        field(
            "alerting.poll_interval_secs",
            config.alerting.poll_interval_secs.to_string(),
            &["GUARDIAN_ALERTING_POLL_INTERVAL_SECS"],
        ),
        field(
            "alerting.delay_threshold_days",
            config.alerting.delay_threshold_days.to_string(),
            &["GUARDIAN_ALERTING_DELAY_THRESHOLD_DAYS"],
        ),
        field(
            "alerting.poller_enabled",
            config.alerting.poller_enabled.to_string(),
            &["GUARDIAN_ALERTING_POLLER_ENABLED"],
        ),
        field(
            "cloud.project",
            config.cloud.project.clone().unwrap_or_else(unset),
            &["GOOGLE_CLOUD_PROJECT"],
        ),
        field("cloud.region", &config.cloud.region, &["GOOGLE_CLOUD_REGION"]),
        field(
            "server.bind_address",
            &config.server.bind_address,
            &["GUARDIAN_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["GUARDIAN_SERVER_PORT", "PORT"]),
        field(
            "logging.level",
            &config.logging.level,
            &["GUARDIAN_LOGGING_LEVEL", "GUARDIAN_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["GUARDIAN_LOGGING_FORMAT", "GUARDIAN_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("guardian.toml"), PathBuf::from("config/guardian.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
