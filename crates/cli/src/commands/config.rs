use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use concierge_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One reported setting: its dotted path, the environment keys that can set
/// it (first match wins), and the rendered effective value.
struct Field {
    path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(path: &'static str, env_keys: &'static [&'static str], value: impl ToString) -> Self {
        Self { path, env_keys, value: value.to_string() }
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let file_path = options.config_path.clone().or_else(detect_config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields(&config) {
        let source = if field.path == "database.url" && options.overrides.database_url.is_some() {
            "flag (--database-url)".to_string()
        } else {
            field_source(&field, file_doc.as_ref(), file_path.as_deref())
        };
        lines.push(render_line(field.path, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let optional = |value: Option<&str>| value.unwrap_or("<unset>").to_string();

    vec![
        Field::new("database.url", &["CONCIERGE_DATABASE_URL"], &config.database.url),
        Field::new(
            "database.max_connections",
            &["CONCIERGE_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections,
        ),
        Field::new(
            "database.timeout_secs",
            &["CONCIERGE_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs,
        ),
        Field::new(
            "llm.provider",
            &["CONCIERGE_LLM_PROVIDER"],
            format!("{:?}", config.llm.provider),
        ),
        Field::new("llm.model", &["CONCIERGE_LLM_MODEL"], &config.llm.model),
        Field::new(
            "llm.base_url",
            &["CONCIERGE_LLM_BASE_URL"],
            optional(config.llm.base_url.as_deref()),
        ),
        Field::new(
            "llm.api_key",
            &["CONCIERGE_LLM_API_KEY", "GEMINI_API_KEY"],
            redact_key(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
        ),
        Field::new("llm.timeout_secs", &["CONCIERGE_LLM_TIMEOUT_SECS"], config.llm.timeout_secs),
        Field::new("llm.max_retries", &["CONCIERGE_LLM_MAX_RETRIES"], config.llm.max_retries),
        Field::new("llm.temperature", &["CONCIERGE_LLM_TEMPERATURE"], config.llm.temperature),
        Field::new(
            "llm.max_output_tokens",
            &["CONCIERGE_LLM_MAX_OUTPUT_TOKENS"],
            config.llm.max_output_tokens,
        ),
        Field::new(
            "server.bind_address",
            &["CONCIERGE_SERVER_BIND_ADDRESS"],
            &config.server.bind_address,
        ),
        Field::new("server.port", &["CONCIERGE_SERVER_PORT"], config.server.port),
        Field::new(
            "server.graceful_shutdown_secs",
            &["CONCIERGE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs,
        ),
        Field::new("chat.resort_name", &["CONCIERGE_CHAT_RESORT_NAME"], &config.chat.resort_name),
        Field::new(
            "chat.context_lines",
            &["CONCIERGE_CHAT_CONTEXT_LINES"],
            config.chat.context_lines,
        ),
        Field::new("chat.gateway", &["CONCIERGE_CHAT_GATEWAY"], format!("{:?}", config.chat.gateway)),
        Field::new(
            "chat.gateway_base_url",
            &["CONCIERGE_CHAT_GATEWAY_BASE_URL"],
            optional(config.chat.gateway_base_url.as_deref()),
        ),
        Field::new(
            "chat.bookings_enabled",
            &["CONCIERGE_CHAT_BOOKINGS_ENABLED"],
            config.chat.bookings_enabled,
        ),
        Field::new(
            "logging.level",
            &["CONCIERGE_LOGGING_LEVEL", "CONCIERGE_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["CONCIERGE_LOGGING_FORMAT", "CONCIERGE_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let from_env = field
        .env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(key) = from_env {
        return format!("env ({key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, field.path)) {
        let file = file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters so operators can tell keys apart.
fn redact_key(key: Option<&str>) -> String {
    let Some(key) = key.map(str::trim) else {
        return "<unset>".to_string();
    };
    if key.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
