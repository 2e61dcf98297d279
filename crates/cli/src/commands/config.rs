use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderdesk_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(
        key: &'static str,
        value: impl Into<String>,
        env_keys: &'static [&'static str],
    ) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }
    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let catalog = &config.catalog;
    let llm = &config.llm;

    vec![
        Field::new("database.url", &config.database.url, &["ORDERDESK_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["ORDERDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["ORDERDESK_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "session.store",
            format!("{:?}", config.session.store).to_lowercase(),
            &["ORDERDESK_SESSION_STORE"],
        ),
        Field::new(
            "session.ttl_secs",
            config.session.ttl_secs.to_string(),
            &["ORDERDESK_SESSION_TTL_SECS"],
        ),
        Field::new(
            "catalog.base_url",
            catalog.base_url.as_deref().unwrap_or("<unset>"),
            &["ORDERDESK_CATALOG_BASE_URL"],
        ),
        Field::new(
            "catalog.consumer_key",
            redact_secret(catalog.consumer_key.as_ref()),
            &["ORDERDESK_CATALOG_CONSUMER_KEY"],
        ),
        Field::new(
            "catalog.consumer_secret",
            redact_secret(catalog.consumer_secret.as_ref()),
            &["ORDERDESK_CATALOG_CONSUMER_SECRET"],
        ),
        Field::new(
            "catalog.snapshot_path",
            catalog
                .snapshot_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |path| path.display().to_string()),
            &["ORDERDESK_CATALOG_SNAPSHOT_PATH"],
        ),
        Field::new(
            "catalog.page_size",
            catalog.page_size.to_string(),
            &["ORDERDESK_CATALOG_PAGE_SIZE"],
        ),
        Field::new(
            "catalog.timeout_secs",
            catalog.timeout_secs.to_string(),
            &["ORDERDESK_CATALOG_TIMEOUT_SECS"],
        ),
        Field::new(
            "llm.api_key",
            redact_secret(llm.api_key.as_ref()),
            &["ORDERDESK_LLM_API_KEY", "OPENAI_API_KEY"],
        ),
        Field::new("llm.base_url", &llm.base_url, &["ORDERDESK_LLM_BASE_URL"]),
        Field::new("llm.model", &llm.model, &["ORDERDESK_LLM_MODEL"]),
        Field::new(
            "llm.timeout_secs",
            llm.timeout_secs.to_string(),
            &["ORDERDESK_LLM_TIMEOUT_SECS"],
        ),
        Field::new(
            "llm.temperature",
            llm.temperature.to_string(),
            &["ORDERDESK_LLM_TEMPERATURE"],
        ),
        Field::new("llm.max_tokens", llm.max_tokens.to_string(), &["ORDERDESK_LLM_MAX_TOKENS"]),
        Field::new(
            "server.bind_address",
            &config.server.bind_address,
            &["ORDERDESK_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["ORDERDESK_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["ORDERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "logging.level",
            &config.logging.level,
            &["ORDERDESK_LOGGING_LEVEL", "ORDERDESK_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["ORDERDESK_LOGGING_FORMAT", "ORDERDESK_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["orderdesk.toml", "config/orderdesk.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

/// Keeps a recognizable prefix such as `ck_` or `sk-` and hides the rest.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(|c: char| c == '_' || c == '-') {
        Some(index) if index > 0 && index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}
