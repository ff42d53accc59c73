use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use partflow_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: &str| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, "PARTFLOW_DATABASE_URL");
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        "PARTFLOW_DATABASE_MAX_CONNECTIONS",
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        "PARTFLOW_DATABASE_TIMEOUT_SECS",
    );

    let demo_secret = if config.auth.demo_secret.expose_secret().trim().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    };
    push("auth.demo_secret", demo_secret, "PARTFLOW_AUTH_DEMO_SECRET");

    push("server.bind_address", &config.server.bind_address, "PARTFLOW_SERVER_BIND_ADDRESS");
    push("server.port", &config.server.port.to_string(), "PARTFLOW_SERVER_PORT");
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        "PARTFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
    );

    push("logging.level", &config.logging.level, "PARTFLOW_LOGGING_LEVEL");
    push("logging.format", &format!("{:?}", config.logging.format), "PARTFLOW_LOGGING_FORMAT");

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("partflow.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/partflow.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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
