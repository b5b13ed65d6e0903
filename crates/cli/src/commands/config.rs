use std::env;
use std::fs;
use std::path::Path;

use hrdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run(config_path: Option<&Path>) -> String {
    let options =
        LoadOptions { config_path: config_path.map(Path::to_path_buf), ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(config_path);
    let sources = Sources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path.as_deref(),
    };

    let codes = if config.validation.codes.is_empty() {
        "<none>".to_string()
    } else {
        format!("{} code(s)", config.validation.codes.len())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.push(sources.line(
        "nlu.provider",
        &format!("{:?}", config.nlu.provider),
        &["HRDESK_NLU_PROVIDER"],
    ));
    lines.push(sources.line(
        "nlu.max_name_words",
        &config.nlu.max_name_words.to_string(),
        &["HRDESK_NLU_MAX_NAME_WORDS"],
    ));
    lines.push(sources.line(
        "router.dispatch",
        &format!("{:?}", config.router.dispatch),
        &["HRDESK_ROUTER_DISPATCH"],
    ));
    lines.push(sources.line(
        "validation.mode",
        &format!("{:?}", config.validation.mode),
        &["HRDESK_VALIDATION_MODE"],
    ));
    lines.push(sources.line("validation.codes", &codes, &["HRDESK_VALIDATION_CODES"]));
    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["HRDESK_LOGGING_LEVEL", "HRDESK_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["HRDESK_LOGGING_FORMAT", "HRDESK_LOG_FORMAT"],
    ));

    lines.join("\n")
}

struct Sources<'a> {
    doc: Option<Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
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
