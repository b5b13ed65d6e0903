use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub nlu: NluConfig,
    pub router: RouterConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    pub provider: NluProvider,
    pub max_name_words: usize,
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub dispatch: DispatchPolicy,
}

#[derive(Clone, Debug)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
    pub codes: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluProvider {
    Keyword,
}

/// Which booking flow the router starts once a name has been recognized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Every recognized name starts the vacation flow.
    VacationOnly,
    /// Booking intents pick the flow; a plain name still starts vacation.
    ByIntent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    AcceptAll,
    RejectAll,
    AllowList,
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
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub dispatch: Option<DispatchPolicy>,
    pub validation_mode: Option<ValidationMode>,
    pub validation_codes: Option<Vec<String>>,
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
            nlu: NluConfig { provider: NluProvider::Keyword, max_name_words: 2 },
            router: RouterConfig { dispatch: DispatchPolicy::VacationOnly },
            validation: ValidationConfig { mode: ValidationMode::AcceptAll, codes: Vec::new() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for NluProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            other => Err(ConfigError::Validation(format!(
                "unsupported nlu provider `{other}` (expected keyword)"
            ))),
        }
    }
}

impl std::str::FromStr for DispatchPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "vacation_only" => Ok(Self::VacationOnly),
            "by_intent" => Ok(Self::ByIntent),
            other => Err(ConfigError::Validation(format!(
                "unsupported router dispatch `{other}` (expected vacation_only|by_intent)"
            ))),
        }
    }
}

impl std::str::FromStr for ValidationMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accept_all" => Ok(Self::AcceptAll),
            "reject_all" => Ok(Self::RejectAll),
            "allow_list" => Ok(Self::AllowList),
            other => Err(ConfigError::Validation(format!(
                "unsupported validation mode `{other}` (expected accept_all|reject_all|allow_list)"
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("hrdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(nlu) = patch.nlu {
            if let Some(provider) = nlu.provider {
                self.nlu.provider = provider;
            }
            if let Some(max_name_words) = nlu.max_name_words {
                self.nlu.max_name_words = max_name_words;
            }
        }

        if let Some(router) = patch.router {
            if let Some(dispatch) = router.dispatch {
                self.router.dispatch = dispatch;
            }
        }

        if let Some(validation) = patch.validation {
            if let Some(mode) = validation.mode {
                self.validation.mode = mode;
            }
            if let Some(codes) = validation.codes {
                self.validation.codes = codes;
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

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HRDESK_NLU_PROVIDER") {
            self.nlu.provider = value.parse()?;
        }
        if let Some(value) = read_env("HRDESK_NLU_MAX_NAME_WORDS") {
            self.nlu.max_name_words = parse_usize("HRDESK_NLU_MAX_NAME_WORDS", &value)?;
        }

        if let Some(value) = read_env("HRDESK_ROUTER_DISPATCH") {
            self.router.dispatch = value.parse()?;
        }

        if let Some(value) = read_env("HRDESK_VALIDATION_MODE") {
            self.validation.mode = value.parse()?;
        }
        if let Some(value) = read_env("HRDESK_VALIDATION_CODES") {
            self.validation.codes = split_list(&value);
        }

        let log_level = read_env("HRDESK_LOGGING_LEVEL").or_else(|| read_env("HRDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HRDESK_LOGGING_FORMAT").or_else(|| read_env("HRDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(dispatch) = overrides.dispatch {
            self.router.dispatch = dispatch;
        }
        if let Some(mode) = overrides.validation_mode {
            self.validation.mode = mode;
        }
        if let Some(codes) = overrides.validation_codes {
            self.validation.codes = codes;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nlu(&self.nlu)?;
        validate_validation(&self.validation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Returns the config file `load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("hrdesk.toml"), PathBuf::from("config/hrdesk.toml")]
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

fn validate_nlu(nlu: &NluConfig) -> Result<(), ConfigError> {
    if nlu.max_name_words == 0 || nlu.max_name_words > 5 {
        return Err(ConfigError::Validation(
            "nlu.max_name_words must be in range 1..=5".to_string(),
        ));
    }
    Ok(())
}

fn validate_validation(validation: &ValidationConfig) -> Result<(), ConfigError> {
    if validation.mode == ValidationMode::AllowList
        && validation.codes.iter().all(|code| code.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "validation.codes must list at least one employee code when validation.mode is allow_list"
                .to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    nlu: Option<NluPatch>,
    router: Option<RouterPatch>,
    validation: Option<ValidationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    provider: Option<NluProvider>,
    max_name_words: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterPatch {
    dispatch: Option<DispatchPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationPatch {
    mode: Option<ValidationMode>,
    codes: Option<Vec<String>>,
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

    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, DispatchPolicy, LoadOptions, LogFormat,
        ValidationMode,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

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
    fn defaults_validate_without_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.router.dispatch == DispatchPolicy::VacationOnly,
            "router should dispatch vacation only by default",
        )?;
        ensure(
            config.validation.mode == ValidationMode::AcceptAll,
            "default validation mode should accept codes",
        )?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_HRDESK_CODE", "E123");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("hrdesk.toml");
            fs::write(
                &path,
                r#"
[validation]
mode = "allow_list"
codes = ["${TEST_HRDESK_CODE}", "E456"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.validation.mode == ValidationMode::AllowList,
                "validation mode should come from the file",
            )?;
            ensure(
                config.validation.codes == vec!["E123".to_string(), "E456".to_string()],
                "codes should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_HRDESK_CODE"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_LOG_LEVEL", "warn");
        env::set_var("HRDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["HRDESK_LOG_LEVEL", "HRDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_ROUTER_DISPATCH", "by_intent");
        env::set_var("HRDESK_VALIDATION_MODE", "reject_all");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("hrdesk.toml");
            fs::write(
                &path,
                r#"
[router]
dispatch = "vacation_only"

[validation]
mode = "accept_all"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    validation_mode: Some(ValidationMode::AllowList),
                    validation_codes: Some(vec!["E001".to_string()]),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.router.dispatch == DispatchPolicy::ByIntent,
                "env dispatch should win over file",
            )?;
            ensure(
                config.validation.mode == ValidationMode::AllowList,
                "override validation mode should win over env",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["HRDESK_ROUTER_DISPATCH", "HRDESK_VALIDATION_MODE"]);
        result
    }

    #[test]
    fn allow_list_without_codes_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_VALIDATION_MODE", "allow-list");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("validation.codes")
            );
            ensure(has_message, "validation failure should mention validation.codes")
        })();

        clear_vars(&["HRDESK_VALIDATION_MODE"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_NLU_MAX_NAME_WORDS", "many");

        let result = (|| -> Result<(), String> {
            let is_invalid_override = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "HRDESK_NLU_MAX_NAME_WORDS"
            );
            ensure(is_invalid_override, "non-numeric max_name_words should be rejected")
        })();

        clear_vars(&["HRDESK_NLU_MAX_NAME_WORDS"]);
        result
    }

    #[test]
    fn validation_codes_env_is_comma_separated() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_VALIDATION_MODE", "allow_list");
        env::set_var("HRDESK_VALIDATION_CODES", "E1, E2,,E3 ");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.validation.codes.len() == 3, "three codes should be parsed")
        })();

        clear_vars(&["HRDESK_VALIDATION_MODE", "HRDESK_VALIDATION_CODES"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist/hrdesk.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("required file must exist");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }
}
