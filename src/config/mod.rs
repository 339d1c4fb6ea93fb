use std::collections::HashMap;
use std::fs;

use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::config_error;
use crate::core::{ProKitError, ProKitResult};
use crate::utils::request::is_absolute_url;

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    #[serde(default)]
    pub http: HttpConfig,

    #[validate(nested)]
    pub log: Option<Log>,

    #[validate(nested)]
    #[serde(default)]
    pub storage: StorageConfig,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> ProKitResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .map_err(|e| config_error!("Unable to read conf file from {}: {}", path, e))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> ProKitResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| ProKitError::serialization_error("Unable to parse yaml conf", e))?;

        trace!("Loaded conf: {conf:?}");

        // use validator to validate conf file
        conf.validate()?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> ProKitResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Instance settings of the HTTP orchestrator
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    #[serde(default)]
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,

    #[serde(default)]
    pub show_loading: bool,
    #[serde(default)]
    pub show_error: bool,
    #[serde(default)]
    pub show_error_mode: String,

    /// Show-loading delay in milliseconds
    #[serde(default = "HttpConfig::default_delay")]
    #[validate(range(max = 60000))]
    pub delay: u64,

    /// Shown for timeouts; empty falls back to the default
    #[serde(
        default = "HttpConfig::default_timeout_text",
        deserialize_with = "timeout_text_or_default"
    )]
    pub timeout_text: String,

    /// Shown for failures without a message; empty falls back to the default
    #[serde(
        default = "HttpConfig::default_err",
        deserialize_with = "default_err_or_default"
    )]
    pub default_err: String,

    /// Transport timeout in milliseconds
    #[validate(range(min = 1))]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Hand non-2xx responses to the status validator instead of failing them
    #[serde(default)]
    pub accept_any_status: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            show_loading: false,
            show_error: false,
            show_error_mode: String::new(),
            delay: Self::default_delay(),
            timeout_text: Self::default_timeout_text(),
            default_err: Self::default_err(),
            timeout: None,
            headers: HashMap::new(),
            accept_any_status: false,
        }
    }
}

impl HttpConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    fn default_delay() -> u64 {
        300
    }

    pub(crate) fn default_timeout_text() -> String {
        "网络出了点问题，请稍后重试!".to_string()
    }

    pub(crate) fn default_err() -> String {
        "内部错误，请稍后再试！".to_string()
    }
}

fn text_or_default<'de, D>(deserializer: D, default: fn() -> String) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.filter(|t| !t.is_empty()).unwrap_or_else(default))
}

fn timeout_text_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    text_or_default(deserializer, HttpConfig::default_timeout_text)
}

fn default_err_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    text_or_default(deserializer, HttpConfig::default_err)
}

fn validate_base_url(base_url: &str) -> Result<(), ValidationError> {
    if base_url.is_empty() || is_absolute_url(base_url) {
        Ok(())
    } else {
        Err(ValidationError::new("base_url_must_be_absolute"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    #[validate(length(min = 1))]
    pub path: String,
    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "validate_level"))]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

fn validate_level(level: &str) -> Result<(), ValidationError> {
    level
        .parse::<log::LevelFilter>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_log_level"))
}

/// Settings of the CLI's storage cache
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    #[serde(default)]
    pub prefix_key: String,
    /// Default entry lifetime in seconds, 0 never expires
    #[serde(default)]
    pub timeout: u64,
    /// Backing file; in-memory when absent
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_default_http_config() {
        let conf = HttpConfig::default();
        assert_eq!(conf.delay, 300);
        assert_eq!(conf.timeout_text, "网络出了点问题，请稍后重试!");
        assert_eq!(conf.default_err, "内部错误，请稍后再试！");
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn test_config_parse() {
        init_log();
        let conf_str = r#"
---
http:
  base_url: https://api.example.com/
  show_loading: true
  show_error: true
  show_error_mode: toast
  delay: 500
  timeout: 5000
  headers:
    x-app: prokit

log:
  path: /tmp/prokit.log
  level: debug

storage:
  prefix_key: app
  timeout: 3600
        "#;
        let conf = Config::from_yaml(conf_str).unwrap();
        assert_eq!(conf.http.base_url, "https://api.example.com/");
        assert!(conf.http.show_loading);
        assert_eq!(conf.http.delay, 500);
        assert_eq!(conf.http.timeout, Some(5000));
        assert_eq!(conf.http.headers["x-app"], "prokit");
        assert_eq!(conf.http.default_err, "内部错误，请稍后再试！");
        let log = conf.log.unwrap();
        assert_eq!(log.level_filter(), log::LevelFilter::Debug);
        assert_eq!(conf.storage.prefix_key, "app");
        assert!(conf.storage.path.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        init_log();
        let conf = Config::from_yaml("{}").unwrap();
        assert_eq!(conf.http.delay, 300);
        assert!(conf.log.is_none());
    }

    #[test]
    fn test_to_yaml_round_trip() {
        init_log();
        let mut conf = Config::default();
        conf.http.base_url = "http://localhost:8080".to_string();
        let yaml = conf.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.http.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_base_url() {
        init_log();
        let conf_str = r#"
http:
  base_url: api.example.com
        "#;
        assert!(matches!(
            Config::from_yaml(conf_str),
            Err(ProKitError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_delay_and_timeout() {
        init_log();
        let conf_str = r#"
http:
  delay: 120000
        "#;
        assert!(Config::from_yaml(conf_str).is_err());

        let conf_str = r#"
http:
  timeout: 0
        "#;
        assert!(Config::from_yaml(conf_str).is_err());
    }

    #[test]
    fn test_empty_texts_fall_back_to_defaults() {
        init_log();
        let conf_str = r#"
http:
  timeout_text: ""
  default_err: ~
        "#;
        let conf = Config::from_yaml(conf_str).unwrap();
        assert_eq!(conf.http.timeout_text, "网络出了点问题，请稍后重试!");
        assert_eq!(conf.http.default_err, "内部错误，请稍后再试！");

        let conf_str = r#"
http:
  timeout_text: too slow
        "#;
        let conf = Config::from_yaml(conf_str).unwrap();
        assert_eq!(conf.http.timeout_text, "too slow");
    }

    #[test]
    fn test_invalid_log_level() {
        init_log();
        let conf_str = r#"
log:
  path: /tmp/prokit.log
  level: loud
        "#;
        assert!(matches!(
            Config::from_yaml(conf_str),
            Err(ProKitError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        init_log();
        assert!(matches!(
            Config::from_yaml("http: [1, 2"),
            Err(ProKitError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load_from_yaml("/nonexistent/prokit.yaml"),
            Err(ProKitError::Configuration(_))
        ));
    }
}
