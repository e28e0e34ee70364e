//! Config - 起動時に 1 度だけ読む設定
//!
//! ```toml
//! [queue]
//! url = "https://sqs.eu-west-1.amazonaws.com/123456789012/events"
//! max_messages = 10
//! wait_time_seconds = 0
//!
//! [routes]
//! "arn:aws:sns:eu-west-1:123456789012:orders" = "log"
//! ```
//!
//! `[routes]` は無くても空でもよい（どのメッセージも handler にマッチしないだけ）。
//! 設定はグローバルに参照せず、`HandlerRegistry` などへ明示的に渡します。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ports::MAX_BATCH_SIZE;

const MAX_WAIT_TIME_SECONDS: u8 = 20;
const MAX_VISIBILITY_TIMEOUT_SECONDS: u32 = 43_200;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    #[serde(default)]
    pub url: String,

    /// Messages per receive (1..=10).
    #[serde(default = "default_max_messages")]
    pub max_messages: u8,

    /// Long-poll wait (0..=20). 0 keeps the short poll, so an empty queue
    /// ends the run immediately.
    #[serde(default)]
    pub wait_time_seconds: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_timeout_seconds: Option<u32>,
}

fn default_max_messages() -> u8 {
    MAX_BATCH_SIZE as u8
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_messages: default_max_messages(),
            wait_time_seconds: 0,
            visibility_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub queue: QueueConfig,

    /// Routing key → handler identifier.
    #[serde(default)]
    pub routes: HashMap<String, String>,
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Replace `queue.url` when an override is given (flag or env).
    pub fn with_queue_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.queue.url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let queue = &self.queue;
        if queue.url.trim().is_empty() {
            return Err(ConfigError::Invalid("queue.url must be set".to_string()));
        }
        if queue.max_messages == 0 || usize::from(queue.max_messages) > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "queue.max_messages must be between 1 and {MAX_BATCH_SIZE}, got {}",
                queue.max_messages
            )));
        }
        if queue.wait_time_seconds > MAX_WAIT_TIME_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "queue.wait_time_seconds must be at most {MAX_WAIT_TIME_SECONDS}, got {}",
                queue.wait_time_seconds
            )));
        }
        // 0 だと失敗したメッセージが即座に再受信され、drain が終わらない
        if let Some(timeout) = queue.visibility_timeout_seconds
            && (timeout == 0 || timeout > MAX_VISIBILITY_TIMEOUT_SECONDS)
        {
            return Err(ConfigError::Invalid(format!(
                "queue.visibility_timeout_seconds must be between 1 and {MAX_VISIBILITY_TIMEOUT_SECONDS}, got {timeout}"
            )));
        }
        if let Some((key, _)) = self
            .routes
            .iter()
            .find(|(key, handler)| key.trim().is_empty() || handler.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "route '{key}' has an empty routing key or handler identifier"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    const FULL: &str = r#"
        [queue]
        url = "https://sqs.eu-west-1.amazonaws.com/123/events"
        max_messages = 5
        wait_time_seconds = 2
        visibility_timeout_seconds = 60

        [routes]
        "arn:aws:sns:eu-west-1:123:topic-A" = "log"
    "#;

    #[test]
    fn parses_full_config() {
        let config = RelayConfig::from_toml_str(FULL).unwrap();

        assert_eq!(config.queue.max_messages, 5);
        assert_eq!(config.queue.wait_time_seconds, 2);
        assert_eq!(config.queue.visibility_timeout_seconds, Some(60));
        assert_eq!(
            config.routes.get("arn:aws:sns:eu-west-1:123:topic-A").map(String::as_str),
            Some("log")
        );
        config.validate().unwrap();
    }

    #[test]
    fn routes_are_optional() {
        let config = RelayConfig::from_toml_str("[queue]\nurl = \"q\"\n").unwrap();

        assert!(config.routes.is_empty());
        assert_eq!(config.queue.max_messages, 10);
        assert_eq!(config.queue.wait_time_seconds, 0);
        config.validate().unwrap();
    }

    #[test]
    fn queue_url_override_wins() {
        let config = RelayConfig::from_toml_str(FULL)
            .unwrap()
            .with_queue_url(Some("https://other".to_string()));
        assert_eq!(config.queue.url, "https://other");

        let config = config.with_queue_url(None);
        assert_eq!(config.queue.url, "https://other");
    }

    #[rstest]
    #[case::missing_url("[queue]\n", "queue.url")]
    #[case::zero_batch("[queue]\nurl = \"q\"\nmax_messages = 0\n", "max_messages")]
    #[case::big_batch("[queue]\nurl = \"q\"\nmax_messages = 11\n", "max_messages")]
    #[case::long_wait("[queue]\nurl = \"q\"\nwait_time_seconds = 21\n", "wait_time_seconds")]
    #[case::zero_visibility("[queue]\nurl = \"q\"\nvisibility_timeout_seconds = 0\n", "visibility_timeout_seconds")]
    #[case::visibility("[queue]\nurl = \"q\"\nvisibility_timeout_seconds = 50000\n", "visibility_timeout_seconds")]
    #[case::empty_handler("[queue]\nurl = \"q\"\n[routes]\n\"topic\" = \"\"\n", "route 'topic'")]
    fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
        let err = RelayConfig::from_toml_str(toml).unwrap().validate().unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn unknown_keys_are_a_parse_error() {
        let err = RelayConfig::from_toml_str("[queue]\nurl = \"q\"\nsize = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = RelayConfig::from_path(file.path()).unwrap();
        assert_eq!(config.queue.max_messages, 5);

        let err = RelayConfig::from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
