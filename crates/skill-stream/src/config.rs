use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_INVOKE_PATH: &str = "/v1/skill/streamInvoke";

/// Configuration for the skill invocation client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server origin, for example `https://api.example.com`.
    pub base_url: String,
    /// Path of the streaming invocation endpoint.
    pub invoke_path: String,
    /// Optional overall request timeout.
    ///
    /// Unset by default because skill streams are long-lived.
    pub timeout: Option<Duration>,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a config with defaults for the given server origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            invoke_path: DEFAULT_INVOKE_PATH.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("skill-stream/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Builds a config from `SKILL_STREAM_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("SKILL_STREAM_BASE_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ClientError::Config(
                "missing SKILL_STREAM_BASE_URL for skill client".into(),
            ));
        }
        let mut config = Self::new(base_url.trim());
        if let Ok(path) = std::env::var("SKILL_STREAM_INVOKE_PATH")
            && !path.trim().is_empty()
        {
            config.invoke_path = path.trim().to_string();
        }
        if let Some(secs) = env_secs("SKILL_STREAM_TIMEOUT_SECS")? {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = env_secs("SKILL_STREAM_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overrides the server origin.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn invoke_path(mut self, path: impl Into<String>) -> Self {
        self.invoke_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Full URL of the invocation endpoint.
    pub fn invoke_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.invoke_path.trim_start_matches('/')
        )
    }
}

fn env_secs(key: &str) -> Result<Option<u64>, ClientError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ClientError::Config(format!("invalid {key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_url_joins_with_single_slash() {
        let cases = [
            ("http://localhost:5800", "/v1/skill/streamInvoke"),
            ("http://localhost:5800/", "/v1/skill/streamInvoke"),
            ("http://localhost:5800/", "v1/skill/streamInvoke"),
            ("http://localhost:5800", "v1/skill/streamInvoke"),
        ];
        for (base, path) in cases {
            let url = ClientConfig::new(base).invoke_path(path).invoke_url();
            assert_eq!(url, "http://localhost:5800/v1/skill/streamInvoke");
        }
    }

    #[test]
    fn validate_rejects_empty_or_schemeless_base() {
        assert!(matches!(
            ClientConfig::new(" ").validate(),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("localhost:5800").validate(),
            Err(ClientError::Config(msg)) if msg.contains("http://")
        ));
        assert!(ClientConfig::new("http://x").validate().is_ok());
    }

    #[test]
    fn defaults_leave_overall_timeout_unset() {
        let config = ClientConfig::new("http://x");
        assert!(config.timeout.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.invoke_path, "/v1/skill/streamInvoke");
    }
}
