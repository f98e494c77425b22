// Client configuration: credentials and endpoint for one session
use crate::error::ApiError;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_LANG_CODE: &str = "en-us";

pub const ENV_USERNAME: &str = "COMARCH_USERNAME";
pub const ENV_PASSWORD: &str = "COMARCH_PASSWORD";
pub const ENV_URI: &str = "COMARCH_URI";
pub const ENV_TIMEOUT_MS: &str = "COMARCH_TIMEOUT_MS";
pub const ENV_LANG_CODE: &str = "COMARCH_LANG_CODE";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub uri: String,
    // Whole-request timeout; None leaves it to the transport
    pub timeout_ms: Option<u64>,
    pub lang_code: String,
    // Also send the credentials as HTTP Basic auth. They always travel in the
    // method context regardless.
    pub basic_auth: bool,
}

impl ClientConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            uri: uri.into(),
            timeout_ms: None,
            lang_code: DEFAULT_LANG_CODE.to_string(),
            basic_auth: false,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_lang_code(mut self, lang_code: impl Into<String>) -> Self {
        self.lang_code = lang_code.into();
        self
    }

    pub fn with_basic_auth(mut self, enabled: bool) -> Self {
        self.basic_auth = enabled;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Split out from from_env so tests don't have to touch the process environment
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ApiError::ConfigError(format!("{} is not set", key)))
        };

        let mut config = Self::new(required(ENV_USERNAME)?, required(ENV_PASSWORD)?, required(ENV_URI)?);

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|e| {
                ApiError::ConfigError(format!("{} must be a number of milliseconds: {}", ENV_TIMEOUT_MS, e))
            })?;
            config.timeout_ms = Some(timeout_ms);
        }
        if let Some(lang_code) = lookup(ENV_LANG_CODE) {
            config.lang_code = lang_code;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() {
            return Err(ApiError::ConfigError("username must not be empty".to_string()));
        }
        if self.uri.is_empty() {
            return Err(ApiError::ConfigError("uri must not be empty".to_string()));
        }
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(ApiError::ConfigError(format!(
                "uri must use http or https: {}",
                self.uri
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ApiError::ConfigError("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

// Never print the password
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("uri", &self.uri)
            .field("timeout_ms", &self.timeout_ms)
            .field("lang_code", &self.lang_code)
            .field("basic_auth", &self.basic_auth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("user", "secret", "https://loyalty.example.com/ws");
        assert_eq!(config.lang_code, "en-us");
        assert_eq!(config.timeout(), None);
        assert!(!config.basic_auth);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = ClientConfig::new("user", "secret", "https://loyalty.example.com/ws");
        let printed = format!("{:?}", config);
        assert!(printed.contains("user"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_validate_rejects_bad_uri() {
        let config = ClientConfig::new("user", "secret", "ftp://loyalty.example.com");
        assert!(matches!(config.validate(), Err(ApiError::ConfigError(_))));

        let config = ClientConfig::new("", "secret", "https://loyalty.example.com");
        assert!(config.validate().is_err());

        let config = ClientConfig::new("user", "secret", "https://loyalty.example.com").with_timeout_ms(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_USERNAME, "user"),
            (ENV_PASSWORD, "secret"),
            (ENV_URI, "http://localhost:8080/ws"),
            (ENV_TIMEOUT_MS, "2500"),
            (ENV_LANG_CODE, "ru-ru"),
        ]))
        .unwrap();

        assert_eq!(config.username, "user");
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.lang_code, "ru-ru");
    }

    #[test]
    fn test_from_lookup_missing_or_invalid() {
        let missing = ClientConfig::from_lookup(lookup_from(&[(ENV_USERNAME, "user")]));
        assert!(matches!(missing, Err(ApiError::ConfigError(msg)) if msg.contains(ENV_PASSWORD)));

        let bad_timeout = ClientConfig::from_lookup(lookup_from(&[
            (ENV_USERNAME, "user"),
            (ENV_PASSWORD, "secret"),
            (ENV_URI, "http://localhost:8080/ws"),
            (ENV_TIMEOUT_MS, "soon"),
        ]));
        assert!(bad_timeout.is_err());
    }
}
