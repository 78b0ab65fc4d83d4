use std::env;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Read `FLASHCARDS_API_URL` and `FLASHCARDS_HTTP_TIMEOUT_SECS`, falling
    /// back to the local development server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw_url = match lookup("FLASHCARDS_API_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw,
            None => {
                info!("FLASHCARDS_API_URL not set, using default: {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_owned()
            }
        };
        let mut config = Self {
            base_url: parse_base_url(&raw_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        if let Some(raw) = lookup("FLASHCARDS_HTTP_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: "FLASHCARDS_HTTP_TIMEOUT_SECS",
                    raw,
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `raw` is not an absolute URL.
    pub fn set_base_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        var: "FLASHCARDS_API_URL",
        source,
    })
}
