use lambda_http::tracing::Level;

/// Environment variable holding the greeting subject used when the request
/// does not resolve one.
pub const FALLBACK_NAME_VAR: &str = "EXAMPLE_1";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub fallback_name: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Config {
            fallback_name: non_empty(FALLBACK_NAME_VAR),
            log_level: non_empty(LOG_LEVEL_VAR),
        }
    }

    /// Returns the configured level, or `Err` with the raw value when it
    /// cannot be parsed. Unset means `INFO`.
    pub fn max_level(&self) -> Result<Level, String> {
        match &self.log_level {
            None => Ok(Level::INFO),
            Some(raw) => raw.parse::<Level>().map_err(|_| raw.clone()),
        }
    }
}
