use std::env;

/// Tool server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Documents larger than this are refused at load time
    pub max_file_size_mb: u64,
    /// Whether operations other than `open` create missing documents
    pub auto_create: bool,
    /// Default `max_results` for searches that leave it unset
    pub search_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            auto_create: true,
            search_limit: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read a `.env` file if present, then load from the environment
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_env()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let max_file_size_mb = match lookup("DOCXTABLE_MAX_FILE_SIZE_MB") {
            Some(value) => value.trim().parse()?,
            None => defaults.max_file_size_mb,
        };
        let auto_create = match lookup("DOCXTABLE_AUTO_CREATE") {
            Some(value) => parse_bool(&value)?,
            None => defaults.auto_create,
        };
        let search_limit = match lookup("DOCXTABLE_SEARCH_LIMIT") {
            Some(value) if !value.trim().is_empty() => Some(value.trim().parse()?),
            _ => defaults.search_limit,
        };

        Ok(Self {
            max_file_size_mb,
            auto_create,
            search_limit,
        })
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean value '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DOCXTABLE_MAX_FILE_SIZE_MB", "5"),
            ("DOCXTABLE_AUTO_CREATE", "false"),
            ("DOCXTABLE_SEARCH_LIMIT", "100"),
        ]))
        .unwrap();
        assert_eq!(config.max_file_size_mb, 5);
        assert!(!config.auto_create);
        assert_eq!(config.search_limit, Some(100));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("DOCXTABLE_MAX_FILE_SIZE_MB", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DOCXTABLE_AUTO_CREATE", "maybe")])).is_err());
    }
}
