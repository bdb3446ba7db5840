use crate::errors::ConfigurationError;
use crate::query::state::QuerySettings;
use crate::query::{PriceBounds, MAX_PER_PAGE};
use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::env::var;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub query: QueryConfig,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BackendSettings {
    #[serde_as(as = "DisplayFromStr")]
    pub backend_type: BackendType,
    pub base_url: Option<String>,
    pub data_file: Option<String>,
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    InMemory,
    Http,
}

impl Display for BackendType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::InMemory => write!(f, "in_memory"),
            BackendType::Http => write!(f, "http"),
        }
    }
}

impl FromStr for BackendType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(BackendType::Http),
            "in_memory" => Ok(BackendType::InMemory),
            other => Err(ConfigurationError::UnknownBackendType(other.to_string())),
        }
    }
}

impl BackendSettings {
    pub fn in_memory(data_file: &str) -> Self {
        Self {
            backend_type: BackendType::InMemory,
            base_url: None,
            data_file: Some(data_file.to_string()),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn check_if_valid(&self) -> Result<(), ConfigurationError> {
        match self.backend_type {
            BackendType::InMemory => match &self.data_file {
                None => return Err(ConfigurationError::DataFileNotFound),
                Some(path) => {
                    if !Path::new(path).is_file() {
                        return Err(ConfigurationError::DataFileNotFound);
                    }
                }
            },
            BackendType::Http => {
                if self.base_url.is_none() {
                    return Err(ConfigurationError::MissingBaseUrl);
                }
            }
        }
        Ok(())
    }

    /// Only meaningful after `check_if_valid` succeeded.
    pub fn data_file_unchecked(&self) -> String {
        self.data_file.to_owned().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    pub browse_staleness_secs: u64,
    pub search_staleness_secs: u64,
    pub categories_staleness_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            browse_staleness_secs: 300,
            search_staleness_secs: 30,
            categories_staleness_secs: 600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub debounce_ms: u64,
    pub per_page: u32,
    pub price_floor: f64,
    pub price_ceiling: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            per_page: crate::query::DEFAULT_PER_PAGE,
            price_floor: 0.0,
            price_ceiling: 1000.0,
        }
    }
}

impl QueryConfig {
    pub fn check_if_valid(&self) -> Result<(), ConfigurationError> {
        if !self.price_bounds().is_valid() {
            return Err(ConfigurationError::InvalidPriceBounds {
                floor: self.price_floor,
                ceiling: self.price_ceiling,
            });
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ConfigurationError::InvalidPerPage(self.per_page));
        }
        Ok(())
    }

    fn price_bounds(&self) -> PriceBounds {
        PriceBounds {
            floor: self.price_floor,
            ceiling: self.price_ceiling,
        }
    }
}

impl Settings {
    pub fn check_if_valid(&self) -> Result<(), ConfigurationError> {
        self.backend.check_if_valid()?;
        self.query.check_if_valid()
    }
}

impl From<&QueryConfig> for QuerySettings {
    fn from(config: &QueryConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            per_page: config.per_page,
            price_bounds: config.price_bounds(),
        }
    }
}

/// The possible runtime environment for our application.
#[derive(Debug, Eq, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(format!(
                "{other} is not a supported environment. Use either `dev` or `prod`."
            )),
        }
    }
}

pub fn get_env() -> Result<Environment, ConfigurationError> {
    var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "dev".into())
        .try_into()
        .map_err(ConfigurationError::UnknownEnvironment)
}

pub fn get_configuration() -> Result<Settings, crate::errors::Error> {
    let environment = get_env()?;
    let second_source = format!("configuration/{}", environment.as_str());
    let settings = Config::builder()
        .add_source(config::File::new("configuration/base", FileFormat::Yaml))
        .add_source(config::File::new(&second_source, FileFormat::Yaml).required(false))
        .build()?;
    Ok(settings.try_deserialize::<Settings>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_from_str_works() {
        assert_eq!(BackendType::from_str("http").ok(), Some(BackendType::Http));
        assert_eq!(
            BackendType::from_str("in_memory").ok(),
            Some(BackendType::InMemory)
        );
        assert!(matches!(
            BackendType::from_str("postgres"),
            Err(ConfigurationError::UnknownBackendType(_))
        ));
    }

    #[test]
    fn in_memory_missing_file_fails() {
        let settings = BackendSettings::in_memory("does/not/exist.json");
        assert!(matches!(
            settings.check_if_valid(),
            Err(ConfigurationError::DataFileNotFound)
        ));
    }

    #[test]
    fn http_without_base_url_fails() {
        let settings = BackendSettings {
            backend_type: BackendType::Http,
            ..BackendSettings::in_memory("data/products.json")
        };
        assert!(matches!(
            settings.check_if_valid(),
            Err(ConfigurationError::MissingBaseUrl)
        ));
    }

    #[test]
    fn settings_defaults_work() {
        let settings: Settings = serde_json::from_str(
            r#"{"backend":{"backend_type":"http","base_url":"http://localhost:8000/api"}}"#,
        )
        .expect("Failed to parse settings");
        assert_eq!(settings.backend.backend_type, BackendType::Http);
        assert_eq!(settings.backend.timeout_ms, 10_000);
        assert_eq!(settings.retry, RetrySettings::default());
        assert_eq!(settings.cache.search_staleness_secs, 30);
        let query = QuerySettings::from(&settings.query);
        assert_eq!(query.debounce, Duration::from_millis(300));
        assert_eq!(query.per_page, 12);
    }

    #[test]
    fn inverted_price_bounds_fail() {
        let query = QueryConfig {
            price_floor: 100.0,
            price_ceiling: 10.0,
            ..Default::default()
        };
        assert_eq!(
            query.check_if_valid(),
            Err(ConfigurationError::InvalidPriceBounds {
                floor: 100.0,
                ceiling: 10.0
            })
        );
        let query = QueryConfig {
            price_ceiling: f64::NAN,
            ..Default::default()
        };
        assert!(query.check_if_valid().is_err());
    }

    #[test]
    fn per_page_out_of_range_fails() {
        for per_page in [0, 101] {
            let query = QueryConfig {
                per_page,
                ..Default::default()
            };
            assert_eq!(
                query.check_if_valid(),
                Err(ConfigurationError::InvalidPerPage(per_page))
            );
        }
        assert_eq!(QueryConfig::default().check_if_valid(), Ok(()));
    }

    #[test]
    fn environment_parse_fails() {
        assert_eq!(Environment::try_from("PROD".to_string()), Ok(Environment::Prod));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
