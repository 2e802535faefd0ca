// src/config/adapters.rs

use std::fs;

use serde::{Deserialize, Serialize};

use crate::currency::RateTable;
use crate::error::ConfigError;

fn default_bidder_name() -> String {
    "exchange".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    250
}

/// 交易所适配器配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidderConfig {
    #[serde(default = "default_bidder_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub endpoint: String,
    /// 出站请求的默认超时（毫秒），请求里的 tmax 优先
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CurrencyConfig {
    #[serde(default)]
    pub rates: RateTable,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfigData {
    pub bidder: BidderConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
}

pub trait ConfigAdapter: Send + Sync {
    fn load(&self) -> Result<ConfigData, ConfigError>;
}

pub struct FileConfigAdapter {
    pub config_file: String,
}

impl FileConfigAdapter {
    pub fn new(config_file: &str) -> Self {
        Self {
            config_file: config_file.to_string(),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<ConfigData, ConfigError> {
        let content = fs::read_to_string(&self.config_file).map_err(|source| ConfigError::ReadFile {
            path: self.config_file.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_file.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bidder": {{"endpoint": "https://x.test"}}, "currency": {{"rates": {{"USD": {{"EUR": 0.9}}}}}}}}"#
        )
        .unwrap();

        let data = FileConfigAdapter::new(file.path().to_str().unwrap()).load().unwrap();
        assert_eq!(data.bidder.name, "exchange");
        assert!(data.bidder.enabled);
        assert_eq!(data.bidder.timeout_ms, 250);
        assert_eq!(data.currency.rates["USD"]["EUR"], rust_decimal::Decimal::new(9, 1));
    }

    #[test]
    fn test_missing_file() {
        let err = FileConfigAdapter::new("/nonexistent/bidder_config.json").load().unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = FileConfigAdapter::new(file.path().to_str().unwrap()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
