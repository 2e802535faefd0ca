// src/config/config_manager.rs

use crate::config::adapters::{BidderConfig, ConfigAdapter, ConfigData, CurrencyConfig};
use crate::error::ConfigError;

/// 启动时加载一次的只读配置
#[derive(Clone, Debug)]
pub struct ConfigManager {
    data: ConfigData,
}

impl ConfigManager {
    pub fn new(data: ConfigData) -> Result<Self, ConfigError> {
        if data.bidder.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bidder.timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if data.bidder.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bidder.name",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(Self { data })
    }

    pub fn from_adapter(adapter: &dyn ConfigAdapter) -> Result<Self, ConfigError> {
        Self::new(adapter.load()?)
    }

    /// 命令行指定的 endpoint 覆盖文件配置
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.data.bidder.endpoint = endpoint;
        }
        self
    }

    pub fn bidder(&self) -> &BidderConfig {
        &self.data.bidder
    }

    pub fn currency(&self) -> &CurrencyConfig {
        &self.data.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(timeout_ms: u64) -> ConfigData {
        ConfigData {
            bidder: BidderConfig {
                name: "exchange".to_string(),
                enabled: true,
                endpoint: "https://x.test".to_string(),
                timeout_ms,
            },
            currency: CurrencyConfig::default(),
        }
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(matches!(
            ConfigManager::new(data(0)),
            Err(ConfigError::InvalidValue { field: "bidder.timeout_ms", .. })
        ));
    }

    #[test]
    fn test_endpoint_override() {
        let manager = ConfigManager::new(data(100))
            .unwrap()
            .with_endpoint(Some("https://override.test".to_string()));
        assert_eq!(manager.bidder().endpoint, "https://override.test");

        let unchanged = ConfigManager::new(data(100)).unwrap().with_endpoint(None);
        assert_eq!(unchanged.bidder().endpoint, "https://x.test");
    }
}
