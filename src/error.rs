// src/error.rs

use thiserror::Error;

/// 适配器构造阶段的错误，出现即终止启动
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("URL supplied is not valid: {url} ({reason})")]
    InvalidEndpoint { url: String, reason: String },
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
