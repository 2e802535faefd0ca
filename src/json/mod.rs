// src/json/mod.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct DecodeError(pub String);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct EncodeError(pub String);

/// JSON 编解码器
/// 交易所响应体较大，解码走 simd-json；编码与 Value 投影走 serde_json。
/// 无内部状态，可在多个请求间共享。
#[derive(Debug, Clone, Default)]
pub struct JsonMapper;

impl JsonMapper {
    pub fn new() -> Self {
        Self
    }

    /// 解码原始响应体，错误信息保留解码器原文
    pub fn decode_value<T: DeserializeOwned>(&self, body: &str) -> Result<T, DecodeError> {
        // simd-json 需要可写缓冲区
        let mut bytes = body.as_bytes().to_vec();
        simd_json::serde::from_slice(&mut bytes).map_err(|e| DecodeError(decode_message(&e)))
    }

    pub fn encode_to_bytes<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(value).map_err(|e| EncodeError(e.to_string()))
    }

    /// 将松散的 JSON 树投影为具体类型，类型不匹配时返回错误
    pub fn convert_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, DecodeError> {
        serde_json::from_value(value).map_err(|e| DecodeError(e.to_string()))
    }
}

/// serde 层错误取原始信息，语法错误带上出错位置
fn decode_message(error: &simd_json::Error) -> String {
    match error.error() {
        simd_json::ErrorType::Serde(message) => message.clone(),
        kind => format!("{:?} at character {}", kind, error.index()),
    }
}
