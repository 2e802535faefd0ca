// src/bidder/util.rs

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use rust_decimal::Decimal;
use url::Url;

use crate::bidder::model::HttpRequest;
use crate::error::AdapterError;
use crate::json::{EncodeError, JsonMapper};
use crate::openrtb::request::BidRequest;

const APPLICATION_JSON_UTF8: &str = "application/json;charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// 有效价格：存在且严格大于 0
pub fn is_valid_price(price: Option<Decimal>) -> bool {
    matches!(price, Some(p) if p > Decimal::ZERO)
}

/// null、空串或只含空白均视为 blank
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// 校验 URL 格式，成功时原样返回
pub fn validate_url(url: &str) -> Result<String, AdapterError> {
    Url::parse(url)
        .map(|_| url.to_string())
        .map_err(|e| AdapterError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON_UTF8));
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers
}

/// 构造默认的 POST JSON 请求
pub fn default_request(
    payload: BidRequest,
    uri: String,
    mapper: &JsonMapper,
) -> Result<HttpRequest, EncodeError> {
    let body = mapper.encode_to_bytes(&payload)?;
    Ok(HttpRequest {
        method: Method::POST,
        uri,
        headers: default_headers(),
        body,
        payload,
    })
}
