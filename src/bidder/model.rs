// src/bidder/model.rs

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::openrtb::request::BidRequest;
use crate::openrtb::response::Bid;

/// 发往交易所的 HTTP 请求描述，真正的发送由宿主完成
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// 请求体对应的结构化数据，解析响应时用来找回 imp
    pub payload: BidRequest,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// 一次完整的请求/响应往返
#[derive(Debug, Clone)]
pub struct BidderCall {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BidType {
    Banner,
    Video,
}

impl fmt::Display for BidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidType::Banner => write!(f, "banner"),
            BidType::Video => write!(f, "video"),
        }
    }
}

/// 带媒体类型和币种标记的出价
#[derive(Debug, Clone, PartialEq)]
pub struct BidderBid {
    pub bid: Bid,
    pub bid_type: BidType,
    pub bid_currency: String,
}

impl BidderBid {
    pub fn of(bid: Bid, bid_type: BidType, bid_currency: &str) -> Self {
        Self {
            bid,
            bid_type,
            bid_currency: bid_currency.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidderErrorKind {
    BadInput,
    BadServerResponse,
}

impl BidderErrorKind {
    /// 写入响应 ext.errors 时使用的数字编码
    pub fn code(&self) -> i32 {
        match self {
            BidderErrorKind::BadInput => 2,
            BidderErrorKind::BadServerResponse => 3,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BidderError {
    pub kind: BidderErrorKind,
    pub message: String,
}

impl BidderError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        Self {
            kind: BidderErrorKind::BadInput,
            message: message.into(),
        }
    }

    pub fn bad_server_response(message: impl Into<String>) -> Self {
        Self {
            kind: BidderErrorKind::BadServerResponse,
            message: message.into(),
        }
    }
}

impl fmt::Display for BidderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// 结果值与非致命错误列表，二者可以同时存在
#[derive(Debug, Clone, PartialEq)]
pub struct BidderResult<T> {
    pub value: T,
    pub errors: Vec<BidderError>,
}

impl<T> BidderResult<T> {
    pub fn of(value: T, errors: Vec<BidderError>) -> Self {
        Self { value, errors }
    }

    pub fn with_value(value: T) -> Self {
        Self::of(value, Vec::new())
    }
}

impl<T: Default> BidderResult<T> {
    pub fn with_errors(errors: Vec<BidderError>) -> Self {
        Self::of(T::default(), errors)
    }

    pub fn with_error(error: BidderError) -> Self {
        Self::with_errors(vec![error])
    }
}

/// 币种 + 金额
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub currency: Option<String>,
    pub value: Option<Decimal>,
}

impl Price {
    pub fn of(currency: Option<String>, value: Option<Decimal>) -> Self {
        Self { currency, value }
    }
}
