// src/bidder/mod.rs

pub mod exchange;
pub mod ext;
pub mod model;
pub mod util;

use crate::bidder::model::{BidderBid, BidderCall, BidderResult, HttpRequest};
use crate::openrtb::request::BidRequest;

/// 竞价方适配器
/// 每次调用相互独立，实现方不得在调用之间修改自身状态。
pub trait Bidder: Send + Sync {
    /// 将入站请求改写为一个或多个发往上游的 HTTP 请求
    fn make_http_requests(&self, bid_request: &BidRequest) -> BidderResult<Vec<HttpRequest>>;

    /// 解析上游响应
    fn make_bids(&self, call: &BidderCall, bid_request: &BidRequest) -> BidderResult<Vec<BidderBid>>;
}
