//! OpenRTB 交易所竞价适配器。
//!
//! 每个入站请求的 imp 经过校验、换汇（统一为 EUR）、改写后按合作方分组，
//! 每个合作方生成一个发往 `<endpoint>/<partner>/bid` 的请求；
//! 交易所的响应被解析为带媒体类型与币种标记的出价。

use std::sync::Arc;

pub mod api;
pub mod bidder;
pub mod bidding;
pub mod config;
pub mod currency;
pub mod error;
pub mod json;
pub mod logging;
pub mod mock_exchange;
pub mod openrtb;

use bidder::Bidder;
use bidding::exchange_client::ExchangeClient;
use config::config_manager::ConfigManager;

#[derive(Clone)]
pub struct AppState {
    pub bidder: Arc<dyn Bidder>,
    pub client: ExchangeClient,
    pub config: Arc<ConfigManager>,
}
