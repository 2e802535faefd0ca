use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::bidding::engine::run_auction;
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::BidResponse;
use crate::AppState;

/// **处理 OpenRTB 竞价请求**
pub async fn handle_openrtb_request(
    State(state): State<Arc<AppState>>,
    Json(bid_request): Json<BidRequest>,
) -> (StatusCode, Json<BidResponse>) {
    let bidder_config = state.config.bidder();

    if !bidder_config.enabled {
        warn!(
            "request_id = {}: bidder {} is disabled, skipping",
            bid_request.id, bidder_config.name
        );
        return (
            StatusCode::NO_CONTENT,
            Json(BidResponse {
                id: bid_request.id.clone(),
                ..Default::default()
            }),
        );
    }

    let response = run_auction(
        &bid_request,
        state.bidder.as_ref(),
        &state.client,
        &bidder_config.name,
    )
    .await;

    let first_price = response.bids().next().map(|bid| bid.price);
    match first_price {
        Some(price) => {
            info!(
                "request_id = {}: auction success, first price = {}",
                response.id, price
            );
            (StatusCode::OK, Json(response))
        }
        // 无出价但有错误：204 不带响应体，错误需要以 200 返回
        None if response.ext.is_some() => {
            warn!(
                "request_id = {}: no bids, errors = {}",
                response.id,
                response.ext.as_ref().map(|ext| ext.to_string()).unwrap_or_default()
            );
            (StatusCode::OK, Json(response))
        }
        // 无广告可填充
        None => (StatusCode::NO_CONTENT, Json(response)),
    }
}
