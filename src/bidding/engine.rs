use serde_json::{json, Map, Value};
use tracing::info;

use crate::bidder::exchange::BIDDER_CURRENCY;
use crate::bidder::model::{BidderBid, BidderCall, BidderError};
use crate::bidder::Bidder;
use crate::bidding::exchange_client::{ExchangeClient, TransportError};
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::{Bid, BidResponse, SeatBid};

/// 一次询价的汇总结果
#[derive(Debug, Clone, Default)]
pub struct AuctionOutcome {
    pub bids: Vec<BidderBid>,
    pub errors: Vec<BidderError>,
    pub calls: usize,
}

/// 处理竞价请求：改写 -> 发送 -> 解析 -> 组装响应
pub async fn run_auction(
    bid_request: &BidRequest,
    bidder: &dyn Bidder,
    client: &ExchangeClient,
    bidder_name: &str,
) -> BidResponse {
    let prepared = bidder.make_http_requests(bid_request);
    let mut errors = prepared.errors;

    let results = client.send_all(prepared.value, bid_request.tmax).await;
    let mut outcome = settle_calls(bidder, bid_request, results);
    errors.append(&mut outcome.errors);
    outcome.errors = errors;

    let aggregated_log = json!({
        "request_id": bid_request.id,
        "bidder": bidder_name,
        "exchange_calls": outcome.calls,
        "bids": outcome.bids.len(),
        "errors": outcome.errors.len(),
    });
    info!("{}", aggregated_log);

    build_response(&bid_request.id, bidder_name, &outcome)
}

/// 处理每一次往返：204 跳过，非 200 记错误，200 交给适配器解析
pub fn settle_calls(
    bidder: &dyn Bidder,
    bid_request: &BidRequest,
    results: Vec<Result<BidderCall, TransportError>>,
) -> AuctionOutcome {
    let mut outcome = AuctionOutcome {
        calls: results.len(),
        ..Default::default()
    };

    for result in results {
        let call = match result {
            Ok(call) => call,
            Err(e) => {
                outcome.errors.push(BidderError::bad_server_response(e.to_string()));
                continue;
            }
        };

        match call.response.status_code {
            204 => continue,
            200 => {
                let mut parsed = bidder.make_bids(&call, bid_request);
                outcome.bids.append(&mut parsed.value);
                outcome.errors.append(&mut parsed.errors);
            }
            400 => outcome.errors.push(BidderError::bad_input(unexpected_status(400))),
            status => outcome
                .errors
                .push(BidderError::bad_server_response(unexpected_status(status))),
        }
    }

    outcome
}

fn unexpected_status(status: u16) -> String {
    format!(
        "Unexpected status code: {}. Run with request.debug = 1 for more info",
        status
    )
}

/// 在 bid.ext.prebid.type 中写入媒体类型
fn tag_bid(bidder_bid: &BidderBid) -> Bid {
    let mut bid = bidder_bid.bid.clone();
    let mut ext = match bid.ext.take() {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let prebid = ext
        .entry("prebid")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(prebid) = prebid {
        prebid.insert("type".to_string(), json!(bidder_bid.bid_type));
    }
    bid.ext = Some(Value::Object(ext));
    bid
}

pub fn build_response(request_id: &str, bidder_name: &str, outcome: &AuctionOutcome) -> BidResponse {
    let seatbid = if outcome.bids.is_empty() {
        None
    } else {
        Some(vec![Some(SeatBid {
            bid: Some(outcome.bids.iter().map(tag_bid).map(Some).collect()),
            seat: Some(bidder_name.to_string()),
            group: Some(0),
            ext: None,
        })])
    };

    let ext = if outcome.errors.is_empty() {
        None
    } else {
        let errors: Vec<Value> = outcome
            .errors
            .iter()
            .map(|e| json!({"code": e.kind.code(), "message": e.message}))
            .collect();
        Some(json!({ "errors": { bidder_name: errors } }))
    };

    BidResponse {
        id: request_id.to_string(),
        seatbid,
        cur: Some(BIDDER_CURRENCY.to_string()),
        ext,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidder::exchange::ExchangeBidder;
    use crate::bidder::model::{BidType, BidderErrorKind, HttpResponse};
    use crate::bidder::util::default_request;
    use crate::currency::RateTableCurrencyService;
    use crate::json::JsonMapper;
    use crate::openrtb::request::{Banner, Imp};
    use std::sync::Arc;

    fn bidder() -> ExchangeBidder {
        ExchangeBidder::new(
            "https://x.test",
            Arc::new(JsonMapper::new()),
            Arc::new(RateTableCurrencyService::default()),
        )
        .unwrap()
    }

    fn request() -> BidRequest {
        BidRequest {
            id: "req-1".to_string(),
            imp: vec![Imp {
                id: "a".to_string(),
                banner: Some(Banner::default()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn call(status_code: u16, body: &str) -> BidderCall {
        let request = default_request(request(), "https://x.test/p1/bid".to_string(), &JsonMapper::new()).unwrap();
        BidderCall {
            request,
            response: HttpResponse {
                status_code,
                headers: Default::default(),
                body: body.to_string(),
            },
        }
    }

    #[test]
    fn test_settle_calls_by_status() {
        let ok_body = r#"{"id":"r","seatbid":[{"bid":[{"id":"b1","impid":"a","price":1.0}]}]}"#;
        let results = vec![
            Ok(call(200, ok_body)),
            Ok(call(204, "")),
            Ok(call(400, "")),
            Ok(call(500, "")),
            Err(TransportError::Timeout("https://x.test/p2/bid".to_string())),
        ];

        let outcome = settle_calls(&bidder(), &request(), results);

        assert_eq!(outcome.calls, 5);
        assert_eq!(outcome.bids.len(), 1);
        assert_eq!(outcome.bids[0].bid_type, BidType::Banner);
        let kinds: Vec<BidderErrorKind> = outcome.errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BidderErrorKind::BadInput,
                BidderErrorKind::BadServerResponse,
                BidderErrorKind::BadServerResponse,
            ]
        );
        assert_eq!(
            outcome.errors[1].message,
            "Unexpected status code: 500. Run with request.debug = 1 for more info"
        );
    }

    #[test]
    fn test_build_response_tags_bids_and_reports_errors() {
        let body = r#"{"id":"r","seatbid":[{"bid":[{"id":"b1","impid":"a","price":1.0,"ext":{"dsp":"x"}}]}]}"#;
        let mut outcome = settle_calls(&bidder(), &request(), vec![Ok(call(200, body))]);
        outcome.errors.push(BidderError::bad_input("Bad. Ignore imp id = z."));

        let response = build_response("req-1", "exchange", &outcome);

        assert_eq!(response.cur.as_deref(), Some("EUR"));
        let bid = response.bids().next().unwrap();
        assert_eq!(bid.ext, Some(json!({"dsp": "x", "prebid": {"type": "banner"}})));
        assert_eq!(
            response.ext,
            Some(json!({"errors": {"exchange": [{"code": 2, "message": "Bad. Ignore imp id = z."}]}}))
        );
    }

    #[test]
    fn test_build_response_without_bids() {
        let response = build_response("req-1", "exchange", &AuctionOutcome::default());
        assert!(response.seatbid.is_none());
        assert!(response.ext.is_none());
        assert_eq!(response.id, "req-1");
    }
}
