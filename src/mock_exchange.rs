use axum::extract::Path;
use axum::serve;
use axum::{routing::post, Json, Router};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;
use uuid::Uuid;

use crate::bidder::exchange::BIDDER_CURRENCY;
use crate::openrtb::request::{BidRequest, Imp};
use crate::openrtb::response::{Bid, BidResponse, SeatBid};

/// 没有底价时的基础出价
const BASE_PRICE: f64 = 0.5;

/// 模拟交易所竞价响应
/// 每个合作方一条路由 `/{partner}/bid`，对每个 imp 在底价基础上随机加价。
async fn handle_exchange_bid(
    Path(partner): Path<String>,
    Json(request): Json<BidRequest>,
) -> Json<BidResponse> {
    info!(
        "Mock exchange received BidRequest: id={}, partner={}, imp_count={}",
        request.id,
        partner,
        request.imp.len()
    );

    // 模拟处理延迟（20 ~ 120 毫秒）
    let delay_ms = rand::thread_rng().gen_range(20..120);
    sleep(Duration::from_millis(delay_ms)).await;

    Json(build_bid_response(&partner, &request, &mut rand::thread_rng()))
}

fn adm_for(imp: &Imp, bid_id: &str) -> String {
    if imp.banner.is_some() {
        format!(
            "<html><body>Mock Exchange Banner Ad<br/><a href=\"http://exchange-tracker.local/click?bid={bid_id}\" target=\"_blank\">Click Here</a><img src=\"http://exchange-tracker.local/impression?bid={bid_id}\" style=\"display:none;\" /></body></html>",
            bid_id = bid_id
        )
    } else {
        format!(
            r#"<VAST version="3.0">
  <Ad id="{bid_id}">
    <InLine>
      <AdSystem>Mock Exchange</AdSystem>
      <AdTitle>Mock Video Ad</AdTitle>
      <Impression><![CDATA[http://exchange-tracker.local/impression?bid={bid_id}]]></Impression>
      <Creatives>
        <Creative>
          <Linear>
            <Duration>00:00:30</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="640" height="360" bitrate="500">
                http://example.com/video.mp4
              </MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#,
            bid_id = bid_id
        )
    }
}

pub fn build_bid_response<R: Rng>(partner: &str, request: &BidRequest, rng: &mut R) -> BidResponse {
    let bids = request
        .imp
        .iter()
        .map(|imp| {
            let bid_id = Uuid::new_v4().to_string();
            let floor = imp
                .bidfloor
                .and_then(|floor| floor.to_f64())
                .filter(|floor| *floor > 0.0)
                .unwrap_or(BASE_PRICE);
            let price = floor * rng.gen_range(1.0..2.0);

            Some(Bid {
                adm: Some(adm_for(imp, &bid_id)),
                crid: imp.tagid.clone(),
                id: bid_id,
                impid: imp.id.clone(),
                price,
                ..Default::default()
            })
        })
        .collect();

    BidResponse {
        id: request.id.clone(),
        seatbid: Some(vec![Some(SeatBid {
            bid: Some(bids),
            seat: Some(partner.to_string()),
            group: Some(0),
            ext: None,
        })]),
        cur: Some(BIDDER_CURRENCY.to_string()),
        ..Default::default()
    }
}

pub fn router() -> Router {
    Router::new().route("/{partner}/bid", post(handle_exchange_bid))
}

/// 启动 Mock 交易所服务
/// 请确保适配器配置的 endpoint 指向此端口
pub async fn start_mock_exchange_server(port: u16) -> anyhow::Result<()> {
    let app = router();

    let addr = format!("0.0.0.0:{}", port);
    info!("Mock exchange running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrtb::request::{Banner, Video};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal::Decimal;

    fn request() -> BidRequest {
        BidRequest {
            id: "req-1".to_string(),
            imp: vec![
                Imp {
                    id: "a".to_string(),
                    banner: Some(Banner::default()),
                    bidfloor: Some(Decimal::new(200, 2)),
                    tagid: Some("s1".to_string()),
                    ..Default::default()
                },
                Imp {
                    id: "v".to_string(),
                    video: Some(Video::default()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_bids_above_floor_per_imp() {
        let mut rng = StdRng::seed_from_u64(7);
        let response = build_bid_response("p1", &request(), &mut rng);

        let bids: Vec<&Bid> = response.bids().collect();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].impid, "a");
        assert!(bids[0].price >= 2.0 && bids[0].price < 4.0);
        assert!(bids[0].adm.as_deref().unwrap().starts_with("<html>"));
        assert_eq!(bids[0].crid.as_deref(), Some("s1"));
        assert!(bids[1].price >= BASE_PRICE && bids[1].price < 2.0 * BASE_PRICE);
        assert!(bids[1].adm.as_deref().unwrap().starts_with("<VAST"));
        assert_eq!(response.cur.as_deref(), Some("EUR"));
    }

    #[tokio::test]
    async fn test_handler_echoes_request_id() {
        let Json(response) = handle_exchange_bid(Path("p2".to_string()), Json(request())).await;
        assert_eq!(response.id, "req-1");
        let seat = response.seatbid.unwrap()[0].clone().unwrap();
        assert_eq!(seat.seat.as_deref(), Some("p2"));
    }
}
