// src/bidder/exchange.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bidder::ext::{ExtImpExchange, ExtPrebid};
use crate::bidder::model::{
    BidType, BidderBid, BidderCall, BidderError, BidderResult, HttpRequest, Price,
};
use crate::bidder::util;
use crate::bidder::Bidder;
use crate::currency::{CurrencyConversionService, CurrencyError};
use crate::error::AdapterError;
use crate::json::{EncodeError, JsonMapper};
use crate::openrtb::request::{BidRequest, Imp};
use crate::openrtb::response::BidResponse;

/// 交易所结算币种，出站底价与入站出价都以此为准
pub const BIDDER_CURRENCY: &str = "EUR";

/// 单个 imp 被丢弃的原因
#[derive(Error, Debug)]
enum ImpRejection {
    #[error("Expected banner or video impression")]
    MissingMediaType,
    #[error("{0}")]
    InvalidExt(String),
    #[error("Custom param slot id (sid) is empty")]
    EmptySlotId,
    #[error("Custom param partner name (name) is empty")]
    EmptyPartnerName,
    #[error("{0}")]
    Currency(#[from] CurrencyError),
}

/// 校验通过的竞价方参数
struct ImpTarget {
    slot_id: String,
    partner_name: String,
}

/// 按合作方拆分请求的交易所适配器
/// 三个依赖在构造后只读，可在并发请求间共享。
pub struct ExchangeBidder {
    endpoint_url: String,
    mapper: Arc<JsonMapper>,
    currency_conversion_service: Arc<dyn CurrencyConversionService>,
}

impl ExchangeBidder {
    pub fn new(
        endpoint_url: &str,
        mapper: Arc<JsonMapper>,
        currency_conversion_service: Arc<dyn CurrencyConversionService>,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            endpoint_url: util::validate_url(endpoint_url)?,
            mapper,
            currency_conversion_service,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn validate_imp(imp: &Imp) -> Result<(), ImpRejection> {
        if imp.banner.is_none() && imp.video.is_none() {
            return Err(ImpRejection::MissingMediaType);
        }
        Ok(())
    }

    fn parse_imp_ext(&self, imp: &Imp) -> Result<ExtImpExchange, ImpRejection> {
        let Some(ext) = imp.ext.clone() else {
            return Ok(ExtImpExchange::default());
        };
        self.mapper
            .convert_value::<ExtPrebid<ExtImpExchange>>(ext)
            .map(|ext| ext.bidder.unwrap_or_default())
            .map_err(|e| ImpRejection::InvalidExt(e.0))
    }

    fn validate_imp_ext(imp_ext: ExtImpExchange) -> Result<ImpTarget, ImpRejection> {
        if util::is_blank(imp_ext.slot_id.as_deref()) {
            return Err(ImpRejection::EmptySlotId);
        }
        if util::is_blank(imp_ext.partner_name.as_deref()) {
            return Err(ImpRejection::EmptyPartnerName);
        }
        Ok(ImpTarget {
            slot_id: imp_ext.slot_id.unwrap_or_default(),
            partner_name: imp_ext.partner_name.unwrap_or_default(),
        })
    }

    /// 底价有效且币种不是 EUR 时才换汇，否则原样透传
    fn convert_bid_floor(&self, bid_request: &BidRequest, imp: &Imp) -> Result<Price, ImpRejection> {
        let bid_floor = imp.bidfloor;
        let bid_floor_currency = imp.bidfloorcur.clone();

        let amount = match bid_floor {
            Some(amount) if Self::should_convert_bid_floor(bid_floor, bid_floor_currency.as_deref()) => amount,
            _ => return Ok(Price::of(bid_floor_currency, bid_floor)),
        };

        let converted = self.currency_conversion_service.convert_currency(
            amount,
            bid_request,
            bid_floor_currency.as_deref(),
            BIDDER_CURRENCY,
        )?;

        Ok(Price::of(Some(BIDDER_CURRENCY.to_string()), Some(converted)))
    }

    fn should_convert_bid_floor(bid_floor: Option<Decimal>, currency: Option<&str>) -> bool {
        util::is_valid_price(bid_floor)
            && !currency.is_some_and(|c| c.eq_ignore_ascii_case(BIDDER_CURRENCY))
    }

    fn modify_imp(imp: &Imp, target: &ImpTarget, price: Price) -> Imp {
        Imp {
            bidfloorcur: price.currency,
            bidfloor: price.value,
            tagid: Some(target.slot_id.clone()),
            ..imp.clone()
        }
    }

    /// 校验、解析、换汇、改写单个 imp，返回 (合作方, 改写后的 imp)
    fn prepare_imp(&self, bid_request: &BidRequest, imp: &Imp) -> Result<(String, Imp), ImpRejection> {
        Self::validate_imp(imp)?;

        let imp_ext = self.parse_imp_ext(imp)?;
        let target = Self::validate_imp_ext(imp_ext)?;

        let price = self.convert_bid_floor(bid_request, imp)?;

        let modified = Self::modify_imp(imp, &target, price);
        Ok((target.partner_name, modified))
    }

    fn extract_bids(bid_request: &BidRequest, bid_response: Option<&BidResponse>) -> Vec<BidderBid> {
        let Some(bid_response) = bid_response else {
            return Vec::new();
        };

        bid_response
            .bids()
            .map(|bid| {
                let bid_type = Self::get_bid_type(&bid.impid, &bid_request.imp);
                BidderBid::of(bid.clone(), bid_type, BIDDER_CURRENCY)
            })
            .collect()
    }

    // banner 优先；找不到对应 imp 时回落为 banner
    fn get_bid_type(imp_id: &str, imps: &[Imp]) -> BidType {
        let mut matched = false;
        for imp in imps.iter().filter(|imp| imp.id == imp_id) {
            matched = true;
            if imp.banner.is_some() {
                return BidType::Banner;
            } else if imp.video.is_some() {
                return BidType::Video;
            }
        }

        if !matched {
            warn!("Bid references unknown imp id = {}, falling back to banner", imp_id);
        }
        BidType::Banner
    }
}

impl ExchangeBidder {
    /// 整个分组无法编码时，组内每个 imp 各记一条错误
    fn ignored_imps(error: &EncodeError, imp_ids: &[String]) -> Vec<BidderError> {
        imp_ids
            .iter()
            .map(|id| BidderError::bad_input(format!("{}. Ignore imp id = {}.", error, id)))
            .collect()
    }
}

impl Bidder for ExchangeBidder {
    fn make_http_requests(&self, bid_request: &BidRequest) -> BidderResult<Vec<HttpRequest>> {
        // 保持首次出现的顺序，同一合作方内 imp 顺序与入站一致
        let mut modified_imps: Vec<(String, Vec<Imp>)> = Vec::new();
        let mut errors = Vec::new();

        for imp in &bid_request.imp {
            let (partner_name, modified) = match self.prepare_imp(bid_request, imp) {
                Ok(prepared) => prepared,
                Err(rejection) => {
                    debug!("Dropping imp id = {}: {}", imp.id, rejection);
                    errors.push(BidderError::bad_input(format!(
                        "{}. Ignore imp id = {}.",
                        rejection, imp.id
                    )));
                    continue;
                }
            };

            match modified_imps.iter_mut().find(|(name, _)| *name == partner_name) {
                Some((_, imps)) => imps.push(modified),
                None => modified_imps.push((partner_name, vec![modified])),
            }
        }

        if modified_imps.is_empty() {
            return BidderResult::with_errors(errors);
        }

        let mut http_requests = Vec::with_capacity(modified_imps.len());
        for (partner_name, imps) in modified_imps {
            let url = format!("{}/{}/bid", self.endpoint_url, partner_name);
            let imp_ids: Vec<String> = imps.iter().map(|imp| imp.id.clone()).collect();
            match util::default_request(bid_request.with_imps(imps), url, &self.mapper) {
                Ok(request) => http_requests.push(request),
                Err(e) => {
                    warn!("Failed to encode request for partner {}: {}", partner_name, e);
                    errors.extend(Self::ignored_imps(&e, &imp_ids));
                }
            }
        }

        BidderResult::of(http_requests, errors)
    }

    fn make_bids(&self, call: &BidderCall, _bid_request: &BidRequest) -> BidderResult<Vec<BidderBid>> {
        match self.mapper.decode_value::<Option<BidResponse>>(&call.response.body) {
            Ok(bid_response) => BidderResult::with_value(Self::extract_bids(
                &call.request.payload,
                bid_response.as_ref(),
            )),
            Err(e) => {
                warn!("Failed to decode exchange response from {}: {}", call.request.uri, e);
                BidderResult::with_error(BidderError::bad_server_response(e.0))
            }
        }
    }
}
