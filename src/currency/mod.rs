// src/currency/mod.rs

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::openrtb::request::BidRequest;

/// 价格保留的小数位
pub const PRICE_PRECISION: u32 = 4;

/// OpenRTB 约定：未指定 bidfloorcur 时按 USD 处理
pub const DEFAULT_CURRENCY: &str = "USD";

/// 汇率表：FROM -> TO -> rate
pub type RateTable = HashMap<String, HashMap<String, Decimal>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurrencyError {
    #[error("Unable to convert from currency {from} to desired ad server currency {to}")]
    MissingRate { from: String, to: String },

    #[error("Amount {0} cannot be represented after conversion")]
    InvalidAmount(Decimal),
}

/// 汇率换算服务，由宿主提供，必须可被并发调用
pub trait CurrencyConversionService: Send + Sync {
    fn convert_currency(
        &self,
        amount: Decimal,
        bid_request: &BidRequest,
        from: Option<&str>,
        to: &str,
    ) -> Result<Decimal, CurrencyError>;
}

#[derive(Deserialize, Debug, Default)]
struct ExtRequest {
    #[serde(default)]
    prebid: Option<ExtRequestPrebid>,
}

#[derive(Deserialize, Debug, Default)]
struct ExtRequestPrebid {
    #[serde(default)]
    currency: Option<ExtRequestCurrency>,
}

#[derive(Deserialize, Debug, Default)]
struct ExtRequestCurrency {
    #[serde(default)]
    rates: Option<RateTable>,
    #[serde(default)]
    usepbsrates: Option<bool>,
}

/// 基于静态汇率表的换算实现，请求里的 `ext.prebid.currency.rates` 作为补充
#[derive(Debug, Clone, Default)]
pub struct RateTableCurrencyService {
    rates: RateTable,
}

impl RateTableCurrencyService {
    pub fn new(rates: RateTable) -> Self {
        // 币种代码统一大写
        let rates = rates
            .into_iter()
            .map(|(from, to_rates)| {
                let to_rates = to_rates
                    .into_iter()
                    .map(|(to, rate)| (to.to_uppercase(), rate))
                    .collect();
                (from.to_uppercase(), to_rates)
            })
            .collect();
        Self { rates }
    }

    fn request_currency(bid_request: &BidRequest) -> Option<ExtRequestCurrency> {
        let ext = bid_request.ext.clone()?;
        let ext: ExtRequest = serde_json::from_value(ext).ok()?;
        ext.prebid?.currency
    }

    fn find_rate(rates: &RateTable, from: &str, to: &str) -> Option<Decimal> {
        Self::direct_rate(rates, from, to)
            .or_else(|| Self::reverse_rate(rates, from, to))
            .or_else(|| Self::intermediate_rate(rates, from, to))
    }

    fn lookup(rates: &RateTable, from: &str, to: &str) -> Option<Decimal> {
        rates
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(from))
            .and_then(|(_, to_rates)| Self::lookup_in(to_rates, to))
    }

    fn direct_rate(rates: &RateTable, from: &str, to: &str) -> Option<Decimal> {
        Self::lookup(rates, from, to)
    }

    fn reverse_rate(rates: &RateTable, from: &str, to: &str) -> Option<Decimal> {
        Self::lookup(rates, to, from)
            .filter(|rate| !rate.is_zero())
            .and_then(|rate| Decimal::ONE.checked_div(rate))
    }

    // 某个基准币种 X 同时给出 X->FROM 与 X->TO 时，rate = (X->TO) / (X->FROM)
    fn intermediate_rate(rates: &RateTable, from: &str, to: &str) -> Option<Decimal> {
        rates.values().find_map(|base_rates| {
            let from_rate = Self::lookup_in(base_rates, from).filter(|rate| !rate.is_zero())?;
            let to_rate = Self::lookup_in(base_rates, to)?;
            to_rate.checked_div(from_rate)
        })
    }

    fn lookup_in(to_rates: &HashMap<String, Decimal>, code: &str) -> Option<Decimal> {
        to_rates
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, rate)| *rate)
    }
}

impl CurrencyConversionService for RateTableCurrencyService {
    fn convert_currency(
        &self,
        amount: Decimal,
        bid_request: &BidRequest,
        from: Option<&str>,
        to: &str,
    ) -> Result<Decimal, CurrencyError> {
        let from = from.unwrap_or(DEFAULT_CURRENCY);
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }

        let request_currency = Self::request_currency(bid_request);
        let use_pbs_rates = request_currency
            .as_ref()
            .and_then(|c| c.usepbsrates)
            .unwrap_or(true);
        let request_rates = request_currency.and_then(|c| c.rates).unwrap_or_default();

        let (primary, fallback) = if use_pbs_rates {
            (&self.rates, &request_rates)
        } else {
            (&request_rates, &self.rates)
        };

        let rate = Self::find_rate(primary, from, to)
            .or_else(|| Self::find_rate(fallback, from, to))
            .ok_or_else(|| CurrencyError::MissingRate {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        debug!("Converting {} {} -> {} at rate {}", amount, from, to, rate);

        amount
            .checked_mul(rate)
            .map(|converted| {
                converted.round_dp_with_strategy(PRICE_PRECISION, RoundingStrategy::MidpointNearestEven)
            })
            .ok_or(CurrencyError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn service() -> RateTableCurrencyService {
        let mut usd = HashMap::new();
        usd.insert("EUR".to_string(), dec("0.9"));
        usd.insert("GBP".to_string(), dec("0.8"));
        let mut rates = RateTable::new();
        rates.insert("usd".to_string(), usd);
        RateTableCurrencyService::new(rates)
    }

    #[test]
    fn test_same_currency_is_identity() {
        let converted = service()
            .convert_currency(dec("1.2345678"), &BidRequest::default(), Some("eur"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("1.2345678"));
    }

    #[test]
    fn test_direct_rate() {
        let converted = service()
            .convert_currency(dec("1.00"), &BidRequest::default(), Some("USD"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("0.90"));
    }

    #[test]
    fn test_reverse_rate() {
        let converted = service()
            .convert_currency(dec("0.9"), &BidRequest::default(), Some("EUR"), "USD")
            .unwrap();
        assert_eq!(converted, dec("1"));
    }

    #[test]
    fn test_intermediate_rate() {
        // 以 USD 为基准：0.9 / 0.8 = 1.125
        let converted = service()
            .convert_currency(dec("1"), &BidRequest::default(), Some("GBP"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("1.125"));
    }

    #[test]
    fn test_missing_rate() {
        let err = service()
            .convert_currency(dec("1"), &BidRequest::default(), Some("JPY"), "EUR")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to convert from currency JPY to desired ad server currency EUR"
        );
    }

    #[test]
    fn test_missing_from_currency_defaults_to_usd() {
        let converted = service()
            .convert_currency(dec("2"), &BidRequest::default(), None, "EUR")
            .unwrap();
        assert_eq!(converted, dec("1.8"));
    }

    #[test]
    fn test_request_rates_as_fallback() {
        let request = BidRequest {
            ext: Some(json!({"prebid": {"currency": {"rates": {"JPY": {"EUR": 0.006}}}}})),
            ..Default::default()
        };
        let converted = service()
            .convert_currency(dec("1000"), &request, Some("JPY"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("6"));
    }

    #[test]
    fn test_request_rates_preferred_when_pbs_rates_disabled() {
        let request = BidRequest {
            ext: Some(json!({"prebid": {"currency": {
                "rates": {"USD": {"EUR": 0.5}},
                "usepbsrates": false
            }}})),
            ..Default::default()
        };
        let converted = service()
            .convert_currency(dec("2"), &request, Some("USD"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("1"));

        let default_request = BidRequest {
            ext: Some(json!({"prebid": {"currency": {"rates": {"USD": {"EUR": 0.5}}}}})),
            ..Default::default()
        };
        let converted = service()
            .convert_currency(dec("2"), &default_request, Some("USD"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("1.8"));
    }

    #[test]
    fn test_overflowing_amount_is_invalid() {
        let err = service()
            .convert_currency(Decimal::MAX, &BidRequest::default(), Some("EUR"), "USD")
            .unwrap_err();
        assert_eq!(err, CurrencyError::InvalidAmount(Decimal::MAX));
    }

    #[test]
    fn test_rounds_to_price_precision() {
        let mut usd = HashMap::new();
        usd.insert("EUR".to_string(), dec("0.333333"));
        let mut rates = RateTable::new();
        rates.insert("USD".to_string(), usd);
        let converted = RateTableCurrencyService::new(rates)
            .convert_currency(dec("1"), &BidRequest::default(), Some("USD"), "EUR")
            .unwrap();
        assert_eq!(converted, dec("0.3333"));
    }
}
