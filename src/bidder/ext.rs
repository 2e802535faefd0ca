// src/bidder/ext.rs

use serde::{Deserialize, Serialize};

/// imp.ext 外层包装，竞价方参数位于 `bidder` 下
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtPrebid<B> {
    #[serde(default)]
    pub bidder: Option<B>,
}

/// 交易所的自定义参数
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtImpExchange {
    /// 合作方广告位 ID，写入 imp.tagid
    #[serde(rename = "sid", default)]
    pub slot_id: Option<String>,
    /// 合作方名称，决定请求路由
    #[serde(rename = "name", default)]
    pub partner_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let ext: ExtPrebid<ExtImpExchange> =
            serde_json::from_value(json!({"bidder": {"sid": "s1", "name": "p1"}})).unwrap();
        let bidder = ext.bidder.unwrap();
        assert_eq!(bidder.slot_id.as_deref(), Some("s1"));
        assert_eq!(bidder.partner_name.as_deref(), Some("p1"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let ext: ExtPrebid<ExtImpExchange> = serde_json::from_value(json!({"bidder": {}})).unwrap();
        assert_eq!(ext.bidder, Some(ExtImpExchange::default()));

        let empty: ExtPrebid<ExtImpExchange> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.bidder.is_none());
    }

    #[test]
    fn test_wrong_type_fails() {
        let result: Result<ExtPrebid<ExtImpExchange>, _> =
            serde_json::from_value(json!({"bidder": {"sid": 12, "name": "p1"}}));
        assert!(result.is_err());
    }
}
