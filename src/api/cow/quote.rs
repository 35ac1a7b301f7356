use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::serde_helpers::{field_as_string, string_or_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Sell,
    Buy,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Sell => "sell",
            OrderKind::Buy => "buy",
        }
    }

    /// 报价请求中承载数量的字段名。
    fn amount_field(self) -> &'static str {
        match self {
            OrderKind::Sell => "sellAmountBeforeFee",
            OrderKind::Buy => "buyAmountAfterFee",
        }
    }
}

/// `/api/v1/quote` 请求。`amount` 为卖单的卖出数量或买单的买入数量（最小单位）。
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub from: Address,
    pub sell_token: Address,
    pub buy_token: Address,
    pub kind: OrderKind,
    pub amount: U256,
}

impl QuoteRequest {
    pub fn sell(from: Address, sell_token: Address, buy_token: Address, amount: U256) -> Self {
        Self {
            from,
            sell_token,
            buy_token,
            kind: OrderKind::Sell,
            amount,
        }
    }

    pub fn buy(from: Address, sell_token: Address, buy_token: Address, amount: U256) -> Self {
        Self {
            kind: OrderKind::Buy,
            ..Self::sell(from, sell_token, buy_token, amount)
        }
    }

    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "from": self.from.to_checksum(None),
            "sellToken": self.sell_token.to_checksum(None),
            "buyToken": self.buy_token.to_checksum(None),
            "kind": self.kind.as_str(),
            "priceQuality": "verified",
        });
        body[self.kind.amount_field()] = Value::String(self.amount.to_string());
        body
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteAmounts {
    #[serde(with = "field_as_string")]
    sell_amount: U256,
    #[serde(with = "field_as_string")]
    buy_amount: U256,
    #[serde(with = "field_as_string")]
    fee_amount: U256,
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteResponsePayload {
    quote: QuoteAmounts,
    #[serde(deserialize_with = "string_or_number::deserialize_string")]
    id: String,
    #[serde(default)]
    verified: bool,
}

/// 报价结果，数量均已转换为整数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub fee_amount: U256,
    pub quote_id: String,
    pub verified: bool,
}

impl Quote {
    pub fn try_from_value(value: Value) -> Result<Self, serde_json::Error> {
        let payload: QuoteResponsePayload = serde_json::from_value(value)?;
        Ok(Self {
            sell_amount: payload.quote.sell_amount,
            buy_amount: payload.quote.buy_amount,
            fee_amount: payload.quote.fee_amount,
            quote_id: payload.id,
            verified: payload.verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const SAFE: Address = address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52");
    const TOKEN_X: Address = address!("0xD533a949740bb3306d119CC777fa900bA034cd52");
    const TOKEN_Y: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

    #[test]
    fn sell_request_uses_amount_before_fee() {
        let body = QuoteRequest::sell(SAFE, TOKEN_X, TOKEN_Y, U256::from(1000u64)).to_body();
        assert_eq!(body["kind"], "sell");
        assert_eq!(body["priceQuality"], "verified");
        assert_eq!(body["sellAmountBeforeFee"], "1000");
        assert!(body.get("buyAmountAfterFee").is_none());
        assert_eq!(body["sellToken"], TOKEN_X.to_checksum(None));
    }

    #[test]
    fn buy_request_uses_amount_after_fee() {
        let body = QuoteRequest::buy(SAFE, TOKEN_X, TOKEN_Y, U256::from(7u64)).to_body();
        assert_eq!(body["kind"], "buy");
        assert_eq!(body["buyAmountAfterFee"], "7");
        assert!(body.get("sellAmountBeforeFee").is_none());
    }

    #[test]
    fn quote_amounts_surface_as_integers() {
        let value = json!({
            "quote": {
                "sellToken": TOKEN_X.to_checksum(None),
                "buyToken": TOKEN_Y.to_checksum(None),
                "sellAmount": "1000",
                "buyAmount": "950",
                "feeAmount": "5",
                "kind": "sell"
            },
            "from": SAFE.to_checksum(None),
            "expiration": "2026-10-19T00:00:00Z",
            "id": "abc",
            "verified": true
        });
        let quote = Quote::try_from_value(value).expect("quote");
        assert_eq!(
            quote,
            Quote {
                sell_amount: U256::from(1000u64),
                buy_amount: U256::from(950u64),
                fee_amount: U256::from(5u64),
                quote_id: "abc".to_string(),
                verified: true,
            }
        );
    }

    #[test]
    fn numeric_quote_id_is_accepted() {
        let value = json!({
            "quote": { "sellAmount": "1", "buyAmount": "2", "feeAmount": "0" },
            "id": 4242,
            "verified": false
        });
        let quote = Quote::try_from_value(value).expect("quote");
        assert_eq!(quote.quote_id, "4242");
        assert!(!quote.verified);
    }

    #[test]
    fn malformed_amount_is_rejected() {
        let value = json!({
            "quote": { "sellAmount": "1e18", "buyAmount": "2", "feeAmount": "0" },
            "id": "x"
        });
        assert!(Quote::try_from_value(value).is_err());
    }
}
