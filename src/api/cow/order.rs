use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, Bytes, U256};
use serde::Serialize;
use serde_json::Value;

use crate::api::serde_helpers::field_as_string;

use super::CowError;
use super::quote::OrderKind;

/// presign 订单：签名字段为 Safe 地址，有效性由链上 `setPreSignature` 确认。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub sell_token: String,
    pub buy_token: String,
    #[serde(with = "field_as_string")]
    pub sell_amount: U256,
    #[serde(with = "field_as_string")]
    pub buy_amount: U256,
    pub valid_to: u64,
    pub app_data: String,
    pub fee_amount: String,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub receiver: String,
    pub signature: String,
    pub from: String,
    pub sell_token_balance: &'static str,
    pub buy_token_balance: &'static str,
    pub signing_scheme: &'static str,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn presigned_sell(
        owner: Address,
        sell_token: Address,
        buy_token: Address,
        sell_amount: U256,
        buy_amount: U256,
        valid_to: u64,
        app_data: B256,
        receiver: Option<Address>,
        partially_fillable: bool,
    ) -> Self {
        let owner_str = owner.to_checksum(None);
        Self {
            sell_token: sell_token.to_checksum(None),
            buy_token: buy_token.to_checksum(None),
            sell_amount,
            buy_amount,
            valid_to,
            app_data: format!("{app_data:#x}"),
            fee_amount: "0".to_string(),
            kind: OrderKind::Sell,
            partially_fillable,
            receiver: receiver
                .map(|addr| addr.to_checksum(None))
                .unwrap_or_else(|| owner_str.clone()),
            signature: owner_str.clone(),
            from: owner_str,
            sell_token_balance: "erc20",
            buy_token_balance: "erc20",
            signing_scheme: "presign",
        }
    }
}

/// 订单簿返回的订单 UID（56 字节）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUid(Bytes);

impl OrderUid {
    pub fn try_from_value(value: &Value) -> Result<Self, CowError> {
        let raw = value
            .as_str()
            .ok_or_else(|| CowError::Schema(format!("订单 UID 应为字符串，实际为 {value}")))?;
        let bytes = Bytes::from_str(raw)
            .map_err(|err| CowError::Schema(format!("订单 UID 非法 {raw}: {err}")))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    #[test]
    fn presigned_sell_defaults_receiver_to_owner() {
        let owner = address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52");
        let order = Order::presigned_sell(
            owner,
            address!("0xD533a949740bb3306d119CC777fa900bA034cd52"),
            address!("0x6B175474E89094C44Da98b954EedeAC495271d0F"),
            U256::from(1000u64),
            U256::from(940u64),
            1_700_003_600,
            b256!("0x2b8694ed30082129598720860e8e972f07aa10d9b81cae16ca0e2cfb24743e24"),
            None,
            true,
        );
        let value = serde_json::to_value(&order).expect("serialize");
        let owner_str = owner.to_checksum(None);

        assert_eq!(value["sellAmount"], "1000");
        assert_eq!(value["buyAmount"], "940");
        assert_eq!(value["validTo"], 1_700_003_600u64);
        assert_eq!(value["feeAmount"], "0");
        assert_eq!(value["kind"], "sell");
        assert_eq!(value["partiallyFillable"], true);
        assert_eq!(value["receiver"], owner_str.as_str());
        assert_eq!(value["signature"], owner_str.as_str());
        assert_eq!(value["from"], owner_str.as_str());
        assert_eq!(value["sellTokenBalance"], "erc20");
        assert_eq!(value["buyTokenBalance"], "erc20");
        assert_eq!(value["signingScheme"], "presign");
        assert_eq!(
            value["appData"],
            "0x2b8694ed30082129598720860e8e972f07aa10d9b81cae16ca0e2cfb24743e24"
        );
    }

    #[test]
    fn order_uid_requires_hex_string() {
        assert!(OrderUid::try_from_value(&Value::from(5)).is_err());
        assert!(OrderUid::try_from_value(&Value::from("not-hex")).is_err());
        let uid = OrderUid::try_from_value(&Value::from("0x0102")).expect("uid");
        assert_eq!(uid.as_bytes().as_ref(), &[1u8, 2]);
    }
}
