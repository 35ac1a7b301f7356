use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tracing::info;

use crate::api::cow::{Order, OrderUid};
use crate::api::{CowApiClient, QuoteRequest};
use crate::config::{ConfigError, CowSellConfig, parse_address};
use crate::contracts::{COWSWAP_RELAYER, GPV2_SETTLEMENT, GPv2Settlement, IERC20};
use crate::engine::{CallRecorder, Task, TaskError};

const BPS_DENOMINATOR: u32 = 10_000;

/// presign 限价卖单参数。
#[derive(Debug, Clone)]
pub struct LimitSell {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub receiver: Option<Address>,
    pub deadline_secs: u64,
    pub partially_fillable: bool,
}

/// 提交 presign 卖单，并在批次中记录 `setPreSignature(uid, true)`。
///
/// 订单的有效期从最新区块时间起算。订单簿只接受订单，成交仍需多签执行 presign。
pub async fn limit_sell(
    recorder: &mut CallRecorder,
    cow: &CowApiClient,
    app_data: B256,
    params: &LimitSell,
) -> Result<OrderUid, TaskError> {
    let now = recorder.chain().latest_timestamp().await?;
    let valid_to = order_deadline(now, params.deadline_secs)?;
    let order = Order::presigned_sell(
        recorder.safe(),
        params.sell_token,
        params.buy_token,
        params.sell_amount,
        params.buy_amount,
        valid_to,
        app_data,
        params.receiver,
        params.partially_fillable,
    );
    let uid = cow.submit_order(&order).await?;
    info!(target: "cow::order", url = %cow.order_url(&uid), "订单待 presign");

    recorder
        .record_call(
            GPV2_SETTLEMENT,
            GPv2Settlement::setPreSignatureCall {
                orderUid: uid.as_bytes().clone(),
                signed: true,
            },
        )
        .await?;
    Ok(uid)
}

fn order_deadline(now: u64, deadline_secs: u64) -> Result<u64, TaskError> {
    now.checked_add(deadline_secs).ok_or_else(|| {
        TaskError::task(format!("订单有效期溢出: 区块时间 {now} + {deadline_secs} 秒"))
    })
}

/// 报价买入量扣除滑点后的最小成交量，向下取整。
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    amount * U256::from(keep) / U256::from(BPS_DENOMINATOR)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CowSellSettings {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub slippage_bps: u32,
    pub partially_fillable: bool,
    pub receiver: Option<Address>,
    pub deadline_secs: u64,
}

impl CowSellSettings {
    pub fn from_config(config: &CowSellConfig, default_deadline_secs: u64) -> Result<Self, ConfigError> {
        if config.slippage_bps >= BPS_DENOMINATOR {
            return Err(ConfigError::Invalid {
                field: "tasks.cow_sell.slippage_bps",
                message: format!("{} 超出 0..{BPS_DENOMINATOR}", config.slippage_bps),
            });
        }
        let sell_amount =
            U256::from_str(config.sell_amount.trim()).map_err(|err| ConfigError::Invalid {
                field: "tasks.cow_sell.sell_amount",
                message: err.to_string(),
            })?;
        if sell_amount.is_zero() {
            return Err(ConfigError::Invalid {
                field: "tasks.cow_sell.sell_amount",
                message: "卖出数量必须大于 0".to_string(),
            });
        }
        Ok(Self {
            sell_token: parse_address("tasks.cow_sell.sell_token", &config.sell_token)?,
            buy_token: parse_address("tasks.cow_sell.buy_token", &config.buy_token)?,
            sell_amount,
            slippage_bps: config.slippage_bps,
            partially_fillable: config.partially_fillable,
            receiver: config
                .receiver
                .as_deref()
                .map(|raw| parse_address("tasks.cow_sell.receiver", raw))
                .transpose()?,
            deadline_secs: config.deadline_secs.unwrap_or(default_deadline_secs),
        })
    }
}

/// 按报价挂出 presign 限价卖单：授权 relayer，然后 presign 订单。
#[derive(Debug, Clone)]
pub struct CowSell {
    settings: CowSellSettings,
    cow: CowApiClient,
    app_data: B256,
}

impl CowSell {
    pub fn new(settings: CowSellSettings, cow: CowApiClient, app_data: B256) -> Self {
        Self {
            settings,
            cow,
            app_data,
        }
    }
}

#[async_trait]
impl Task for CowSell {
    fn name(&self) -> &str {
        "cow-sell"
    }

    fn description(&self) -> &str {
        "按 CoW 报价挂出 presign 限价卖单"
    }

    async fn execute(&self, recorder: &mut CallRecorder) -> Result<(), TaskError> {
        let settings = &self.settings;
        let quote = self
            .cow
            .quote(&QuoteRequest::sell(
                recorder.safe(),
                settings.sell_token,
                settings.buy_token,
                settings.sell_amount,
            ))
            .await?;
        let min_buy = apply_slippage(quote.buy_amount, settings.slippage_bps);
        if min_buy.is_zero() {
            return Err(TaskError::task("报价买入量扣除滑点后为 0"));
        }
        info!(
            target: "tasks::cow_sell",
            quoted_buy = %quote.buy_amount,
            min_buy = %min_buy,
            slippage_bps = settings.slippage_bps,
            "已计算最小买入量"
        );

        recorder
            .record_call(
                settings.sell_token,
                IERC20::approveCall {
                    spender: COWSWAP_RELAYER,
                    amount: settings.sell_amount,
                },
            )
            .await?;

        let params = LimitSell {
            sell_token: settings.sell_token,
            buy_token: settings.buy_token,
            sell_amount: settings.sell_amount,
            buy_amount: min_buy,
            receiver: settings.receiver,
            deadline_secs: settings.deadline_secs,
            partially_fillable: settings.partially_fillable,
        };
        limit_sell(recorder, &self.cow, self.app_data, &params).await?;
        Ok(())
    }
}
