//! CoW Protocol 订单簿 API 封装。

pub mod order;
pub mod quote;

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::summarize_error_body;

pub use order::{Order, OrderUid};
pub use quote::{OrderKind, Quote, QuoteRequest};

#[derive(Debug, Error)]
pub enum CowError {
    #[error("CoW API 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("请求 {endpoint} 超时（{timeout_ms}ms）")]
    Timeout { endpoint: String, timeout_ms: u64 },
    #[error("请求 {endpoint} 返回状态 {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CoW 响应结构不符合预期: {0}")]
    Schema(String),
}

#[derive(Clone)]
pub struct CowApiClient {
    base_url: String,
    explorer_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for CowApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowApiClient")
            .field("base_url", &self.base_url)
            .field("explorer_url", &self.explorer_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CowApiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        explorer_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url,
            explorer_url,
            client,
            timeout,
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, CowError> {
        let url = self.endpoint("/api/v1/quote");
        let started = Instant::now();

        debug!(
            target: "cow::quote",
            sell_token = %request.sell_token,
            buy_token = %request.buy_token,
            kind = request.kind.as_str(),
            amount = %request.amount,
            "开始请求 CoW 报价"
        );

        let value = self.post_json(&url, &request.to_body()).await?;
        let quote = Quote::try_from_value(value)
            .map_err(|err| CowError::Schema(format!("解析报价响应失败: {err}")))?;

        info!(
            target: "cow::quote",
            sell_amount = %quote.sell_amount,
            buy_amount = %quote.buy_amount,
            fee_amount = %quote.fee_amount,
            quote_id = %quote.quote_id,
            verified = quote.verified,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "报价请求完成"
        );

        Ok(quote)
    }

    pub async fn submit_order(&self, order: &Order) -> Result<OrderUid, CowError> {
        let url = self.endpoint("/api/v1/orders");
        let value = self.post_json(&url, order).await?;
        let uid = OrderUid::try_from_value(&value)?;

        info!(
            target: "cow::order",
            uid = %uid,
            explorer = %self.order_url(&uid),
            "订单已提交"
        );

        Ok(uid)
    }

    pub fn order_url(&self, uid: &OrderUid) -> String {
        format!("{}/orders/{}", self.explorer_url.trim_end_matches('/'), uid)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Value, CowError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| self.classify(url, err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.classify(url, err))?;

        if !status.is_success() {
            let body = summarize_error_body(&text);
            warn!(
                target: "cow::http",
                endpoint = %url,
                status = status.as_u16(),
                body = %body,
                "CoW API 返回非成功状态"
            );
            return Err(CowError::ApiStatus {
                endpoint: url.to_string(),
                status,
                body,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> CowError {
        if err.is_timeout() {
            let timeout_ms = self.timeout.as_millis() as u64;
            warn!(
                target: "cow::http",
                endpoint = %url,
                timeout_ms,
                "CoW API 请求超时"
            );
            CowError::Timeout {
                endpoint: url.to_string(),
                timeout_ms,
            }
        } else {
            CowError::Http(err)
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
