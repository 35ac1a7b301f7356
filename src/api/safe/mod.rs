//! Safe Transaction Service：查询待用 nonce、提交多签提案。

use std::fmt;
use std::time::Duration;

use alloy::hex;
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::serde_helpers::string_or_number;
use crate::api::summarize_error_body;
use crate::safe::SignedSafeTransaction;

/// 一次查询最多拉取的排队交易数量。
const QUEUE_PAGE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum SafeServiceError {
    #[error("Safe 服务请求失败: {0}")]
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
}

/// 多签协调服务。nonce 状态以服务端为准，调用方需自行保证同一 Safe 串行执行。
#[async_trait]
pub trait SafeService: Send + Sync {
    /// 最小的未使用 nonce，已排队但未执行的交易也计入。
    async fn pending_nonce(&self, safe: Address) -> Result<u64, SafeServiceError>;

    async fn post_transaction(&self, signed: &SignedSafeTransaction)
    -> Result<(), SafeServiceError>;
}

#[derive(Debug, Deserialize)]
struct SafeInfoPayload {
    #[serde(deserialize_with = "string_or_number::deserialize_u64")]
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct QueuedTransactionPayload {
    #[serde(deserialize_with = "string_or_number::deserialize_u64")]
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct QueuedPagePayload {
    #[serde(default)]
    results: Vec<QueuedTransactionPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposeTransactionBody {
    safe: String,
    to: String,
    value: String,
    data: Option<String>,
    operation: u8,
    safe_tx_gas: String,
    base_gas: String,
    gas_price: String,
    gas_token: String,
    refund_receiver: String,
    nonce: u64,
    contract_transaction_hash: String,
    sender: String,
    signature: String,
    origin: String,
}

impl ProposeTransactionBody {
    fn from_signed(signed: &SignedSafeTransaction, origin: &str) -> Self {
        let tx = &signed.transaction;
        let zero = Address::ZERO.to_checksum(None);
        Self {
            safe: tx.safe.to_checksum(None),
            to: tx.to.to_checksum(None),
            value: tx.value.to_string(),
            data: (!tx.data.is_empty()).then(|| hex::encode_prefixed(&tx.data)),
            operation: tx.operation.as_u8(),
            safe_tx_gas: "0".to_string(),
            base_gas: "0".to_string(),
            gas_price: "0".to_string(),
            gas_token: zero.clone(),
            refund_receiver: zero,
            nonce: tx.nonce,
            contract_transaction_hash: format!("{:#x}", signed.safe_tx_hash),
            sender: signed.sender.to_checksum(None),
            signature: hex::encode_prefixed(&signed.signature),
            origin: origin.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SafeTransactionService {
    base_url: String,
    origin: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for SafeTransactionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeTransactionService")
            .field("base_url", &self.base_url)
            .field("origin", &self.origin)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SafeTransactionService {
    pub fn new(client: reqwest::Client, base_url: String, origin: String, timeout: Duration) -> Self {
        Self {
            base_url,
            origin,
            client,
            timeout,
        }
    }

    async fn onchain_nonce(&self, safe: Address) -> Result<u64, SafeServiceError> {
        let url = self.endpoint(&format!("/api/v1/safes/{}/", safe.to_checksum(None)));
        let text = self.get_text(&url, &[]).await?;
        let info: SafeInfoPayload = serde_json::from_str(&text)?;
        Ok(info.nonce)
    }

    async fn queued_nonces(&self, safe: Address, from: u64) -> Result<Vec<u64>, SafeServiceError> {
        let url = self.endpoint(&format!(
            "/api/v1/safes/{}/multisig-transactions/",
            safe.to_checksum(None)
        ));
        let query = [
            ("executed", "false".to_string()),
            ("nonce__gte", from.to_string()),
            ("limit", QUEUE_PAGE_LIMIT.to_string()),
        ];
        let text = self.get_text(&url, &query).await?;
        let page: QueuedPagePayload = serde_json::from_str(&text)?;
        Ok(page.results.into_iter().map(|tx| tx.nonce).collect())
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, SafeServiceError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .query(query)
            .send()
            .await
            .map_err(|err| self.classify(url, err))?;
        self.read_success(url, response).await
    }

    async fn read_success(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<String, SafeServiceError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.classify(url, err))?;
        if !status.is_success() {
            let body = summarize_error_body(&text);
            warn!(
                target: "safe::service",
                endpoint = %url,
                status = status.as_u16(),
                body = %body,
                "Safe 服务返回非成功状态"
            );
            return Err(SafeServiceError::ApiStatus {
                endpoint: url.to_string(),
                status,
                body,
            });
        }
        Ok(text)
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> SafeServiceError {
        if err.is_timeout() {
            let timeout_ms = self.timeout.as_millis() as u64;
            warn!(
                target: "safe::service",
                endpoint = %url,
                timeout_ms,
                "Safe 服务请求超时"
            );
            SafeServiceError::Timeout {
                endpoint: url.to_string(),
                timeout_ms,
            }
        } else {
            SafeServiceError::Http(err)
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

#[async_trait]
impl SafeService for SafeTransactionService {
    async fn pending_nonce(&self, safe: Address) -> Result<u64, SafeServiceError> {
        let onchain = self.onchain_nonce(safe).await?;
        let queued = self.queued_nonces(safe, onchain).await?;
        let pending = next_free_nonce(onchain, &queued);
        debug!(
            target: "safe::service",
            safe = %safe,
            onchain,
            queued = queued.len(),
            pending,
            "已计算待用 nonce"
        );
        Ok(pending)
    }

    async fn post_transaction(
        &self,
        signed: &SignedSafeTransaction,
    ) -> Result<(), SafeServiceError> {
        let safe = signed.transaction.safe;
        let url = self.endpoint(&format!(
            "/api/v1/safes/{}/multisig-transactions/",
            safe.to_checksum(None)
        ));
        let body = ProposeTransactionBody::from_signed(signed, &self.origin);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.classify(&url, err))?;
        self.read_success(&url, response).await?;

        info!(
            target: "safe::service",
            safe = %safe,
            nonce = signed.transaction.nonce,
            safe_tx_hash = %signed.safe_tx_hash,
            "多签提案已提交"
        );
        Ok(())
    }
}

/// 链上 nonce 与排队交易中最大 nonce+1 取较大者。
fn next_free_nonce(onchain: u64, queued: &[u64]) -> u64 {
    queued
        .iter()
        .filter(|nonce| **nonce >= onchain)
        .map(|nonce| nonce + 1)
        .max()
        .unwrap_or(onchain)
        .max(onchain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, Bytes, U256, address};

    use crate::safe::{Operation, SafeTransaction};

    #[test]
    fn pending_nonce_skips_queued_transactions() {
        assert_eq!(next_free_nonce(5, &[]), 5);
        assert_eq!(next_free_nonce(5, &[5, 6]), 7);
        assert_eq!(next_free_nonce(5, &[7]), 8);
        assert_eq!(next_free_nonce(5, &[3]), 5);
    }

    #[test]
    fn safe_info_nonce_accepts_string() {
        let info: SafeInfoPayload =
            serde_json::from_str(r#"{"address":"0x0","nonce":"12","threshold":2}"#)
                .expect("parse");
        assert_eq!(info.nonce, 12);
        let page: QueuedPagePayload =
            serde_json::from_str(r#"{"count":2,"results":[{"nonce":12},{"nonce":"13"}]}"#)
                .expect("parse");
        assert_eq!(
            page.results.iter().map(|tx| tx.nonce).collect::<Vec<_>>(),
            vec![12, 13]
        );
    }

    #[test]
    fn proposal_body_carries_signature_and_hash() {
        let safe = address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52");
        let signed = SignedSafeTransaction {
            transaction: SafeTransaction {
                safe,
                nonce: 42,
                calls: Vec::new(),
                to: address!("0x40A2aCCbd92BCA938b02010E17A5b8929b49130D"),
                value: U256::ZERO,
                data: Bytes::from(vec![0x8d, 0x80, 0xff, 0x0a]),
                operation: Operation::DelegateCall,
            },
            safe_tx_hash: B256::repeat_byte(0x11),
            sender: address!("0x1111111111111111111111111111111111111111"),
            signature: Bytes::from(vec![0xaa; 65]),
        };
        let body = serde_json::to_value(ProposeTransactionBody::from_signed(&signed, "robowoofy"))
            .expect("serialize");

        assert_eq!(body["safe"], safe.to_checksum(None).as_str());
        assert_eq!(body["nonce"], 42);
        assert_eq!(body["operation"], 1);
        assert_eq!(body["data"], "0x8d80ff0a");
        assert_eq!(body["safeTxGas"], "0");
        assert_eq!(body["contractTransactionHash"], format!("0x{}", "11".repeat(32)));
        assert_eq!(body["signature"], format!("0x{}", "aa".repeat(65)));
        assert_eq!(body["origin"], "robowoofy");
    }
}
