use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::hex;
use alloy::primitives::{Address, B256, Bytes};
use alloy::sol_types::decode_revert_reason;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::api::summarize_error_body;
use crate::safe::PendingCall;

use super::{ChainError, ChainSimulator, SimulatedCall, SimulatedLog};

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorPayload {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SimulatedBlockPayload {
    #[serde(default)]
    calls: Vec<SimulatedCallPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulatedCallPayload {
    #[serde(default)]
    return_data: String,
    #[serde(default)]
    gas_used: String,
    status: String,
    #[serde(default)]
    logs: Vec<SimulatedLogPayload>,
    #[serde(default)]
    error: Option<SimulatedErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct SimulatedLogPayload {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct SimulatedErrorPayload {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockHeaderPayload {
    timestamp: String,
}

/// 通过 JSON-RPC 访问以太坊节点，所有请求受 `timeout` 约束。
pub struct RpcChainClient {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RpcChainClient {
    pub fn new(client: reqwest::Client, url: String, timeout: Duration) -> Self {
        Self {
            url,
            client,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(target: "chain::rpc", method, id, "发送 RPC 请求");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.classify(method, err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.classify(method, err))?;
        if !status.is_success() {
            let err = status_error(method, status, &text);
            warn!(target: "chain::rpc", method, error = %err, "RPC 返回非成功状态");
            return Err(err);
        }
        parse_envelope(method, &text)
    }

    fn classify(&self, method: &str, err: reqwest::Error) -> ChainError {
        if err.is_timeout() {
            let timeout_ms = self.timeout.as_millis() as u64;
            warn!(
                target: "chain::rpc",
                method,
                timeout_ms,
                "RPC 请求超时"
            );
            ChainError::Timeout {
                method: method.to_string(),
                timeout_ms,
            }
        } else {
            ChainError::Http(err)
        }
    }
}

#[async_trait]
impl ChainSimulator for RpcChainClient {
    async fn simulate(
        &self,
        from: Address,
        calls: &[PendingCall],
    ) -> Result<Vec<SimulatedCall>, ChainError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let params = simulate_params(from, calls);
        let blocks: Vec<SimulatedBlockPayload> = self.request("eth_simulateV1", params).await?;
        let results = parse_simulated_blocks(blocks)?;
        if results.len() != calls.len() {
            return Err(ChainError::Schema(format!(
                "eth_simulateV1 返回 {} 笔结果，期望 {} 笔",
                results.len(),
                calls.len()
            )));
        }
        Ok(results)
    }

    async fn latest_timestamp(&self) -> Result<u64, ChainError> {
        let header: BlockHeaderPayload = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        parse_quantity(&header.timestamp)
    }
}

fn status_error(method: &str, status: StatusCode, body: &str) -> ChainError {
    ChainError::ApiStatus {
        method: method.to_string(),
        status,
        body: summarize_error_body(body),
    }
}

fn parse_envelope<T: DeserializeOwned>(method: &str, text: &str) -> Result<T, ChainError> {
    let envelope: RpcEnvelope<T> = serde_json::from_str(text)?;
    if let Some(error) = envelope.error {
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| ChainError::Schema(format!("{method} 响应缺少 result 字段")))
}

fn simulate_params(from: Address, calls: &[PendingCall]) -> Value {
    let calls = calls
        .iter()
        .map(|call| {
            json!({
                "from": format!("{from:#x}"),
                "to": format!("{:#x}", call.target),
                "value": format!("{:#x}", call.value),
                "input": hex::encode_prefixed(&call.data),
            })
        })
        .collect::<Vec<_>>();
    json!([
        {
            "blockStateCalls": [{ "calls": calls }],
            "traceTransfers": true,
            "validation": false,
        },
        "latest"
    ])
}

fn parse_simulated_blocks(
    blocks: Vec<SimulatedBlockPayload>,
) -> Result<Vec<SimulatedCall>, ChainError> {
    blocks
        .into_iter()
        .flat_map(|block| block.calls)
        .map(parse_simulated_call)
        .collect()
}

fn parse_simulated_call(payload: SimulatedCallPayload) -> Result<SimulatedCall, ChainError> {
    let success = parse_quantity(&payload.status)? == 1;
    let return_data = parse_bytes(&payload.return_data)?;
    let gas_used = if payload.gas_used.is_empty() {
        0
    } else {
        parse_quantity(&payload.gas_used)?
    };
    let logs = payload
        .logs
        .into_iter()
        .map(parse_log)
        .collect::<Result<Vec<_>, _>>()?;

    let revert_reason = if success {
        None
    } else {
        Some(describe_revert(payload.error.as_ref(), &return_data))
    };

    Ok(SimulatedCall {
        success,
        return_data,
        gas_used,
        logs,
        revert_reason,
    })
}

fn describe_revert(error: Option<&SimulatedErrorPayload>, return_data: &Bytes) -> String {
    let revert_data = error
        .and_then(|err| err.data.as_deref())
        .and_then(|data| Bytes::from_str(data).ok())
        .unwrap_or_else(|| return_data.clone());
    let decoded = decode_revert_reason(&revert_data).filter(|reason| !reason.is_empty());
    let message = error
        .map(|err| err.message.trim())
        .filter(|message| !message.is_empty());

    match (message, decoded) {
        (Some(message), Some(reason)) => format!("{message}: {reason}"),
        (Some(message), None) => message.to_string(),
        (None, Some(reason)) => reason,
        (None, None) if revert_data.is_empty() => "execution reverted".to_string(),
        (None, None) => format!("execution reverted ({revert_data})"),
    }
}

fn parse_log(payload: SimulatedLogPayload) -> Result<SimulatedLog, ChainError> {
    let address = Address::from_str(&payload.address)
        .map_err(|err| ChainError::Schema(format!("日志地址非法 {}: {err}", payload.address)))?;
    let topics = payload
        .topics
        .iter()
        .map(|topic| {
            B256::from_str(topic)
                .map_err(|err| ChainError::Schema(format!("日志 topic 非法 {topic}: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SimulatedLog {
        address,
        topics,
        data: parse_bytes(&payload.data)?,
    })
}

fn parse_bytes(raw: &str) -> Result<Bytes, ChainError> {
    if raw.is_empty() {
        return Ok(Bytes::new());
    }
    Bytes::from_str(raw).map_err(|err| ChainError::Schema(format!("十六进制数据非法 {raw}: {err}")))
}

fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw.trim().trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|err| ChainError::Schema(format!("数值字段非法 {raw}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{U256, address};
    use alloy::sol_types::{Revert, SolError};

    #[test]
    fn simulate_params_keep_call_order() {
        let from = address!("0x2222222222222222222222222222222222222222");
        let calls = vec![
            PendingCall::new(address!("0x1111111111111111111111111111111111111111"), vec![1u8]),
            PendingCall::new(address!("0x3333333333333333333333333333333333333333"), vec![2u8])
                .with_value(U256::from(16u8)),
        ];
        let params = simulate_params(from, &calls);
        let encoded = &params[0]["blockStateCalls"][0]["calls"];
        assert_eq!(encoded[0]["to"], "0x1111111111111111111111111111111111111111");
        assert_eq!(encoded[0]["input"], "0x01");
        assert_eq!(encoded[1]["value"], "0x10");
        assert_eq!(params[0]["validation"], false);
        assert_eq!(params[1], "latest");
    }

    #[test]
    fn parses_successful_and_reverted_calls() {
        let body = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "result": [{
                "number": "0x10",
                "calls": [
                    {
                        "returnData": "0x0000000000000000000000000000000000000000000000000000000000000001",
                        "gasUsed": "0x5208",
                        "status": "0x1",
                        "logs": [{
                            "address": "0xd533a949740bb3306d119cc777fa900ba034cd52",
                            "topics": ["0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"],
                            "data": "0x"
                        }]
                    },
                    {
                        "returnData": "0x",
                        "gasUsed": "0x0",
                        "status": "0x0",
                        "error": { "code": 3, "message": "execution reverted" }
                    }
                ]
            }]
        }"#;
        let blocks: Vec<SimulatedBlockPayload> =
            parse_envelope("eth_simulateV1", body).expect("envelope");
        let calls = parse_simulated_blocks(blocks).expect("calls");

        assert_eq!(calls.len(), 2);
        assert!(calls[0].success);
        assert_eq!(calls[0].gas_used, 21_000);
        assert_eq!(calls[0].logs.len(), 1);
        assert!(!calls[1].success);
        assert_eq!(calls[1].revert_reason.as_deref(), Some("execution reverted"));
    }

    #[test]
    fn revert_text_has_no_dangling_separator() {
        let bare = SimulatedErrorPayload {
            message: "execution reverted".to_string(),
            data: None,
        };
        assert_eq!(describe_revert(Some(&bare), &Bytes::new()), "execution reverted");
        assert_eq!(describe_revert(None, &Bytes::new()), "execution reverted");

        let reason: Bytes = Revert {
            reason: "insufficient allowance".to_string(),
        }
        .abi_encode()
        .into();
        assert_eq!(
            describe_revert(Some(&bare), &reason),
            "execution reverted: revert: insufficient allowance"
        );
    }

    #[test]
    fn non_success_status_body_is_summarized() {
        let body = format!("<html>\n{}</html>", "x".repeat(2_000));
        let err = status_error("eth_simulateV1", StatusCode::BAD_GATEWAY, &body);
        let ChainError::ApiStatus { status, body, .. } = err else {
            panic!("expected status error");
        };
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.contains('\n'));
        assert!(body.ends_with('…'));
    }

    #[test]
    fn rpc_error_is_surfaced() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        let err = parse_envelope::<Value>("eth_simulateV1", body).expect_err("rpc error");
        assert!(matches!(err, ChainError::Rpc { code: -32601, .. }));
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x65f0a1c0").expect("quantity"), 0x65f0a1c0);
        assert!(parse_quantity("latest").is_err());
    }
}
