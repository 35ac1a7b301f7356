//! 链上只读访问：顺序模拟调用与读取最新区块时间。

pub mod client;

use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::safe::PendingCall;

pub use client::RpcChainClient;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC 请求 {method} 超时（{timeout_ms}ms）")]
    Timeout { method: String, timeout_ms: u64 },
    #[error("RPC 请求 {method} 返回状态 {status}: {body}")]
    ApiStatus {
        method: String,
        status: StatusCode,
        body: String,
    },
    #[error("RPC 返回错误 {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("RPC 响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RPC 响应结构不符合预期: {0}")]
    Schema(String),
}

/// 模拟中产生的事件日志。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// 单笔调用的模拟结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedCall {
    pub success: bool,
    pub return_data: Bytes,
    pub gas_used: u64,
    pub logs: Vec<SimulatedLog>,
    pub revert_reason: Option<String>,
}

impl SimulatedCall {
    #[cfg(test)]
    pub fn succeeded(return_data: impl Into<Bytes>, gas_used: u64) -> Self {
        Self {
            success: true,
            return_data: return_data.into(),
            gas_used,
            logs: Vec::new(),
            revert_reason: None,
        }
    }

    #[cfg(test)]
    pub fn reverted(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            return_data: Bytes::new(),
            gas_used: 0,
            logs: Vec::new(),
            revert_reason: Some(reason.into()),
        }
    }
}

/// 基于当前链状态顺序执行一组调用；前面调用的状态变更对后续调用可见。
#[async_trait]
pub trait ChainSimulator: Send + Sync {
    async fn simulate(
        &self,
        from: Address,
        calls: &[PendingCall],
    ) -> Result<Vec<SimulatedCall>, ChainError>;

    async fn latest_timestamp(&self) -> Result<u64, ChainError>;
}
