use alloy::primitives::Address;
use thiserror::Error;

use crate::api::{CowError, SafeServiceError};
use crate::rpc::ChainError;
use crate::wallet::SignerError;

use super::stage::{RunMode, RunStage};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("第 {index} 笔调用（{target}）模拟回滚: {reason}")]
    Reverted {
        index: usize,
        target: Address,
        reason: String,
    },
    #[error("模拟请求失败: {0}")]
    Chain(#[from] ChainError),
    #[error("模拟结果数量不符: 期望 {expected} 笔，实际 {actual} 笔")]
    Incomplete { expected: usize, actual: usize },
    #[error("返回数据解码失败: {0}")]
    Decode(String),
}

/// 任务调用的失败分类；除通知失败外的所有错误都会中止调用。
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("模拟失败: {0}")]
    Simulation(#[from] SimulationError),
    #[error("缺少签名凭据: 环境变量 {var} 未设置")]
    CredentialMissing { var: String },
    #[error("签名失败: {0}")]
    Signing(#[source] SignerError),
    #[error("查询 Safe 待用 nonce 失败: {0}")]
    NonceLookup(#[source] SafeServiceError),
    #[error("Safe 服务拒绝提案: {0}")]
    Submission(#[source] SafeServiceError),
    #[error("上游服务错误: {0}")]
    UpstreamService(#[from] CowError),
    #[error("链上查询失败: {0}")]
    Chain(#[from] ChainError),
    #[error("{0}")]
    Task(String),
}

impl TaskError {
    pub fn task(reason: impl Into<String>) -> Self {
        Self::Task(reason.into())
    }
}

impl From<SignerError> for TaskError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::CredentialMissing { var } => TaskError::CredentialMissing { var },
            other => TaskError::Signing(other),
        }
    }
}

/// 带上运行模式与失败阶段的调用错误；展示时以 `[dry-run]` / `[live]` 开头。
#[derive(Debug, Error)]
#[error("[{}] 任务 {task} 在 {} 阶段失败: {source}", .mode.label(), .stage.as_str())]
pub struct RunError {
    pub task: String,
    pub mode: RunMode,
    pub stage: RunStage,
    #[source]
    pub source: TaskError,
}
