use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::api::SafeService;
use crate::safe::{Operation, PendingCall, SafeTransaction, encode_multisend};

use super::error::TaskError;

/// 将一次调用记录的全部调用合并为绑定单一 nonce 的原子批次。
pub struct Batcher {
    service: Arc<dyn SafeService>,
    multisend: Address,
}

impl Batcher {
    pub fn new(service: Arc<dyn SafeService>, multisend: Address) -> Self {
        Self { service, multisend }
    }

    /// 显式 nonce（包括 0）原样使用；否则向 Safe 服务查询待用 nonce。
    pub async fn select_nonce(&self, safe: Address, explicit: Option<u64>) -> Result<u64, TaskError> {
        if let Some(nonce) = explicit {
            info!(target: "batcher", nonce, "使用调用方指定的 nonce");
            return Ok(nonce);
        }
        let nonce = self
            .service
            .pending_nonce(safe)
            .await
            .map_err(TaskError::NonceLookup)?;
        info!(target: "batcher", safe = %safe, nonce, "使用 Safe 服务的待用 nonce");
        Ok(nonce)
    }

    pub fn compile(&self, safe: Address, nonce: u64, calls: Vec<PendingCall>) -> SafeTransaction {
        if calls.is_empty() {
            warn!(target: "batcher", safe = %safe, nonce, "批次不含任何调用，将生成空操作交易");
        }
        let data = encode_multisend(&calls);
        info!(
            target: "batcher",
            safe = %safe,
            nonce,
            calls = calls.len(),
            bytes = data.len(),
            "已编译多签批次"
        );
        SafeTransaction {
            safe,
            nonce,
            calls,
            to: self.multisend,
            value: U256::ZERO,
            data,
            operation: Operation::DelegateCall,
        }
    }
}
