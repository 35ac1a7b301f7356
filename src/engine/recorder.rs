use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use tracing::{debug, info};

use crate::rpc::{ChainSimulator, SimulatedCall};
use crate::safe::PendingCall;

use super::error::SimulationError;

/// 记录结果：调用在批次中的位置与模拟数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    pub index: usize,
    pub target: Address,
    pub gas_used: u64,
    pub return_data: Bytes,
}

/// 以 Safe 身份记录调用，不单独广播。每次记录都会连同此前的调用一起模拟，
/// 因此后续调用与读取能看到前面调用的状态变更。
pub struct CallRecorder {
    safe: Address,
    simulator: Arc<dyn ChainSimulator>,
    calls: Vec<PendingCall>,
}

impl CallRecorder {
    pub fn new(safe: Address, simulator: Arc<dyn ChainSimulator>) -> Self {
        Self {
            safe,
            simulator,
            calls: Vec::new(),
        }
    }

    pub fn safe(&self) -> Address {
        self.safe
    }

    pub fn chain(&self) -> &Arc<dyn ChainSimulator> {
        &self.simulator
    }

    pub fn calls(&self) -> &[PendingCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<PendingCall> {
        self.calls
    }

    pub async fn record(&mut self, call: PendingCall) -> Result<CallReceipt, SimulationError> {
        let index = self.calls.len();
        let result = self.simulate_with(&call).await?;
        let receipt = CallReceipt {
            index,
            target: call.target,
            gas_used: result.gas_used,
            return_data: result.return_data,
        };
        info!(
            target: "recorder",
            index,
            target_address = %call.target,
            gas_used = receipt.gas_used,
            "已记录调用"
        );
        self.calls.push(call);
        Ok(receipt)
    }

    pub async fn record_call<C: SolCall>(
        &mut self,
        target: Address,
        call: C,
    ) -> Result<CallReceipt, SimulationError> {
        self.record(PendingCall::new(target, call.abi_encode())).await
    }

    /// 只读调用：观察已记录调用的模拟效果，本身不进入批次。
    pub async fn read(&self, target: Address, data: Bytes) -> Result<Bytes, SimulationError> {
        let call = PendingCall::new(target, data);
        let result = self.simulate_with(&call).await?;
        debug!(
            target: "recorder",
            target_address = %target,
            bytes = result.return_data.len(),
            "只读调用完成"
        );
        Ok(result.return_data)
    }

    pub async fn read_call<C: SolCall>(
        &self,
        target: Address,
        call: C,
    ) -> Result<C::Return, SimulationError> {
        let data = self.read(target, call.abi_encode().into()).await?;
        C::abi_decode_returns(&data).map_err(|err| SimulationError::Decode(err.to_string()))
    }

    /// 模拟已记录调用加上 `next`，返回 `next` 的结果。
    async fn simulate_with(&self, next: &PendingCall) -> Result<SimulatedCall, SimulationError> {
        let mut sequence = Vec::with_capacity(self.calls.len() + 1);
        sequence.extend(self.calls.iter().cloned());
        sequence.push(next.clone());

        let mut results = self.simulator.simulate(self.safe, &sequence).await?;
        if results.len() != sequence.len() {
            return Err(SimulationError::Incomplete {
                expected: sequence.len(),
                actual: results.len(),
            });
        }
        if let Some((index, failed)) = results.iter().enumerate().find(|(_, r)| !r.success) {
            return Err(SimulationError::Reverted {
                index,
                target: sequence[index].target,
                reason: failed
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            });
        }
        results
            .pop()
            .ok_or(SimulationError::Incomplete {
                expected: sequence.len(),
                actual: 0,
            })
    }
}
