use alloy::primitives::{Address, U256, address};
use alloy::primitives::utils::format_units;
use async_trait::async_trait;
use tracing::info;

use crate::contracts::IERC20;
use crate::engine::{CallRecorder, Task, TaskError};

const CRV: Address = address!("0xD533a949740bb3306d119CC777fa900bA034cd52");
const ZAP: Address = address!("0x094d12e5b541784701FD8d65F11fc0598FBC6332");

/// 示例任务：打印 Safe 的 CRV 余额并授权 zap 合约 420 wei。
#[derive(Debug, Clone)]
pub struct Woofy {
    token: Address,
    spender: Address,
    amount: U256,
}

impl Default for Woofy {
    fn default() -> Self {
        Self {
            token: CRV,
            spender: ZAP,
            amount: U256::from(420),
        }
    }
}

#[async_trait]
impl Task for Woofy {
    fn name(&self) -> &str {
        "woofy"
    }

    fn description(&self) -> &str {
        "读取 CRV 余额并授权 zap 合约"
    }

    async fn execute(&self, recorder: &mut CallRecorder) -> Result<(), TaskError> {
        let balance = recorder
            .read_call(self.token, IERC20::balanceOfCall { owner: recorder.safe() })
            .await?;
        let whole = format_units(balance, 18u8)
            .map_err(|err| TaskError::task(format!("余额格式化失败: {err}")))?;
        info!(target: "tasks::woofy", token = %self.token, balance = %whole, "💰 当前余额");

        info!(target: "tasks::woofy", spender = %self.spender, amount = %self.amount, "⚙️ 授权 zap");
        recorder
            .record_call(
                self.token,
                IERC20::approveCall {
                    spender: self.spender,
                    amount: self.amount,
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::sol_types::SolCall;

    use crate::rpc::{ChainError, ChainSimulator, SimulatedCall};
    use crate::safe::PendingCall;

    use super::*;

    const SAFE: Address = address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52");

    struct FixedBalance(U256);

    #[async_trait]
    impl ChainSimulator for FixedBalance {
        async fn simulate(
            &self,
            _from: Address,
            calls: &[PendingCall],
        ) -> Result<Vec<SimulatedCall>, ChainError> {
            Ok(calls
                .iter()
                .map(|_| SimulatedCall::succeeded(self.0.to_be_bytes::<32>().to_vec(), 30_000))
                .collect())
        }

        async fn latest_timestamp(&self) -> Result<u64, ChainError> {
            Ok(1_700_000_000)
        }
    }

    #[tokio::test]
    async fn records_single_approval() {
        let chain = Arc::new(FixedBalance(U256::from(10u64).pow(U256::from(18))));
        let mut recorder = CallRecorder::new(SAFE, chain);

        Woofy::default().execute(&mut recorder).await.expect("woofy");

        let expected = PendingCall::new(
            CRV,
            IERC20::approveCall {
                spender: ZAP,
                amount: U256::from(420),
            }
            .abi_encode(),
        );
        assert_eq!(recorder.calls(), &[expected]);
    }
}
