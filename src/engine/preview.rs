use std::fmt;
use std::sync::Arc;

use alloy::hex;
use alloy::primitives::{Address, U256, address};
use alloy::sol_types::{SolCall, SolEvent};
use tracing::info;

use crate::contracts::{GPv2Settlement, IERC20};
use crate::rpc::{ChainSimulator, SimulatedCall, SimulatedLog};
use crate::safe::{PendingCall, SafeTransaction};

use super::error::SimulationError;

/// `traceTransfers` 用来表示原生 ETH 转账的伪地址。
const NATIVE_TRANSFER_EMITTER: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    pub index: usize,
    pub target: Address,
    pub call: String,
    pub gas_used: u64,
    pub effects: Vec<String>,
}

/// 批次的人类可读调用轨迹。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub safe: Address,
    pub nonce: u64,
    pub lines: Vec<PreviewLine>,
    pub total_gas: u64,
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Safe {} · nonce {} · {} 笔调用",
            self.safe,
            self.nonce,
            self.lines.len()
        )?;
        for line in &self.lines {
            writeln!(
                f,
                "  #{} {} {} gas={}",
                line.index, line.target, line.call, line.gas_used
            )?;
            for effect in &line.effects {
                writeln!(f, "      ↳ {effect}")?;
            }
        }
        write!(f, "总 gas: {}", self.total_gas)
    }
}

/// 在当前链状态上模拟整笔批次，只读，不改变任何状态。
///
/// 模拟的是记录下来的原始调用（以 Safe 为 `from` 依次执行），并不执行
/// 编译后发往 MultiSendCallOnly 的 `to`/`data`；打包编码本身由
/// `safe::multisend` 的解码测试覆盖。
pub struct Previewer {
    simulator: Arc<dyn ChainSimulator>,
}

impl Previewer {
    pub fn new(simulator: Arc<dyn ChainSimulator>) -> Self {
        Self { simulator }
    }

    pub async fn preview(&self, transaction: &SafeTransaction) -> Result<Preview, SimulationError> {
        let calls = transaction.calls();
        let results = if calls.is_empty() {
            Vec::new()
        } else {
            self.simulator.simulate(transaction.safe, calls).await?
        };
        if results.len() != calls.len() {
            return Err(SimulationError::Incomplete {
                expected: calls.len(),
                actual: results.len(),
            });
        }

        let lines: Vec<PreviewLine> = calls
            .iter()
            .zip(&results)
            .enumerate()
            .map(|(index, (call, result))| render_line(index, call, result))
            .collect();
        let preview = Preview {
            safe: transaction.safe,
            nonce: transaction.nonce,
            total_gas: lines.iter().map(|line| line.gas_used).sum(),
            lines,
        };
        info!(target: "preview", "批次预览\n{preview}");

        if let Some((index, failed)) = results.iter().enumerate().find(|(_, r)| !r.success) {
            return Err(SimulationError::Reverted {
                index,
                target: calls[index].target,
                reason: failed
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            });
        }
        Ok(preview)
    }
}

fn render_line(index: usize, call: &PendingCall, result: &SimulatedCall) -> PreviewLine {
    let mut effects: Vec<String> = result.logs.iter().filter_map(describe_log).collect();
    if !result.success {
        effects.push(format!(
            "REVERT: {}",
            result.revert_reason.as_deref().unwrap_or("execution reverted")
        ));
    }
    PreviewLine {
        index,
        target: call.target,
        call: describe_call(call),
        gas_used: result.gas_used,
        effects,
    }
}

/// 解码已知函数选择器；未知调用显示选择器与数据长度。
pub fn describe_call(call: &PendingCall) -> String {
    let mut rendered = decode_known(call).unwrap_or_else(|| match call.selector() {
        Some(selector) => format!(
            "{}(<{} bytes>)",
            hex::encode_prefixed(selector),
            call.data.len() - 4
        ),
        None if call.data.is_empty() => "fallback()".to_string(),
        None => format!("<{} bytes>", call.data.len()),
    });
    if !call.value.is_zero() {
        rendered.push_str(&format!(" value={}", call.value));
    }
    rendered
}

fn decode_known(call: &PendingCall) -> Option<String> {
    let selector = call.selector()?;
    let data = &call.data;
    if selector == IERC20::approveCall::SELECTOR {
        let decoded = IERC20::approveCall::abi_decode(data).ok()?;
        Some(format!(
            "approve(spender={}, amount={})",
            decoded.spender, decoded.amount
        ))
    } else if selector == IERC20::transferCall::SELECTOR {
        let decoded = IERC20::transferCall::abi_decode(data).ok()?;
        Some(format!("transfer(to={}, amount={})", decoded.to, decoded.amount))
    } else if selector == IERC20::transferFromCall::SELECTOR {
        let decoded = IERC20::transferFromCall::abi_decode(data).ok()?;
        Some(format!(
            "transferFrom(from={}, to={}, amount={})",
            decoded.from, decoded.to, decoded.amount
        ))
    } else if selector == GPv2Settlement::setPreSignatureCall::SELECTOR {
        let decoded = GPv2Settlement::setPreSignatureCall::abi_decode(data).ok()?;
        Some(format!(
            "setPreSignature(orderUid={}, signed={})",
            hex::encode_prefixed(&decoded.orderUid),
            decoded.signed
        ))
    } else {
        None
    }
}

fn describe_log(log: &SimulatedLog) -> Option<String> {
    let (topic0, indexed) = log.topics.split_first()?;
    if indexed.len() != 2 {
        return None;
    }
    let first = Address::from_word(indexed[0]);
    let second = Address::from_word(indexed[1]);
    let value = U256::try_from_be_slice(&log.data)?;
    let asset = if log.address == NATIVE_TRANSFER_EMITTER {
        "ETH".to_string()
    } else {
        log.address.to_string()
    };

    if *topic0 == IERC20::Transfer::SIGNATURE_HASH {
        Some(format!("Transfer {asset}: {first} → {second} {value}"))
    } else if *topic0 == IERC20::Approval::SIGNATURE_HASH {
        Some(format!("Approval {asset}: {first} → {second} {value}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, Bytes};

    fn approve_call(amount: u64) -> PendingCall {
        PendingCall::new(
            address!("0xD533a949740bb3306d119CC777fa900bA034cd52"),
            IERC20::approveCall {
                spender: address!("0x094d12e5b541784701FD8d65F11fc0598FBC6332"),
                amount: U256::from(amount),
            }
            .abi_encode(),
        )
    }

    #[test]
    fn decodes_known_selectors() {
        let rendered = describe_call(&approve_call(420));
        assert_eq!(
            rendered,
            "approve(spender=0x094d12e5b541784701FD8d65F11fc0598FBC6332, amount=420)"
        );

        let presign = PendingCall::new(
            crate::contracts::GPV2_SETTLEMENT,
            GPv2Settlement::setPreSignatureCall {
                orderUid: Bytes::from(vec![0xab, 0xcd]),
                signed: true,
            }
            .abi_encode(),
        );
        assert_eq!(
            describe_call(&presign),
            "setPreSignature(orderUid=0xabcd, signed=true)"
        );
    }

    #[test]
    fn unknown_calls_show_selector_and_length() {
        let call = PendingCall::new(Address::ZERO, vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01])
            .with_value(U256::from(7));
        assert_eq!(describe_call(&call), "0xdeadbeef(<2 bytes>) value=7");
        assert_eq!(describe_call(&PendingCall::new(Address::ZERO, Vec::<u8>::new())), "fallback()");
    }

    #[test]
    fn renders_approval_log() {
        let owner = address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52");
        let spender = address!("0x094d12e5b541784701FD8d65F11fc0598FBC6332");
        let log = SimulatedLog {
            address: address!("0xD533a949740bb3306d119CC777fa900bA034cd52"),
            topics: vec![
                IERC20::Approval::SIGNATURE_HASH,
                owner.into_word(),
                spender.into_word(),
            ],
            data: Bytes::from(U256::from(420).to_be_bytes::<32>().to_vec()),
        };
        let rendered = describe_log(&log).expect("approval");
        assert!(rendered.starts_with("Approval 0xD533"));
        assert!(rendered.ends_with("420"));

        let unrelated = SimulatedLog {
            topics: vec![B256::ZERO, B256::ZERO, B256::ZERO],
            ..log
        };
        assert!(describe_log(&unrelated).is_none());
    }
}
