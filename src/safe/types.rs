use std::fmt;

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};

use crate::contracts::SafeTx;

/// 单笔链上调用描述，由 `CallRecorder` 在任务执行期间记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub target: Address,
    pub data: Bytes,
    pub value: U256,
}

impl PendingCall {
    pub fn new(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn selector(&self) -> Option<[u8; 4]> {
        let head = self.data.get(..4)?;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(head);
        Some(selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Call,
    DelegateCall,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Operation::Call),
            1 => Some(Operation::DelegateCall),
            _ => None,
        }
    }
}

/// 当前操作的多签钱包，显式传递给各组件。
#[derive(Debug, Clone)]
pub struct SafeContext {
    pub address: Address,
    pub chain_id: u64,
    pub multisend: Address,
    pub app_url: String,
    pub network_prefix: String,
}

impl SafeContext {
    /// Safe Web 界面中对应交易的链接。
    pub fn transaction_url(&self, safe_tx_hash: &B256) -> String {
        let safe = self.address.to_checksum(None);
        format!(
            "{}/transactions/tx?safe={}:{}&id=multisig_{}_{:#x}",
            self.app_url.trim_end_matches('/'),
            self.network_prefix,
            safe,
            safe,
            safe_tx_hash
        )
    }
}

/// 一次任务调用生成的原子批次，绑定到唯一的 Safe nonce。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeTransaction {
    pub safe: Address,
    pub nonce: u64,
    pub calls: Vec<PendingCall>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
}

impl SafeTransaction {
    pub fn calls(&self) -> &[PendingCall] {
        &self.calls
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn to_typed(&self) -> SafeTx {
        SafeTx {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: self.operation.as_u8(),
            safeTxGas: U256::ZERO,
            baseGas: U256::ZERO,
            gasPrice: U256::ZERO,
            gasToken: Address::ZERO,
            refundReceiver: Address::ZERO,
            nonce: U256::from(self.nonce),
        }
    }

    pub fn safe_tx_hash(&self, chain_id: u64) -> B256 {
        let domain = Eip712Domain::new(
            None,
            None,
            Some(U256::from(chain_id)),
            Some(self.safe),
            None,
        );
        self.to_typed().eip712_signing_hash(&domain)
    }
}

impl fmt::Display for SafeTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SafeTx(safe={}, nonce={}, calls={}, to={})",
            self.safe,
            self.nonce,
            self.calls.len(),
            self.to
        )
    }
}

/// 已签名、待提交到 Safe 交易服务的批次。
#[derive(Debug, Clone)]
pub struct SignedSafeTransaction {
    pub transaction: SafeTransaction,
    pub safe_tx_hash: B256,
    pub sender: Address,
    pub signature: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn selector_requires_four_bytes() {
        let target = address!("0x1111111111111111111111111111111111111111");
        assert_eq!(PendingCall::new(target, vec![1u8, 2, 3]).selector(), None);
        assert_eq!(
            PendingCall::new(target, vec![0x09u8, 0x5e, 0xa7, 0xb3, 0xff]).selector(),
            Some([0x09, 0x5e, 0xa7, 0xb3])
        );
    }

    #[test]
    fn safe_tx_hash_binds_nonce() {
        let safe = address!("0x2222222222222222222222222222222222222222");
        let tx = SafeTransaction {
            safe,
            nonce: 7,
            calls: Vec::new(),
            to: address!("0x40A2aCCbd92BCA938b02010E17A5b8929b49130D"),
            value: U256::ZERO,
            data: Bytes::new(),
            operation: Operation::DelegateCall,
        };
        let mut next = tx.clone();
        next.nonce = 8;
        assert_ne!(tx.safe_tx_hash(1), next.safe_tx_hash(1));
        assert_ne!(tx.safe_tx_hash(1), tx.safe_tx_hash(5));
    }

    #[test]
    fn transaction_url_points_at_queue_entry() {
        let context = SafeContext {
            address: address!("0x2222222222222222222222222222222222222222"),
            chain_id: 1,
            multisend: Address::ZERO,
            app_url: "https://app.safe.global/".to_string(),
            network_prefix: "eth".to_string(),
        };
        let url = context.transaction_url(&B256::repeat_byte(0xab));
        assert!(url.starts_with(
            "https://app.safe.global/transactions/tx?safe=eth:0x2222222222222222222222222222222222222222"
        ));
        assert!(url.ends_with(&format!("_0x{}", "ab".repeat(32))));
    }
}
