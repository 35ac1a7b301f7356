use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use thiserror::Error;

use crate::contracts::MultiSendCallOnly;

use super::types::{Operation, PendingCall};

// operation(1) + to(20) + value(32) + data length(32)
const ENTRY_HEADER_LEN: usize = 85;

#[derive(Debug, Error)]
pub enum MultisendError {
    #[error("multiSend 调用数据解码失败: {0}")]
    Abi(#[from] alloy::sol_types::Error),
    #[error("multisend 第 {index} 笔条目截断（偏移 {offset}）")]
    Truncated { index: usize, offset: usize },
    #[error("multisend 第 {index} 笔条目包含未知操作类型 {operation}")]
    UnknownOperation { index: usize, operation: u8 },
    #[error("multisend 第 {index} 笔条目使用了 delegatecall")]
    DelegateCall { index: usize },
}

/// 按 MultiSend 紧凑格式拼接调用，顺序与记录顺序一致。
pub fn encode_packed(calls: &[PendingCall]) -> Vec<u8> {
    let capacity = calls
        .iter()
        .map(|call| ENTRY_HEADER_LEN + call.data.len())
        .sum();
    let mut packed = Vec::with_capacity(capacity);
    for call in calls {
        packed.push(Operation::Call.as_u8());
        packed.extend_from_slice(call.target.as_slice());
        packed.extend_from_slice(&call.value.to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(call.data.len()).to_be_bytes::<32>());
        packed.extend_from_slice(&call.data);
    }
    packed
}

/// 生成 `multiSend(bytes)` 调用数据；空列表得到合法的空批次。
pub fn encode_multisend(calls: &[PendingCall]) -> Bytes {
    MultiSendCallOnly::multiSendCall {
        transactions: encode_packed(calls).into(),
    }
    .abi_encode()
    .into()
}

/// 从 `multiSend(bytes)` 调用数据还原调用列表。
pub fn decode_multisend(data: &[u8]) -> Result<Vec<PendingCall>, MultisendError> {
    let call = MultiSendCallOnly::multiSendCall::abi_decode(data)?;
    decode_packed(&call.transactions)
}

fn decode_packed(packed: &[u8]) -> Result<Vec<PendingCall>, MultisendError> {
    let mut calls = Vec::new();
    let mut offset = 0usize;
    while offset < packed.len() {
        let index = calls.len();
        let header = packed
            .get(offset..offset + ENTRY_HEADER_LEN)
            .ok_or(MultisendError::Truncated { index, offset })?;

        match Operation::from_u8(header[0]) {
            Some(Operation::Call) => {}
            Some(Operation::DelegateCall) => return Err(MultisendError::DelegateCall { index }),
            None => {
                return Err(MultisendError::UnknownOperation {
                    index,
                    operation: header[0],
                });
            }
        }

        let target = Address::from_slice(&header[1..21]);
        let value = U256::from_be_slice(&header[21..53]);
        let data_len = U256::from_be_slice(&header[53..85]);
        if data_len > U256::from(packed.len()) {
            return Err(MultisendError::Truncated { index, offset });
        }
        let data_len = data_len.to::<usize>();

        let data_start = offset + ENTRY_HEADER_LEN;
        let data = packed
            .get(data_start..data_start + data_len)
            .ok_or(MultisendError::Truncated { index, offset })?;

        calls.push(PendingCall {
            target,
            data: Bytes::copy_from_slice(data),
            value,
        });
        offset = data_start + data_len;
    }
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn empty_batch_is_valid_multisend() {
        let data = encode_multisend(&[]);
        assert_eq!(&data[..4], MultiSendCallOnly::multiSendCall::SELECTOR.as_slice());
        assert!(decode_multisend(&data).expect("decode").is_empty());
    }

    #[test]
    fn packed_layout_matches_multisend_format() {
        let target = address!("0xD533a949740bb3306d119CC777fa900bA034cd52");
        let call = PendingCall::new(target, vec![0xaa, 0xbb]).with_value(U256::from(3u8));
        let packed = encode_packed(std::slice::from_ref(&call));

        assert_eq!(packed.len(), ENTRY_HEADER_LEN + 2);
        assert_eq!(packed[0], 0);
        assert_eq!(&packed[1..21], target.as_slice());
        assert_eq!(packed[52], 3);
        assert_eq!(packed[84], 2);
        assert_eq!(&packed[85..], &[0xaa, 0xbb]);
    }

    #[test]
    fn decode_keeps_call_order() {
        let a = PendingCall::new(address!("0x1111111111111111111111111111111111111111"), vec![1u8]);
        let b = PendingCall::new(address!("0x2222222222222222222222222222222222222222"), vec![2u8, 2]);
        let decoded = decode_multisend(&encode_multisend(&[a.clone(), b.clone()])).expect("decode");
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn decode_rejects_delegatecall_entries() {
        let mut packed = encode_packed(&[PendingCall::new(Address::ZERO, Vec::<u8>::new())]);
        packed[0] = 1;
        let err = decode_packed(&packed).expect_err("delegatecall must be rejected");
        assert!(matches!(err, MultisendError::DelegateCall { index: 0 }));
    }

    #[test]
    fn decode_reports_truncated_entry() {
        let packed = encode_packed(&[PendingCall::new(Address::ZERO, vec![9u8; 4])]);
        let err = decode_packed(&packed[..packed.len() - 1]).expect_err("truncated");
        assert!(matches!(err, MultisendError::Truncated { index: 0, .. }));
    }
}
