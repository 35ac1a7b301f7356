//! 多签提案签名：加载凭据、校验批次、生成 Safe 签名。

mod credential;

use alloy::primitives::Bytes;
use alloy::signers::SignerSync;
use thiserror::Error;
use tracing::info;

use crate::safe::{SafeTransaction, SignedSafeTransaction, decode_multisend};

pub use credential::{CredentialSource, EnvCredentialSource, SigningCredential};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("环境变量 {var} 未配置签名私钥")]
    CredentialMissing { var: String },
    #[error("签名私钥（{source_name}）格式非法: {reason}")]
    InvalidKey { source_name: String, reason: String },
    #[error("批次交易不合法: {0}")]
    MalformedTransaction(String),
    #[error("签名失败: {0}")]
    Signing(#[from] alloy::signers::Error),
}

/// 用凭据对批次签名。凭据在函数返回时被丢弃，不会跨调用复用。
pub fn sign_transaction(
    credential: SigningCredential,
    transaction: &SafeTransaction,
    chain_id: u64,
) -> Result<SignedSafeTransaction, SignerError> {
    ensure_well_formed(transaction)?;

    let signer = credential.into_signer()?;
    let safe_tx_hash = transaction.safe_tx_hash(chain_id);
    let signature = signer.sign_hash_sync(&safe_tx_hash)?;
    let sender = signer.address();
    drop(signer);

    info!(
        target: "signer",
        safe = %transaction.safe,
        nonce = transaction.nonce,
        sender = %sender,
        safe_tx_hash = %safe_tx_hash,
        "已签名多签批次"
    );

    Ok(SignedSafeTransaction {
        transaction: transaction.clone(),
        safe_tx_hash,
        sender,
        signature: Bytes::copy_from_slice(&signature.as_bytes()),
    })
}

/// 签名覆盖的调用数据必须与批次记录的调用序列一致。
fn ensure_well_formed(transaction: &SafeTransaction) -> Result<(), SignerError> {
    let decoded = decode_multisend(&transaction.data)
        .map_err(|err| SignerError::MalformedTransaction(err.to_string()))?;
    if decoded != transaction.calls {
        return Err(SignerError::MalformedTransaction(format!(
            "multisend 数据包含 {} 笔调用，与记录的 {} 笔不一致",
            decoded.len(),
            transaction.calls.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Signature, U256, address};

    use crate::safe::{Operation, PendingCall, encode_multisend};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sample_transaction() -> SafeTransaction {
        let calls = vec![PendingCall::new(
            address!("0xD533a949740bb3306d119CC777fa900bA034cd52"),
            vec![0x09u8, 0x5e, 0xa7, 0xb3],
        )];
        SafeTransaction {
            safe: address!("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52"),
            nonce: 11,
            data: encode_multisend(&calls),
            calls,
            to: address!("0x40A2aCCbd92BCA938b02010E17A5b8929b49130D"),
            value: U256::ZERO,
            operation: Operation::DelegateCall,
        }
    }

    #[test]
    fn signature_recovers_to_signer() {
        let tx = sample_transaction();
        let credential = SigningCredential::new(TEST_KEY.to_string(), "test");
        let signed = sign_transaction(credential, &tx, 1).expect("sign");

        assert_eq!(signed.safe_tx_hash, tx.safe_tx_hash(1));
        assert_eq!(signed.signature.len(), 65);
        assert!(matches!(signed.signature[64], 27 | 28));

        let signature = Signature::from_raw(&signed.signature).expect("signature");
        let recovered: Address = signature
            .recover_address_from_prehash(&signed.safe_tx_hash)
            .expect("recover");
        assert_eq!(recovered, signed.sender);
    }

    #[test]
    fn tampered_call_sequence_is_rejected() {
        let mut tx = sample_transaction();
        tx.calls.push(PendingCall::new(Address::ZERO, vec![1u8]));
        let credential = SigningCredential::new(TEST_KEY.to_string(), "test");
        let err = sign_transaction(credential, &tx, 1).expect_err("mismatch");
        assert!(matches!(err, SignerError::MalformedTransaction(_)));
    }
}
