use std::sync::Arc;

use alloy::primitives::B256;
use tracing::info;

use crate::api::SafeService;
use crate::safe::{SafeContext, SafeTransaction};
use crate::wallet::{self, CredentialSource};

use super::error::TaskError;

/// 加载凭据、签名并提交到 Safe 交易服务。仅在 live 模式下调用。
pub struct Submitter {
    service: Arc<dyn SafeService>,
    credentials: Arc<dyn CredentialSource>,
}

impl Submitter {
    pub fn new(service: Arc<dyn SafeService>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            service,
            credentials,
        }
    }

    pub async fn submit(
        &self,
        safe: &SafeContext,
        transaction: &SafeTransaction,
    ) -> Result<B256, TaskError> {
        // 每次都重新加载，不复用任何已解析的签名身份。
        let credential = self.credentials.load()?;
        info!(
            target: "signer",
            source = credential.source(),
            nonce = transaction.nonce,
            "已加载签名凭据"
        );
        let signed = wallet::sign_transaction(credential, transaction, safe.chain_id)?;

        self.service
            .post_transaction(&signed)
            .await
            .map_err(TaskError::Submission)?;
        Ok(signed.safe_tx_hash)
    }
}
