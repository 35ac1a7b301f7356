use std::env;
use std::fmt;

use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use super::SignerError;

/// 签名私钥。仅在提交前加载，用完即丢弃，内存在 drop 时清零。
pub struct SigningCredential {
    secret: Zeroizing<String>,
    source: String,
}

impl SigningCredential {
    pub fn new(secret: String, source: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 解析为本地签名器，消耗凭据。
    pub(crate) fn into_signer(self) -> Result<PrivateKeySigner, SignerError> {
        let trimmed = self.secret.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        hex.parse::<PrivateKeySigner>()
            .map_err(|err| SignerError::InvalidKey {
                source_name: self.source.clone(),
                reason: err.to_string(),
            })
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("source", &self.source)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// 私钥来源；每次调用 `load` 都重新读取，不做缓存。
pub trait CredentialSource: Send + Sync {
    fn describe(&self) -> String;

    fn load(&self) -> Result<SigningCredential, SignerError>;
}

/// 从指定环境变量读取私钥。
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    var: String,
}

impl EnvCredentialSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn describe(&self) -> String {
        format!("env:{}", self.var)
    }

    fn load(&self) -> Result<SigningCredential, SignerError> {
        match env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(SigningCredential::new(value, self.describe()))
            }
            Ok(_) | Err(env::VarError::NotPresent) => Err(SignerError::CredentialMissing {
                var: self.var.clone(),
            }),
            Err(env::VarError::NotUnicode(_)) => Err(SignerError::InvalidKey {
                source_name: self.describe(),
                reason: "环境变量包含非 UTF-8 内容".to_string(),
            }),
        }
    }
}
