use std::str::FromStr;

use alloy::primitives::{Address, B256};

use crate::contracts::MULTISEND_CALL_ONLY;
use crate::safe::SafeContext;

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

use self::types as cfg;

/// `robowoofy init` 写出的配置模版。
pub const CONFIG_TEMPLATE: &str = include_str!("template.toml");

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_chain_id() -> u64 {
    1
}

pub(crate) fn default_safe_service_url() -> String {
    "https://safe-transaction-mainnet.safe.global".to_string()
}

pub(crate) fn default_multisend() -> String {
    MULTISEND_CALL_ONLY.to_checksum(None)
}

pub(crate) fn default_origin() -> String {
    "robowoofy".to_string()
}

pub(crate) fn default_safe_app_url() -> String {
    "https://app.safe.global".to_string()
}

pub(crate) fn default_network_prefix() -> String {
    "eth".to_string()
}

pub(crate) fn default_cow_api_url() -> String {
    "https://api.cow.fi/mainnet".to_string()
}

pub(crate) fn default_cow_explorer_url() -> String {
    "https://explorer.cow.fi".to_string()
}

pub(crate) fn default_cow_app_data() -> String {
    "0x2b8694ed30082129598720860e8e972f07aa10d9b81cae16ca0e2cfb24743e24".to_string()
}

pub(crate) fn default_deadline_secs() -> u64 {
    3_600
}

pub(crate) fn default_signer_env() -> String {
    "ROBOWOOFY_SIGNER_PK".to_string()
}

pub(crate) fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

pub(crate) fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

pub(crate) fn default_chat_id_env() -> String {
    "TELEGRAM_CHAT_ID".to_string()
}

pub(crate) fn default_rpc_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_safe_service_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_cow_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_notify_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_timezone_offset_hours() -> i8 {
    0
}

pub(crate) fn default_slippage_bps() -> u32 {
    50
}

impl Default for cfg::RobowoofyConfig {
    fn default() -> Self {
        Self {
            safe: cfg::SafeConfig::default(),
            chain: cfg::ChainConfig::default(),
            cow: cfg::CowConfig::default(),
            signer: cfg::SignerConfig::default(),
            notify: cfg::NotifyConfig::default(),
            timeouts: cfg::TimeoutsConfig::default(),
            logging: cfg::LoggingConfig::default(),
            tasks: cfg::TasksConfig::default(),
        }
    }
}

impl Default for cfg::SafeConfig {
    fn default() -> Self {
        Self {
            address: None,
            chain_id: default_chain_id(),
            service_url: default_safe_service_url(),
            multisend: default_multisend(),
            origin: default_origin(),
            app_url: default_safe_app_url(),
            network_prefix: default_network_prefix(),
        }
    }
}

impl Default for cfg::CowConfig {
    fn default() -> Self {
        Self {
            api_url: default_cow_api_url(),
            explorer_url: default_cow_explorer_url(),
            app_data: default_cow_app_data(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl Default for cfg::SignerConfig {
    fn default() -> Self {
        Self {
            env_var: default_signer_env(),
        }
    }
}

impl Default for cfg::NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            telegram_api_url: default_telegram_api_url(),
            bot_token_env: default_bot_token_env(),
            chat_id_env: default_chat_id_env(),
        }
    }
}

impl Default for cfg::TimeoutsConfig {
    fn default() -> Self {
        Self {
            rpc_ms: default_rpc_timeout_ms(),
            safe_service_ms: default_safe_service_timeout_ms(),
            cow_ms: default_cow_timeout_ms(),
            notify_ms: default_notify_timeout_ms(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
            profile: cfg::LoggingProfile::default(),
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

impl cfg::RobowoofyConfig {
    pub fn safe_address(&self) -> Result<Address, ConfigError> {
        let raw = self
            .safe
            .address
            .as_deref()
            .ok_or(ConfigError::Missing {
                field: "safe.address",
            })?;
        parse_address("safe.address", raw)
    }

    pub fn safe_context(&self) -> Result<SafeContext, ConfigError> {
        Ok(SafeContext {
            address: self.safe_address()?,
            chain_id: self.safe.chain_id,
            multisend: parse_address("safe.multisend", &self.safe.multisend)?,
            app_url: self.safe.app_url.clone(),
            network_prefix: self.safe.network_prefix.clone(),
        })
    }

    pub fn rpc_url(&self) -> Result<&str, ConfigError> {
        let raw = self
            .chain
            .rpc_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing {
                field: "chain.rpc_url",
            })?;
        url::Url::parse(raw).map_err(|err| ConfigError::Invalid {
            field: "chain.rpc_url",
            message: err.to_string(),
        })?;
        Ok(raw)
    }

    pub fn cow_app_data(&self) -> Result<B256, ConfigError> {
        B256::from_str(self.cow.app_data.trim()).map_err(|err| ConfigError::Invalid {
            field: "cow.app_data",
            message: err.to_string(),
        })
    }
}

pub(crate) fn parse_address(field: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw.trim()).map_err(|err| ConfigError::Invalid {
        field,
        message: format!("{raw}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config: RobowoofyConfig = toml::from_str(CONFIG_TEMPLATE).expect("template");
        let defaults = RobowoofyConfig::default();
        assert_eq!(config.safe.service_url, defaults.safe.service_url);
        assert_eq!(config.timeouts.notify_ms, defaults.timeouts.notify_ms);
        assert_eq!(config.cow_app_data().expect("app data"), defaults.cow_app_data().expect("app data"));
    }

    #[test]
    fn safe_context_requires_address() {
        let mut config = RobowoofyConfig::default();
        assert!(matches!(
            config.safe_context(),
            Err(ConfigError::Missing { field: "safe.address" })
        ));

        config.safe.address = Some("0xnot-an-address".to_string());
        assert!(matches!(
            config.safe_context(),
            Err(ConfigError::Invalid { field: "safe.address", .. })
        ));

        config.safe.address = Some("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52".to_string());
        let context = config.safe_context().expect("context");
        assert_eq!(context.multisend, MULTISEND_CALL_ONLY);
        assert_eq!(context.chain_id, 1);
    }

    #[test]
    fn rpc_url_must_be_valid() {
        let mut config = RobowoofyConfig::default();
        assert!(matches!(config.rpc_url(), Err(ConfigError::Missing { .. })));
        config.chain.rpc_url = Some("not a url".to_string());
        assert!(matches!(config.rpc_url(), Err(ConfigError::Invalid { .. })));
        config.chain.rpc_url = Some("http://localhost:8545".to_string());
        assert_eq!(config.rpc_url().expect("url"), "http://localhost:8545");
    }
}
