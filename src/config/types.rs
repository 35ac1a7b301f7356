use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RobowoofyConfig {
    #[serde(default)]
    pub safe: SafeConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub cow: CowConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafeConfig {
    /// 操作的多签地址；可被 `ROBOWOOFY_SAFE` 覆盖。
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "super::default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "super::default_safe_service_url")]
    pub service_url: String,
    #[serde(default = "super::default_multisend")]
    pub multisend: String,
    #[serde(default = "super::default_origin")]
    pub origin: String,
    #[serde(default = "super::default_safe_app_url")]
    pub app_url: String,
    #[serde(default = "super::default_network_prefix")]
    pub network_prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainConfig {
    /// 可被 `ROBOWOOFY_RPC_URL` 覆盖。
    #[serde(default)]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CowConfig {
    #[serde(default = "super::default_cow_api_url")]
    pub api_url: String,
    #[serde(default = "super::default_cow_explorer_url")]
    pub explorer_url: String,
    #[serde(default = "super::default_cow_app_data")]
    pub app_data: String,
    #[serde(default = "super::default_deadline_secs")]
    pub deadline_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "super::default_signer_env")]
    pub env_var: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "super::default_true")]
    pub enabled: bool,
    #[serde(default = "super::default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "super::default_bot_token_env")]
    pub bot_token_env: String,
    #[serde(default = "super::default_chat_id_env")]
    pub chat_id_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "super::default_rpc_timeout_ms")]
    pub rpc_ms: u64,
    #[serde(default = "super::default_safe_service_timeout_ms")]
    pub safe_service_ms: u64,
    #[serde(default = "super::default_cow_timeout_ms")]
    pub cow_ms: u64,
    #[serde(default = "super::default_notify_timeout_ms")]
    pub notify_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingProfile {
    #[default]
    Lean,
    Verbose,
}

impl LoggingProfile {
    pub fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub profile: LoggingProfile,
    #[serde(default = "super::default_timezone_offset_hours")]
    pub timezone_offset_hours: i8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub cow_sell: Option<CowSellConfig>,
}

/// `cow-sell` 任务参数；金额为最小单位整数字符串。
#[derive(Debug, Clone, Deserialize)]
pub struct CowSellConfig {
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    #[serde(default = "super::default_slippage_bps")]
    pub slippage_bps: u32,
    #[serde(default = "super::default_true")]
    pub partially_fillable: bool,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}
