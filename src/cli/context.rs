use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use time::{UtcOffset, macros::format_description};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::api::telegram::TelegramSink;
use crate::api::{CowApiClient, SafeTransactionService};
use crate::config::{
    CONFIG_TEMPLATE, ConfigError, LoggingConfig, LoggingProfile, RobowoofyConfig, load_config,
};
use crate::engine::TaskRunner;
use crate::notify::Notifier;
use crate::rpc::RpcChainClient;
use crate::tasks::{CowSell, CowSellSettings, TaskRegistry, Woofy};
use crate::wallet::EnvCredentialSource;

/// 初始化 tracing，兼顾 JSON 与文本输出模式。
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if matches!(config.profile, LoggingProfile::Lean) {
        const QUIET_TARGETS: &[(&str, &str)] = &[
            ("hyper", "warn"),
            ("hyper_util::client::legacy", "warn"),
            ("reqwest", "info"),
            ("rustls", "warn"),
        ];
        for (module, level) in QUIET_TARGETS {
            if !config.level.contains(module) {
                if let Ok(directive) = format!("{module}={level}").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }

    if config.profile.is_verbose() {
        const VERBOSE_TARGETS: &[(&str, &str)] = &[
            ("chain::rpc", "debug"),
            ("safe::service", "debug"),
            ("cow::quote", "debug"),
            ("recorder", "debug"),
        ];
        for (module, level) in VERBOSE_TARGETS {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::from_hms(config.timezone_offset_hours, 0, 0).map_err(|err| {
        anyhow!(
            "invalid logging timezone offset {}: {err}",
            config.timezone_offset_hours
        )
    })?;
    let offset_timer = OffsetTime::new(offset, time_format);

    let base = fmt()
        .with_timer(offset_timer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

/// 加载主配置；用于 `robowoofy --config` 的入口。
pub fn load_configuration(path: Option<PathBuf>) -> Result<RobowoofyConfig, ConfigError> {
    load_config(path)
}

pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("robowoofy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("构建 HTTP 客户端失败")
}

pub fn build_safe_service(
    config: &RobowoofyConfig,
    http: &reqwest::Client,
) -> SafeTransactionService {
    SafeTransactionService::new(
        http.clone(),
        config.safe.service_url.clone(),
        config.safe.origin.clone(),
        Duration::from_millis(config.timeouts.safe_service_ms),
    )
}

pub fn build_cow_client(config: &RobowoofyConfig, http: &reqwest::Client) -> CowApiClient {
    CowApiClient::new(
        http.clone(),
        config.cow.api_url.clone(),
        config.cow.explorer_url.clone(),
        Duration::from_millis(config.timeouts.cow_ms),
    )
}

/// 通知通道；未启用或缺少 Telegram 凭据时退化为仅记录日志。
pub fn build_notifier(config: &RobowoofyConfig, http: &reqwest::Client) -> Notifier {
    if !config.notify.enabled {
        return Notifier::disabled();
    }
    let read = |key: &str| {
        env::var(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let (Some(token), Some(chat_id)) = (
        read(&config.notify.bot_token_env),
        read(&config.notify.chat_id_env),
    ) else {
        warn!(
            target: "notify",
            token_env = %config.notify.bot_token_env,
            chat_env = %config.notify.chat_id_env,
            "未配置 Telegram 凭据，通知仅写入日志"
        );
        return Notifier::disabled();
    };
    let timeout = Duration::from_millis(config.timeouts.notify_ms);
    let sink = TelegramSink::new(
        http.clone(),
        config.notify.telegram_api_url.clone(),
        token,
        chat_id,
        timeout,
    );
    Notifier::new(Arc::new(sink), timeout)
}

pub fn build_task_runner(config: &RobowoofyConfig, http: &reqwest::Client) -> Result<TaskRunner> {
    let safe = config.safe_context()?;
    let rpc_url = config.rpc_url()?.to_string();
    let simulator = Arc::new(RpcChainClient::new(
        http.clone(),
        rpc_url,
        Duration::from_millis(config.timeouts.rpc_ms),
    ));
    let service = Arc::new(build_safe_service(config, http));
    let credentials = Arc::new(EnvCredentialSource::new(config.signer.env_var.clone()));
    let notifier = build_notifier(config, http);
    Ok(TaskRunner::new(safe, simulator, service, credentials, notifier))
}

pub fn build_registry(config: &RobowoofyConfig, http: &reqwest::Client) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    registry.register(Arc::new(Woofy::default()));
    if let Some(cow_sell) = config.tasks.cow_sell.as_ref() {
        let settings = CowSellSettings::from_config(cow_sell, config.cow.deadline_secs)?;
        registry.register(Arc::new(CowSell::new(
            settings,
            build_cow_client(config, http),
            config.cow_app_data()?,
        )));
    }
    Ok(registry)
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    fs::create_dir_all(&output_dir)?;

    let target_path = output_dir.join("robowoofy.toml");
    if target_path.exists() && !args.force {
        println!(
            "跳过 {}（文件已存在，如需覆盖请加 --force）",
            target_path.display()
        );
        return Ok(());
    }

    fs::write(&target_path, CONFIG_TEMPLATE)?;
    info!(target: "config", path = %target_path.display(), "已写入配置模版");
    println!("已写入 {}", target_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::InitCmd;

    #[test]
    fn init_respects_force_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("robowoofy.toml");
        fs::write(&path, "# custom").expect("seed");

        init_configs(InitCmd {
            output: Some(dir.path().to_path_buf()),
            force: false,
        })
        .expect("init");
        assert_eq!(fs::read_to_string(&path).expect("read"), "# custom");

        init_configs(InitCmd {
            output: Some(dir.path().to_path_buf()),
            force: true,
        })
        .expect("init");
        assert_eq!(fs::read_to_string(&path).expect("read"), CONFIG_TEMPLATE);
    }

    #[test]
    fn registry_always_has_woofy() {
        let http = reqwest::Client::new();
        let registry = build_registry(&RobowoofyConfig::default(), &http).expect("registry");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["woofy"]);
    }

    #[test]
    fn runner_requires_safe_and_rpc() {
        let http = reqwest::Client::new();
        let mut config = RobowoofyConfig::default();
        assert!(build_task_runner(&config, &http).is_err());
        config.safe.address = Some("0xFEB4acf3df3cDEA7399794D0869ef76A6EfAff52".to_string());
        config.chain.rpc_url = Some("http://localhost:8545".to_string());
        let runner = build_task_runner(&config, &http).expect("runner");
        assert_eq!(runner.safe().chain_id, 1);
    }
}
