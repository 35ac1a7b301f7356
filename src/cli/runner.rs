use std::str::FromStr;

use alloy::primitives::U256;
use anyhow::{Result, anyhow};
use tracing::info;

use crate::api::{QuoteRequest, SafeService};
use crate::cli::args::{Cli, Command, QuoteCmd, RunCmd};
use crate::cli::context::{
    build_cow_client, build_http_client, build_registry, build_safe_service, build_task_runner,
    init_configs,
};
use crate::config::RobowoofyConfig;
use crate::engine::RunMode;

pub async fn run(cli: Cli, config: RobowoofyConfig) -> Result<()> {
    match cli.command {
        Command::Init(args) => init_configs(args),
        Command::Tasks => {
            let http = build_http_client()?;
            let registry = build_registry(&config, &http)?;
            for task in registry.iter() {
                println!("{:<12} {}", task.name(), task.description());
            }
            Ok(())
        }
        Command::Run(cmd) => run_task(cmd, &config).await,
        Command::Quote(cmd) => quote(cmd, &config).await,
        Command::Nonce => {
            let http = build_http_client()?;
            let safe = config.safe_address()?;
            let nonce = build_safe_service(&config, &http)
                .pending_nonce(safe)
                .await?;
            println!("{nonce}");
            Ok(())
        }
    }
}

async fn run_task(cmd: RunCmd, config: &RobowoofyConfig) -> Result<()> {
    let http = build_http_client()?;
    let registry = build_registry(config, &http)?;
    let task = registry.get(&cmd.task).ok_or_else(|| {
        anyhow!(
            "未知任务 {}，可用任务: {}",
            cmd.task,
            registry.names().collect::<Vec<_>>().join(", ")
        )
    })?;
    let runner = build_task_runner(config, &http)?;
    let mode = RunMode::from_live_flag(cmd.live);

    let transaction = runner.run(task.as_ref(), mode, cmd.nonce).await?;
    info!(
        target: "runner",
        mode = mode.label(),
        transaction = %transaction,
        "任务调用结束"
    );
    println!("{transaction}");
    Ok(())
}

async fn quote(cmd: QuoteCmd, config: &RobowoofyConfig) -> Result<()> {
    let amount = U256::from_str(cmd.amount.trim())
        .map_err(|err| anyhow!("数量非法 {}: {err}", cmd.amount))?;
    let from = config.safe_address()?;
    let request = if cmd.buy_order {
        QuoteRequest::buy(from, cmd.sell, cmd.buy, amount)
    } else {
        QuoteRequest::sell(from, cmd.sell, cmd.buy, amount)
    };

    let http = build_http_client()?;
    let quote = build_cow_client(config, &http).quote(&request).await?;
    println!("sell_amount = {}", quote.sell_amount);
    println!("buy_amount  = {}", quote.buy_amount);
    println!("fee_amount  = {}", quote.fee_amount);
    println!("quote_id    = {}", quote.quote_id);
    println!("verified    = {}", quote.verified);
    Ok(())
}
