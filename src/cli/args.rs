use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "robowoofy", version, about = "Safe 多签运营任务机器人")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 robowoofy.toml 或 config/robowoofy.toml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 执行任务：记录调用、打包、预览，--live 时签名并提交到 Safe 服务
    Run(RunCmd),
    /// 列出可用任务
    Tasks,
    /// 请求 CoW 报价
    Quote(QuoteCmd),
    /// 查询 Safe 的待用 nonce
    Nonce,
    /// 初始化配置模版文件
    Init(InitCmd),
}

#[derive(Args, Debug)]
pub struct RunCmd {
    #[arg(value_name = "TASK", help = "任务名称，见 `robowoofy tasks`")]
    pub task: String,
    #[arg(long, conflicts_with = "dry_run", help = "签名并提交到 Safe 交易服务")]
    pub live: bool,
    #[arg(long, help = "只预览不提交（默认）")]
    pub dry_run: bool,
    #[arg(long, value_name = "N", help = "指定 Safe nonce；默认使用服务端的待用 nonce")]
    pub nonce: Option<u64>,
}

#[derive(Args, Debug)]
pub struct QuoteCmd {
    #[arg(long, value_name = "ADDRESS", help = "卖出代币地址")]
    pub sell: Address,
    #[arg(long, value_name = "ADDRESS", help = "买入代币地址")]
    pub buy: Address,
    #[arg(long, value_name = "AMOUNT", help = "数量（最小单位整数）")]
    pub amount: String,
    #[arg(long, help = "按买入数量报价（默认按卖出数量）")]
    pub buy_order: bool,
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}
