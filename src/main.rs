use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;

mod commands;
mod modules;

use modules::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "rust-qing")]
#[command(about = "Windows 垃圾清理命令行工具", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 设置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志
    modules::common::logging::init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    // 执行命令
    let result = match cli.command {
        commands::Command::Scan(cmd) => commands::scan::execute(cmd, &settings).await,
        commands::Command::Clean(cmd) => commands::clean::execute(cmd, &settings).await,
        commands::Command::Report(cmd) => commands::report::execute(cmd).await,
    };

    if let Err(e) = result {
        if cli.verbose {
            tracing::error!("错误: {}", e);
        } else {
            eprintln!("错误: {}", e);
        }
        process::exit(1);
    }

    Ok(())
}
