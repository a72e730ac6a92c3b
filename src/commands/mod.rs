pub mod scan;
pub mod clean;
pub mod report;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::modules::backend::native::NativeBackend;
use crate::modules::backend::SystemBackend;
use crate::modules::classifier::models::CleanupItem;
use crate::modules::classifier::Classifier;
use crate::modules::config::Settings;
use crate::modules::orchestrator::models::{ScanEvent, ScanOutcome, ScanRequest, ScanStage};
use crate::modules::orchestrator::ScanOrchestrator;
use crate::modules::scanner::models::ScanCategory;
use crate::modules::common::cancel::CancelFlag;
use crate::modules::common::utils;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 扫描可清理的内容
    Scan(scan::ScanCommand),

    /// 清理扫描结果
    Clean(clean::CleanCommand),

    /// 查看清理报告
    Report(report::ReportCommand),
}

/// scan 和 clean 共用的扫描范围参数
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    /// 扫描类别 (可多次指定): system_cache|logs|windows_update|privacy|memory|network|software_remnants|registry_remnants|chat_apps
    #[arg(short, long)]
    pub category: Vec<String>,

    /// 快速扫描 (系统缓存、日志、网络)
    #[arg(long)]
    pub quick: bool,

    /// 使用模拟后端，不访问真实系统
    #[arg(long)]
    pub simulate: bool,
}

impl ScopeArgs {
    pub fn categories(&self) -> Result<Vec<ScanCategory>> {
        if !self.category.is_empty() {
            return self
                .category
                .iter()
                .map(|name| {
                    ScanCategory::parse(name)
                        .ok_or_else(|| anyhow::anyhow!("未知的扫描类别: {}", name))
                })
                .collect();
        }
        if self.quick {
            return Ok(ScanCategory::QUICK.to_vec());
        }
        Ok(ScanCategory::ALL.to_vec())
    }

    /// `None` 表示使用模拟后端
    pub fn backend(&self, settings: &Settings) -> Option<Arc<dyn SystemBackend>> {
        if self.simulate || !settings.use_real_backend {
            tracing::info!("使用模拟后端");
            return None;
        }
        Some(Arc::new(NativeBackend::default()))
    }
}

/// 运行扫描并在标准错误上显示进度
pub async fn run_scan(scope: &ScopeArgs, settings: &Settings, cancel: CancelFlag) -> Result<ScanOutcome> {
    let categories = scope.categories()?;
    let orchestrator = ScanOrchestrator::new(
        scope.backend(settings),
        Classifier::new(settings.enrichment.clone()),
    )
    .with_cancel_flag(cancel);

    let (mut rx, handle) = orchestrator.start(ScanRequest::new(categories, settings.retention));
    while let Some(event) = rx.recv().await {
        if let ScanEvent::Progress(progress) = event {
            eprint!(
                "\r[{:>3}%] {:<40}",
                progress.current_units * 100 / progress.total_units.max(1),
                truncate_string(&progress.current_label, 38)
            );
        }
    }
    eprintln!();

    let outcome = handle.await?;
    for failure in &outcome.failures {
        eprintln!("  {} 扫描失败: {}", failure.category, failure.error);
    }
    match outcome.stage {
        ScanStage::Error => anyhow::bail!("所有类别都扫描失败"),
        ScanStage::Cancelled => eprintln!("扫描已取消，显示已找到的结果"),
        _ => {}
    }
    if outcome.simulated {
        eprintln!("注意: 结果来自模拟数据");
    }
    Ok(outcome)
}

/// Ctrl-C 时设置取消标记
pub fn cancel_on_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n正在取消，等待当前步骤完成...");
            cancel.cancel();
        }
    });
}

pub fn print_items(items: &[CleanupItem]) {
    println!("\n{}", "=".repeat(110));
    println!(
        "{:<10} {:<8} {:<10} {:>12}  {:<36} {}",
        "ID", "风险", "类别", "大小", "名称", "建议"
    );
    println!("{}", "=".repeat(110));

    for item in items {
        println!(
            "{:<10} {:<8} {:<10} {:>12}  {:<36} {}",
            short_id(&item.id),
            item.risk_level.label(),
            item.category.label(),
            utils::format_size(item.size_bytes),
            truncate_string(&item.name, 34),
            item.suggestion
        );
    }

    println!("{}", "=".repeat(110));
    let total: u64 = items.iter().map(|i| i.size_bytes).sum();
    println!("总计: {} 项，{}\n", items.len(), utils::format_size(total));
}

pub fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    // 按字符截断，中文不会被切开
    if s.chars().count() > max_len {
        let chars: String = s.chars().take(max_len.saturating_sub(2)).collect();
        format!("{}..", chars)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(category: &[&str], quick: bool) -> ScopeArgs {
        ScopeArgs {
            category: category.iter().map(|c| c.to_string()).collect(),
            quick,
            simulate: false,
        }
    }

    #[test]
    fn categories_follow_flags() {
        assert_eq!(scope(&[], false).categories().unwrap(), ScanCategory::ALL.to_vec());
        assert_eq!(scope(&[], true).categories().unwrap(), ScanCategory::QUICK.to_vec());
        assert_eq!(
            scope(&["chat", "logs"], true).categories().unwrap(),
            vec![ScanCategory::ChatApps, ScanCategory::Logs]
        );
        assert!(scope(&["bogus"], false).categories().is_err());
    }

    #[test]
    fn simulate_flag_or_setting_disables_real_backend() {
        let mut settings = Settings::default();
        let mut args = scope(&[], false);
        assert!(args.backend(&settings).is_some());

        args.simulate = true;
        assert!(args.backend(&settings).is_none());

        args.simulate = false;
        settings.use_real_backend = false;
        assert!(args.backend(&settings).is_none());
    }

    #[test]
    fn truncates_by_chars() {
        assert_eq!(truncate_string("微信图片缓存目录", 6), "微信图片..");
        assert_eq!(truncate_string("abc", 6), "abc");
    }
}
