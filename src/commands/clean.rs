use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use super::ScopeArgs;
use crate::modules::backend::SystemBackend;
use crate::modules::classifier::models::CleanupItem;
use crate::modules::cleaner::models::{CleanEvent, CleanOptions};
use crate::modules::cleaner::CleanExecutor;
use crate::modules::common::cancel::CancelFlag;
use crate::modules::common::utils;
use crate::modules::config::Settings;
use crate::modules::reporter::{self, models::CleaningReport};

#[derive(Parser, Debug)]
pub struct CleanCommand {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// 确认删除 (不指定则预览)
    #[arg(long)]
    pub confirm: bool,

    /// 排除的清理项 ID 或 ID 前缀 (可多次指定)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// 每批删除的数量
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// 生成报告
    #[arg(long)]
    pub report: bool,

    /// HTML 报告输出路径
    #[arg(long)]
    pub report_path: Option<String>,
}

pub async fn execute(cmd: CleanCommand, settings: &Settings) -> Result<()> {
    let cancel = CancelFlag::new();
    super::cancel_on_ctrl_c(cancel.clone());

    // 1. 扫描
    println!("正在扫描...");
    let outcome = super::run_scan(&cmd.scope, settings, cancel.clone()).await?;
    if cancel.is_cancelled() {
        println!("扫描被取消，不执行清理");
        return Ok(());
    }

    let scan_simulated = outcome.simulated;
    let selected = select_items(outcome.items, &cmd.exclude);
    println!("找到 {} 个可清理项\n", selected.len());

    // 2. 预览模式 (不确认)
    if !cmd.confirm {
        println!("=== 预览模式 ===");
        println!("使用 --confirm 确认删除");
        super::print_items(&selected);
        return Ok(());
    }

    if selected.is_empty() {
        println!("没有需要清理的内容");
        return Ok(());
    }

    // 3. 分批删除
    println!("=== 开始清理 ===\n");
    let defaults = settings.clean_options();
    let options = CleanOptions::new(
        cmd.batch_size.unwrap_or(defaults.batch_size),
        defaults.inter_batch_delay,
    );
    let backend = clean_backend(&cmd.scope, settings, scan_simulated);
    let executor = CleanExecutor::new(backend, options).with_cancel_flag(cancel);

    let (mut rx, handle) = executor.start(selected.clone());
    while let Some(event) = rx.recv().await {
        match event {
            CleanEvent::CurrentItem { name, .. } => {
                tracing::debug!("正在删除: {}", name);
            }
            CleanEvent::Progress(progress) => {
                let eta = progress
                    .estimated_seconds_left
                    .map(|s| format!("剩余约 {} 秒", s))
                    .unwrap_or_default();
                eprint!(
                    "\r[{}/{}] 已释放 {:<12} {:<30}",
                    progress.items_done,
                    progress.items_total,
                    utils::format_size(progress.bytes_done),
                    eta
                );
            }
        }
    }
    eprintln!();
    let result = handle.await?;

    // 4. 统计结果
    println!("\n--- 清理完成 ({} 项) ---", result.total_items());
    println!("  成功: {}", result.deleted_item_ids.len());
    println!("  失败: {}", result.failed_items.len());
    println!("  跳过: {}", result.skipped_item_ids.len());
    println!("  释放空间: {}", utils::format_size(result.bytes_freed));
    if result.simulated {
        println!("  (模拟清理，未删除真实文件)");
    }
    if result.cancelled {
        println!("  (清理已取消)");
    }
    for failed in &result.failed_items {
        println!("  失败 {}: {}", super::short_id(&failed.id), failed.error_reason);
    }

    // 5. 生成报告
    if cmd.report {
        let report = CleaningReport::new(&selected, &result);
        let saved = reporter::save_report(&reporter::reports_dir(), &report)?;
        let html_path = cmd
            .report_path
            .unwrap_or_else(|| saved.with_extension("html").to_string_lossy().to_string());
        std::fs::write(&html_path, reporter::html::generate_html_report(&report))?;
        println!("\n报告已生成: {}", html_path);
    }

    Ok(())
}

/// 扫描结果来自模拟数据时，清理也只能走模拟后端
fn clean_backend(
    scope: &ScopeArgs,
    settings: &Settings,
    scan_simulated: bool,
) -> Option<Arc<dyn SystemBackend>> {
    if scan_simulated {
        tracing::info!("扫描结果为模拟数据，清理同样使用模拟后端");
        return None;
    }
    scope.backend(settings)
}

/// 只保留允许删除且未被排除的项
fn select_items(items: Vec<CleanupItem>, exclude: &[String]) -> Vec<CleanupItem> {
    items
        .into_iter()
        .filter(|item| item.can_delete)
        .filter(|item| !exclude.iter().any(|e| !e.is_empty() && item.id.starts_with(e.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::classifier::models::{ItemCategory, RiskLevel};
    use crate::modules::scanner::models::CandidateKind;

    fn item(id: &str, can_delete: bool) -> CleanupItem {
        CleanupItem {
            id: id.to_string(),
            name: id.to_string(),
            path: format!(r"C:\Temp\{}", id),
            size_bytes: 1,
            category: ItemCategory::System,
            risk_level: RiskLevel::Safe,
            can_delete,
            suggestion: String::new(),
            last_modified: None,
            kind: CandidateKind::SystemTemp,
            retained: false,
        }
    }

    #[test]
    fn selection_drops_excluded_and_undeletable_items() {
        let items = vec![
            item("aaaa1111", true),
            item("bbbb2222", false),
            item("cccc3333", true),
        ];

        let selected = select_items(items, &["cccc".to_string(), String::new()]);

        let ids: Vec<&str> = selected.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["aaaa1111"]);
    }

    #[test]
    fn simulated_scan_never_cleans_with_the_real_backend() {
        let scope = ScopeArgs {
            category: Vec::new(),
            quick: false,
            simulate: false,
        };
        let settings = Settings::default();
        assert!(settings.use_real_backend);

        assert!(clean_backend(&scope, &settings, true).is_none());
        assert!(clean_backend(&scope, &settings, false).is_some());
    }
}
