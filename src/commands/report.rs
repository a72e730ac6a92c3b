use anyhow::Result;
use clap::Parser;

use crate::modules::common::utils;
use crate::modules::reporter::{self, html, models::CleaningReport};

#[derive(Parser, Debug)]
pub struct ReportCommand {
    /// 报告文件路径或报告 ID (不指定则显示最近一次)
    pub identifier: Option<String>,

    /// 查看所有报告列表
    #[arg(long)]
    pub list: bool,

    /// 输出 HTML 文件
    #[arg(long)]
    pub html: Option<String>,
}

pub async fn execute(cmd: ReportCommand) -> Result<()> {
    let reports_dir = reporter::reports_dir();

    if cmd.list {
        // 列出所有报告
        println!("清理报告目录: {}\n", reports_dir.display());

        let reports = reporter::list_reports(&reports_dir)?;
        if reports.is_empty() {
            println!("暂无报告文件");
            return Ok(());
        }

        for saved in &reports {
            println!(
                "  {}  {}  释放 {}",
                super::short_id(&saved.id),
                saved.generated_at.format("%Y-%m-%d %H:%M"),
                utils::format_size(saved.bytes_freed)
            );
        }
        println!("\n共 {} 个报告", reports.len());
        return Ok(());
    }

    let report = match &cmd.identifier {
        Some(identifier) => reporter::find_report(&reports_dir, identifier)?,
        None => match reporter::list_reports(&reports_dir)?.first() {
            Some(latest) => Some(reporter::load_report(&latest.path)?),
            None => None,
        },
    };

    let Some(report) = report else {
        println!("未找到报告: {}", cmd.identifier.as_deref().unwrap_or("最近一次"));
        println!("使用 --list 查看所有报告");
        return Ok(());
    };

    match &cmd.html {
        Some(path) => {
            std::fs::write(path, html::generate_html_report(&report))?;
            println!("报告已保存到: {}", path);
        }
        None => print_summary(&report),
    }

    Ok(())
}

fn print_summary(report: &CleaningReport) {
    println!("报告ID: {}", report.id);
    println!("生成时间: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "已删除 {}，失败 {}，跳过 {}，释放 {}",
        report.deleted_count(),
        report.failed_count(),
        report.skipped_count(),
        utils::format_size(report.bytes_freed)
    );
    if report.simulated {
        println!("(模拟清理)");
    }
    println!();

    for entry in &report.entries {
        let reason = match &entry.status {
            reporter::models::ItemStatus::Failed(reason) => format!("  {}", reason),
            _ => String::new(),
        };
        println!(
            "  [{}] {:<36} {:>12}{}",
            entry.status.label(),
            super::truncate_string(&entry.name, 34),
            utils::format_size(entry.size_bytes),
            reason
        );
    }
}
