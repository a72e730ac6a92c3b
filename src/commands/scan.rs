use anyhow::Result;
use clap::Parser;

use super::ScopeArgs;
use crate::modules::classifier::models::CleanupItem;
use crate::modules::common::cancel::CancelFlag;
use crate::modules::common::utils;
use crate::modules::config::Settings;

#[derive(Parser, Debug)]
pub struct ScanCommand {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,

    /// 按名称或路径模糊搜索结果
    #[arg(short, long)]
    pub search: Option<String>,

    /// 把 JSON 结果写入文件
    #[arg(short, long)]
    pub output: Option<String>,
}

pub async fn execute(cmd: ScanCommand, settings: &Settings) -> Result<()> {
    let cancel = CancelFlag::new();
    super::cancel_on_ctrl_c(cancel.clone());

    let outcome = super::run_scan(&cmd.scope, settings, cancel).await?;
    let deletable: u64 = outcome.deletable().map(|i| i.size_bytes).sum();
    eprintln!(
        "扫描完成: {} 项，共 {}，可安全清理 {}",
        outcome.items.len(),
        utils::format_size(outcome.total_size()),
        utils::format_size(deletable)
    );

    let items = match &cmd.search {
        Some(keyword) => search_items(outcome.items, keyword),
        None => outcome.items,
    };

    if let Some(path) = &cmd.output {
        std::fs::write(path, serde_json::to_string_pretty(&items)?)?;
        println!("扫描结果已保存到: {}", path);
    }

    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&items)?),
        _ => super::print_items(&items),
    }

    Ok(())
}

/// 模糊匹配名称或路径，按匹配分数从高到低排列
fn search_items(items: Vec<CleanupItem>, keyword: &str) -> Vec<CleanupItem> {
    let mut scored: Vec<(i64, CleanupItem)> = items
        .into_iter()
        .filter_map(|item| {
            let score = utils::fuzzy_score(&item.name, keyword)
                .max(utils::fuzzy_score(&item.path, keyword));
            (score > 0).then_some((score, item))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::classifier::models::{ItemCategory, RiskLevel};
    use crate::modules::scanner::models::CandidateKind;

    fn item(name: &str, path: &str) -> CleanupItem {
        CleanupItem {
            id: utils::stable_id(path, "test"),
            name: name.to_string(),
            path: path.to_string(),
            size_bytes: 1,
            category: ItemCategory::System,
            risk_level: RiskLevel::Safe,
            can_delete: true,
            suggestion: String::new(),
            last_modified: None,
            kind: CandidateKind::LogFile,
            retained: false,
        }
    }

    #[test]
    fn search_keeps_only_matching_items() {
        let items = vec![
            item("CBS", r"C:\Windows\Logs\CBS"),
            item("INetCache", r"C:\Users\a\AppData\Local\Microsoft\Windows\INetCache"),
            item("Prefetch", r"C:\Windows\Prefetch"),
        ];

        let found = search_items(items, "inetcache");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "INetCache");
    }
}
