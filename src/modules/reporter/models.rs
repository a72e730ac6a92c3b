use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::classifier::models::{CleanupItem, ItemCategory, RiskLevel};
use crate::modules::cleaner::models::CleaningResult;
use crate::modules::common::utils;

/// 单项清理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ItemStatus {
    Deleted,
    Failed(String),
    Skipped,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Deleted => "已删除",
            ItemStatus::Failed(_) => "失败",
            ItemStatus::Skipped => "已跳过",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    pub category: ItemCategory,
    pub risk_level: RiskLevel,
    pub size_bytes: u64,
    pub status: ItemStatus,
}

/// 清理报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
    pub bytes_freed: u64,
    pub simulated: bool,
    pub cancelled: bool,
}

impl CleaningReport {
    /// 把清理结果对应回清理项
    ///
    /// 结果中没有出现的项视为跳过。
    pub fn new(items: &[CleanupItem], result: &CleaningResult) -> Self {
        let failed: HashMap<&str, &str> = result
            .failed_items
            .iter()
            .map(|f| (f.id.as_str(), f.error_reason.as_str()))
            .collect();

        let mut seen = std::collections::HashSet::new();
        let entries = items
            .iter()
            .filter(|item| seen.insert(item.id.as_str()))
            .map(|item| {
                let status = if result.deleted_item_ids.contains(&item.id) {
                    ItemStatus::Deleted
                } else if let Some(reason) = failed.get(item.id.as_str()) {
                    ItemStatus::Failed(reason.to_string())
                } else {
                    ItemStatus::Skipped
                };
                ReportEntry {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    path: item.path.clone(),
                    category: item.category,
                    risk_level: item.risk_level,
                    size_bytes: item.size_bytes,
                    status,
                }
            })
            .collect();

        Self {
            id: utils::generate_id(),
            generated_at: Utc::now(),
            entries,
            bytes_freed: result.bytes_freed,
            simulated: result.simulated,
            cancelled: result.cancelled,
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Deleted))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped))
    }

    pub fn success(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, predicate: impl Fn(&ItemStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.status)).count()
    }
}
