use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::classifier::models::CleanupItem;
use crate::modules::classifier::retention::RetentionSettings;
use crate::modules::scanner::models::ScanCategory;

/// 扫描阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Preparing,
    Scanning,
    Analyzing,
    Completed,
    Error,
    Fallback,
    Cancelled,
}

/// 总体扫描进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub current_units: u32,
    pub total_units: u32,
    pub current_label: String,
}

/// 扫描过程中推送给调用方的事件
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Progress(ScanProgress),
    /// 每追加一个已分类项后推送完整列表
    ResultsGrew(Vec<CleanupItem>),
}

/// 一次扫描请求
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub categories: Vec<ScanCategory>,
    pub retention: RetentionSettings,
    pub now: DateTime<Utc>,
}

impl ScanRequest {
    pub fn new(categories: Vec<ScanCategory>, retention: RetentionSettings) -> Self {
        Self {
            categories,
            retention,
            now: Utc::now(),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// 单个类别的扫描失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: ScanCategory,
    pub error: String,
}

/// 扫描结束状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub stage: ScanStage,
    pub items: Vec<CleanupItem>,
    pub failures: Vec<CategoryFailure>,
    /// 是否由模拟器产生
    pub simulated: bool,
}

impl ScanOutcome {
    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|i| i.size_bytes).sum()
    }

    pub fn deletable(&self) -> impl Iterator<Item = &CleanupItem> {
        self.items.iter().filter(|i| i.can_delete)
    }
}
