use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 单批删除数量的上下限
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 64;

/// 清理参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub batch_size: usize,
    /// 两批之间的间隔，减轻对系统的压力
    pub inter_batch_delay: Duration,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            inter_batch_delay: Duration::from_millis(100),
        }
    }
}

impl CleanOptions {
    pub fn new(batch_size: usize, inter_batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE),
            inter_batch_delay,
        }
    }
}

/// 清理进度
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningProgress {
    pub items_done: usize,
    pub items_total: usize,
    pub current_item_name: String,
    /// 还没有完成任何一批时为 `None`
    pub estimated_seconds_left: Option<u64>,
    pub total_bytes: u64,
    /// 只统计确认删除成功的项
    pub bytes_done: u64,
}

/// 清理过程中推送给调用方的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanEvent {
    Progress(CleaningProgress),
    /// 每批开始时报告该批第一项
    CurrentItem { id: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub id: String,
    pub error_reason: String,
}

/// 清理结果
///
/// 每个输入项的 ID 恰好出现在已删除、失败、跳过三者之一中，
/// `bytes_freed` 等于已删除项的大小之和。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningResult {
    pub deleted_item_ids: Vec<String>,
    pub failed_items: Vec<FailedItem>,
    pub skipped_item_ids: Vec<String>,
    pub bytes_freed: u64,
    /// 是否由模拟后端完成
    pub simulated: bool,
    pub cancelled: bool,
}

impl CleaningResult {
    pub fn success(&self) -> bool {
        self.failed_items.is_empty()
    }

    pub fn total_items(&self) -> usize {
        self.deleted_item_ids.len() + self.failed_items.len() + self.skipped_item_ids.len()
    }
}
