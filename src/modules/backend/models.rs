use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 目录扫描选项
#[derive(Debug, Clone, Default)]
pub struct DirScanOptions {
    pub recursive: bool,
    /// 最大深度，None 表示不限制
    pub max_depth: Option<usize>,
    /// 扩展名过滤（不含点，小写），为空表示不过滤
    pub extensions: Vec<String>,
}

impl DirScanOptions {
    pub fn shallow() -> Self {
        Self::default()
    }

    pub fn recursive(max_depth: usize) -> Self {
        Self {
            recursive: true,
            max_depth: Some(max_depth),
            extensions: Vec::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// 文件是否满足扩展名过滤
    pub fn accepts(&self, file_name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let lower = file_name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }
}

/// 文件信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub modified: Option<DateTime<Utc>>,
}

/// 批量删除结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted_files: Vec<String>,
    pub failed_files: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub path: String,
    pub error: String,
}

impl DeleteReport {
    pub fn merge(&mut self, other: DeleteReport) {
        self.deleted_files.extend(other.deleted_files);
        self.failed_files.extend(other.failed_files);
    }
}

/// 注册表键内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryKeyInfo {
    pub values: BTreeMap<String, String>,
    pub subkeys: Vec<String>,
}

/// 系统内存信息（字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl MemoryInfo {
    pub fn usage_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.used as f64 / self.total as f64) * 100.0).round().min(100.0) as u8
    }
}
