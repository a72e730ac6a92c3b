//! 清理报告
//!
//! 报告以 JSON 保存在 `<本地数据目录>/rust-qing/reports` 下，HTML 按需生成。

pub mod html;
pub mod models;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::modules::common::error::CleanupError;
use models::CleaningReport;

const APP_DIR: &str = "rust-qing";

/// 报告目录
pub fn reports_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("reports")
}

/// 已保存的报告
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub path: PathBuf,
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub bytes_freed: u64,
}

fn file_name(report: &CleaningReport) -> String {
    format!(
        "clean_report_{}_{}.json",
        report.generated_at.format("%Y%m%d_%H%M%S"),
        &report.id[..report.id.len().min(8)]
    )
}

/// 保存报告，返回文件路径
pub fn save_report(dir: &Path, report: &CleaningReport) -> Result<PathBuf, CleanupError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(report));
    let content =
        serde_json::to_string_pretty(report).map_err(|e| CleanupError::Serde(e.to_string()))?;
    std::fs::write(&path, content)?;

    tracing::info!("已保存清理报告: {}", path.display());
    Ok(path)
}

pub fn load_report(path: &Path) -> Result<CleaningReport, CleanupError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CleanupError::Serde(e.to_string()))
}

/// 列出目录下的报告，按生成时间从新到旧排列
///
/// 无法解析的文件被忽略。
pub fn list_reports(dir: &Path) -> Result<Vec<SavedReport>, CleanupError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        match load_report(&path) {
            Ok(report) => reports.push(SavedReport {
                path,
                id: report.id,
                generated_at: report.generated_at,
                bytes_freed: report.bytes_freed,
            }),
            Err(e) => tracing::debug!("忽略无法解析的报告 {}: {}", path.display(), e),
        }
    }

    reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
    Ok(reports)
}

/// 按文件路径、报告 ID 前缀或文件名片段查找报告
pub fn find_report(dir: &Path, identifier: &str) -> Result<Option<CleaningReport>, CleanupError> {
    let direct = PathBuf::from(identifier);
    if direct.is_file() {
        return load_report(&direct).map(Some);
    }

    let needle = identifier.to_lowercase();
    let found = list_reports(dir)?.into_iter().find(|saved| {
        saved.id.to_lowercase().starts_with(&needle)
            || saved
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                .unwrap_or(false)
    });

    found.map(|saved| load_report(&saved.path)).transpose()
}

#[cfg(test)]
mod tests {
    use super::models::{ItemStatus, ReportEntry};
    use super::*;
    use crate::modules::classifier::models::{CleanupItem, ItemCategory, RiskLevel};
    use crate::modules::cleaner::models::{CleaningResult, FailedItem};
    use crate::modules::scanner::models::CandidateKind;

    fn item(id: &str, path: &str, size: u64) -> CleanupItem {
        CleanupItem {
            id: id.to_string(),
            name: id.to_string(),
            path: path.to_string(),
            size_bytes: size,
            category: ItemCategory::System,
            risk_level: RiskLevel::Safe,
            can_delete: true,
            suggestion: String::new(),
            last_modified: None,
            kind: CandidateKind::SystemTemp,
            retained: false,
        }
    }

    fn sample() -> CleaningReport {
        let items = vec![
            item("a", r"C:\Temp\a.tmp", 100),
            item("b", r"C:\Temp\<b>.tmp", 200),
            item("c", r"C:\Temp\c.tmp", 300),
        ];
        let result = CleaningResult {
            deleted_item_ids: vec!["a".to_string()],
            failed_items: vec![FailedItem {
                id: "b".to_string(),
                error_reason: "文件被占用".to_string(),
            }],
            skipped_item_ids: vec!["c".to_string()],
            bytes_freed: 100,
            simulated: true,
            cancelled: false,
        };
        CleaningReport::new(&items, &result)
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rust-qing-reports-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn report_maps_each_item_to_its_status() {
        let report = sample();
        let statuses: Vec<&ItemStatus> = report.entries.iter().map(|e| &e.status).collect();
        assert_eq!(
            statuses,
            vec![
                &ItemStatus::Deleted,
                &ItemStatus::Failed("文件被占用".to_string()),
                &ItemStatus::Skipped,
            ]
        );
        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(!report.success());
    }

    #[test]
    fn html_contains_summary_and_escaped_paths() {
        let html = html::generate_html_report(&sample());
        assert!(html.contains("清理报告"));
        assert!(html.contains("文件被占用"));
        assert!(html.contains("&lt;b&gt;.tmp"));
        assert!(!html.contains("<b>.tmp"));
        assert!(html.contains("模拟后端"));
        assert!(html.contains("100 B"));
    }

    #[test]
    fn saved_reports_can_be_listed_and_found() {
        let dir = temp_dir();
        let report = sample();

        let path = save_report(&dir, &report).unwrap();
        let listed = list_reports(&dir).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, report.id);

        let by_id = find_report(&dir, &report.id[..8]).unwrap().unwrap();
        assert_eq!(by_id.entries, report.entries);
        let by_path = find_report(&dir, &path.to_string_lossy()).unwrap().unwrap();
        assert_eq!(by_path.id, report.id);
        assert!(find_report(&dir, "no-such-report").unwrap().is_none());

        let entry: &ReportEntry = &by_id.entries[1];
        assert_eq!(entry.status, ItemStatus::Failed("文件被占用".to_string()));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_lists_nothing() {
        assert!(list_reports(&temp_dir()).unwrap().is_empty());
    }
}
