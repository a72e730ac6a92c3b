//! 类别扫描器
//!
//! 每个子模块负责一个领域，只产出 [`RawCandidate`]，风险判定统一交给分类器。
//! 单个路径不可访问时跳过继续；后端整体不可用等能力级错误向上返回，
//! 由编排器记为该类别失败。

pub mod chat_apps;
pub mod logs;
pub mod memory;
pub mod models;
pub mod network;
pub mod privacy;
pub mod registry_remnants;
pub mod software_remnants;
pub mod system_cache;
pub mod windows_update;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::modules::backend::{DirScanOptions, FileInfo, SystemBackend};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;
use models::{CandidateKind, RawCandidate, ScanCategory};

/// 聚合目录时的默认递归深度
pub(crate) const AGGREGATE_DEPTH: usize = 8;

/// 运行指定类别的扫描器
pub async fn scan_category(
    category: ScanCategory,
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    tracing::debug!("开始扫描类别: {}", category);

    match category {
        ScanCategory::SystemCache => system_cache::scan(backend, sink).await,
        ScanCategory::Logs => logs::scan(backend, sink).await,
        ScanCategory::WindowsUpdate => windows_update::scan(backend, sink).await,
        ScanCategory::Privacy => privacy::scan(backend, sink).await,
        ScanCategory::Memory => memory::scan(backend, sink).await,
        ScanCategory::Network => network::scan(backend, sink).await,
        ScanCategory::SoftwareRemnants => software_remnants::scan(backend, sink).await,
        ScanCategory::RegistryRemnants => registry_remnants::scan(backend, sink).await,
        ScanCategory::ChatApps => chat_apps::scan(backend, sink).await,
    }
}

/// 无真实后端时各类别的固定样本
pub fn category_fixtures(category: ScanCategory, now: DateTime<Utc>) -> Vec<RawCandidate> {
    match category {
        ScanCategory::SystemCache => system_cache::fixtures(now),
        ScanCategory::Logs => logs::fixtures(now),
        ScanCategory::WindowsUpdate => windows_update::fixtures(now),
        ScanCategory::Privacy => privacy::fixtures(now),
        ScanCategory::Memory => memory::fixtures(now),
        ScanCategory::Network => network::fixtures(now),
        ScanCategory::SoftwareRemnants => software_remnants::fixtures(now),
        ScanCategory::RegistryRemnants => registry_remnants::fixtures(now),
        ScanCategory::ChatApps => chat_apps::fixtures(now),
    }
}

/// 目标的产出粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetMode {
    /// 单个文件
    File,
    /// 整个目录汇总为一项
    Whole,
    /// 每个直接子项各为一项（子目录汇总）
    EachChild,
    /// 每个文件各为一项
    EachFile,
}

#[derive(Debug, Clone)]
pub(crate) struct ScanTarget {
    pub path: PathBuf,
    pub kind: CandidateKind,
    pub mode: TargetMode,
    pub label: String,
    pub options: DirScanOptions,
    pub name_pattern: Option<glob::Pattern>,
}

impl ScanTarget {
    pub fn new(path: PathBuf, kind: CandidateKind, mode: TargetMode, label: &str) -> Self {
        let options = match mode {
            TargetMode::Whole => DirScanOptions::recursive(AGGREGATE_DEPTH),
            _ => DirScanOptions::shallow(),
        };

        Self {
            path,
            kind,
            mode,
            label: label.to_string(),
            options,
            name_pattern: None,
        }
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.options = self.options.with_extensions(extensions);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.name_pattern = glob::Pattern::new(pattern).ok();
        self
    }

    fn matches(&self, info: &FileInfo) -> bool {
        if info.is_dir || !self.options.accepts(&info.name) {
            return false;
        }
        self.name_pattern
            .as_ref()
            .map(|p| {
                p.matches_with(
                    &info.name,
                    glob::MatchOptions {
                        case_sensitive: false,
                        ..glob::MatchOptions::new()
                    },
                )
            })
            .unwrap_or(true)
    }
}

/// 依次扫描目标，每完成一个目标汇报一次局部进度（在 start..=end 区间内）
pub(crate) async fn scan_targets(
    backend: &dyn SystemBackend,
    targets: &[ScanTarget],
    sink: &mut ProgressSink,
    start_percent: u8,
    end_percent: u8,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let mut candidates = Vec::new();
    let span = u32::from(end_percent.saturating_sub(start_percent));

    for (index, target) in targets.iter().enumerate() {
        match collect_target(backend, target) {
            Ok(mut found) => candidates.append(&mut found),
            Err(e) if e.is_per_resource() => {
                tracing::debug!("跳过 {}: {}", target.path.display(), e);
            }
            Err(e) => return Err(e),
        }

        let done = u32::from(start_percent) + span * (index as u32 + 1) / targets.len() as u32;
        sink.report(done as u8, target.label.clone()).await;
    }

    if targets.is_empty() {
        sink.report(end_percent, "").await;
    }

    Ok(candidates)
}

fn collect_target(
    backend: &dyn SystemBackend,
    target: &ScanTarget,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let path = utils::path_string(&target.path);

    match target.mode {
        TargetMode::File => Ok(backend
            .get_file_info(&path)?
            .filter(|info| !info.is_dir)
            .map(|info| candidate_from_file(&info, &target.kind))
            .into_iter()
            .collect()),
        TargetMode::Whole => {
            let entries = backend.scan_directory(&path, &target.options)?;
            Ok(aggregate(&path, &target.label, &entries, target)
                .into_iter()
                .collect())
        }
        TargetMode::EachFile => {
            let entries = backend.scan_directory(&path, &target.options)?;
            Ok(entries
                .iter()
                .filter(|info| target.matches(info))
                .map(|info| candidate_from_file(info, &target.kind))
                .collect())
        }
        TargetMode::EachChild => {
            let children = backend.scan_directory(&path, &DirScanOptions::shallow())?;
            let mut candidates = Vec::new();

            for child in &children {
                if !child.is_dir {
                    if target.matches(child) {
                        candidates.push(candidate_from_file(child, &target.kind));
                    }
                    continue;
                }

                let nested_options = DirScanOptions {
                    recursive: true,
                    max_depth: Some(AGGREGATE_DEPTH),
                    extensions: target.options.extensions.clone(),
                };
                match backend.scan_directory(&child.path, &nested_options) {
                    Ok(entries) => {
                        if let Some(candidate) = aggregate(&child.path, &child.name, &entries, target) {
                            candidates.push(candidate);
                        }
                    }
                    Err(e) if e.is_per_resource() => {
                        tracing::debug!("跳过子目录 {}: {}", child.path, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            Ok(candidates)
        }
    }
}

/// 汇总目录，空目录不产出
fn aggregate(
    path: &str,
    name: &str,
    entries: &[FileInfo],
    target: &ScanTarget,
) -> Option<RawCandidate> {
    let files: Vec<&FileInfo> = entries.iter().filter(|info| target.matches(info)).collect();
    if files.is_empty() {
        return None;
    }

    let size = files.iter().map(|info| info.size).sum();
    let newest = files.iter().filter_map(|info| info.modified).max();

    Some(
        RawCandidate::new(name, path, target.kind.clone())
            .with_size(size)
            .with_modified(newest),
    )
}

fn candidate_from_file(info: &FileInfo, kind: &CandidateKind) -> RawCandidate {
    RawCandidate::new(info.name.clone(), info.path.clone(), kind.clone())
        .with_size(info.size)
        .with_modified(info.modified)
}

pub(crate) fn join(base: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(base.to_path_buf(), |acc, part| acc.join(part))
}

/// 构造样本候选项
pub(crate) fn fixture(
    name: &str,
    path: &str,
    size: u64,
    age_days: i64,
    kind: CandidateKind,
    now: DateTime<Utc>,
) -> RawCandidate {
    RawCandidate::new(name, path, kind)
        .with_size(size)
        .with_modified(Some(now - Duration::days(age_days)))
}
