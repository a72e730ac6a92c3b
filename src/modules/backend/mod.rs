//! 系统后端抽象
//!
//! 核心逻辑只通过 [`SystemBackend`] 接触操作系统：目录枚举、文件信息、
//! 删除、注册表读写、内存信息和 DNS 缓存刷新。

pub mod models;
pub mod native;

#[cfg(test)]
pub mod testing;

use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
pub use models::{
    DeleteFailure, DeleteReport, DirScanOptions, FileInfo, MemoryInfo, RegistryKeyInfo,
};

/// 面向操作系统的后端能力
pub trait SystemBackend: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 后端能力是否可用
    fn is_available(&self) -> bool {
        true
    }

    fn scan_directory(
        &self,
        path: &str,
        options: &DirScanOptions,
    ) -> Result<Vec<FileInfo>, CleanupError>;

    /// 路径不存在时返回 `Ok(None)`
    fn get_file_info(&self, path: &str) -> Result<Option<FileInfo>, CleanupError>;

    fn delete_files(&self, paths: &[String]) -> Result<DeleteReport, CleanupError>;

    fn read_registry_key(&self, path: &str) -> Result<RegistryKeyInfo, CleanupError>;

    fn delete_registry_key(&self, path: &str) -> Result<(), CleanupError>;

    fn get_system_memory_info(&self) -> Result<MemoryInfo, CleanupError>;

    fn flush_dns_cache(&self) -> Result<(), CleanupError>;
}

/// 按路径类型把一批路径分派到对应的后端操作
///
/// 文件路径合并为一次 `delete_files` 调用；注册表路径和伪路径逐项处理。
/// 已完成的操作总会保留在报告中：`delete_files` 整体抛错时只把文件路径记为失败。
/// 只有在本批还没有任何操作成功时，后端不可用才以 `Err` 返回，调用方可以安全地改用模拟后端；
/// 否则出错的路径和剩余路径都记为失败。
pub fn delete_batch(
    backend: &dyn SystemBackend,
    paths: &[String],
) -> Result<DeleteReport, CleanupError> {
    let mut report = DeleteReport::default();
    let mut files = Vec::new();

    for (index, path) in paths.iter().enumerate() {
        let outcome = if utils::is_pseudo_path(path) {
            if path == utils::DNS_CACHE_PATH {
                Some(backend.flush_dns_cache())
            } else {
                report.failed_files.push(DeleteFailure {
                    path: path.clone(),
                    error: "不支持的伪路径".to_string(),
                });
                None
            }
        } else if utils::is_registry_path(path) {
            Some(backend.delete_registry_key(path))
        } else {
            files.push(path.clone());
            None
        };

        match outcome {
            Some(Ok(())) => report.deleted_files.push(path.clone()),
            Some(Err(e)) if e.is_backend_unavailable() => {
                if report.deleted_files.is_empty() {
                    return Err(e);
                }
                // 已有真实操作成功，不能再整批改为模拟
                let reason = e.to_string();
                let pending = files.drain(..).chain(paths[index..].iter().cloned());
                report.failed_files.extend(pending.map(|path| DeleteFailure {
                    path,
                    error: reason.clone(),
                }));
                return Ok(report);
            }
            Some(Err(e)) => report.failed_files.push(DeleteFailure {
                path: path.clone(),
                error: e.to_string(),
            }),
            None => {}
        }
    }

    if files.is_empty() {
        return Ok(report);
    }

    match backend.delete_files(&files) {
        Ok(file_report) => report.merge(file_report),
        Err(e) if e.is_backend_unavailable() && report.deleted_files.is_empty() => return Err(e),
        Err(e) => {
            let reason = e.to_string();
            report.failed_files.extend(files.into_iter().map(|path| DeleteFailure {
                path,
                error: reason.clone(),
            }));
        }
    }

    Ok(report)
}
