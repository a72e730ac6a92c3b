//! 内存中的后端替身，测试用

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{
    DeleteFailure, DeleteReport, DirScanOptions, FileInfo, MemoryInfo, RegistryKeyInfo,
    SystemBackend,
};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;

fn key(path: &str) -> String {
    utils::normalize_path(path).to_lowercase()
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, FileInfo>,
    dirs: BTreeSet<String>,
    registry: BTreeMap<String, (String, BTreeMap<String, String>)>,
    delete_calls: Vec<Vec<String>>,
    dns_flushes: usize,
    scan_calls: usize,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    unavailable: bool,
    hides_unavailability: bool,
    memory_unavailable: bool,
    file_deletion_unavailable: bool,
    fail_everything: Option<String>,
    failing_scan_prefixes: Vec<String>,
    delete_failures: HashMap<String, String>,
    throwing_paths: BTreeSet<String>,
    memory: MemoryInfo,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            memory: MemoryInfo {
                total: 16 * 1024 * 1024 * 1024,
                used: 8 * 1024 * 1024 * 1024,
                available: 8 * 1024 * 1024 * 1024,
            },
            ..Self::default()
        }
    }

    /// 所有操作都返回 `BackendUnavailable`
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// 探测时报告可用，但每次调用都返回 `BackendUnavailable`
    pub fn unavailable_after_check() -> Self {
        Self {
            unavailable: true,
            hides_unavailability: true,
            ..Self::new()
        }
    }

    /// 只有内存信息查询返回 `BackendUnavailable`
    pub fn without_memory_info(mut self) -> Self {
        self.memory_unavailable = true;
        self
    }

    /// 只有文件删除返回 `BackendUnavailable`
    pub fn with_file_deletion_unavailable(mut self) -> Self {
        self.file_deletion_unavailable = true;
        self
    }

    /// 所有操作都返回 `Backend` 错误
    pub fn failing(message: &str) -> Self {
        Self {
            fail_everything: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn with_file(self, path: &str, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let normalized = utils::normalize_path(path);
            state.files.insert(
                key(path),
                FileInfo {
                    name: utils::display_name(&normalized),
                    path: normalized,
                    size,
                    is_dir: false,
                    modified,
                },
            );
        }
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state.lock().unwrap().dirs.insert(key(path));
        self
    }

    pub fn with_registry_key(self, path: &str, values: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let values = values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            state
                .registry
                .insert(key(path), (utils::normalize_path(path), values));
        }
        self
    }

    /// 该前缀下的目录扫描返回 `PermissionDenied`
    pub fn deny_scan_under(mut self, prefix: &str) -> Self {
        self.failing_scan_prefixes.push(key(prefix));
        self
    }

    /// 删除该路径时单项失败
    pub fn fail_delete_of(mut self, path: &str, reason: &str) -> Self {
        self.delete_failures.insert(key(path), reason.to_string());
        self
    }

    /// 批次中包含该路径时整个 `delete_files` 调用抛错
    pub fn throw_on_delete_of(mut self, path: &str) -> Self {
        self.throwing_paths.insert(key(path));
        self
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn has_registry_key(&self, path: &str) -> bool {
        self.state.lock().unwrap().registry.contains_key(&key(path))
    }

    pub fn dns_flushes(&self) -> usize {
        self.state.lock().unwrap().dns_flushes
    }

    pub fn scan_calls(&self) -> usize {
        self.state.lock().unwrap().scan_calls
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(&key(path))
    }

    fn guard(&self) -> Result<(), CleanupError> {
        if self.unavailable {
            return Err(CleanupError::BackendUnavailable("测试后端不可用".to_string()));
        }
        if let Some(message) = &self.fail_everything {
            return Err(CleanupError::Backend(message.clone()));
        }
        Ok(())
    }
}

fn is_under(child: &str, parent: &str) -> bool {
    child.len() > parent.len()
        && child.starts_with(parent)
        && child[parent.len()..].starts_with('\\')
}

impl SystemBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_available(&self) -> bool {
        !self.unavailable || self.hides_unavailability
    }

    fn scan_directory(
        &self,
        path: &str,
        options: &DirScanOptions,
    ) -> Result<Vec<FileInfo>, CleanupError> {
        self.guard()?;
        let dir = key(path);
        let mut state = self.state.lock().unwrap();
        state.scan_calls += 1;

        if self
            .failing_scan_prefixes
            .iter()
            .any(|prefix| dir == *prefix || is_under(&dir, prefix))
        {
            return Err(CleanupError::PermissionDenied(path.to_string()));
        }

        let mut found = Vec::new();
        let mut implied_dirs = BTreeMap::new();

        for (file_key, info) in &state.files {
            if !is_under(file_key, &dir) {
                continue;
            }
            let rest = &file_key[dir.len() + 1..];
            let depth = rest.split('\\').count();
            if depth > 1 {
                let original_rest = info.path.get(dir.len() + 1..).unwrap_or(rest);
                let first = original_rest.split('\\').next().unwrap_or_default();
                implied_dirs.insert(first.to_lowercase(), first.to_string());
            }
            let within_depth = if options.recursive {
                options.max_depth.map(|max| depth <= max).unwrap_or(true)
            } else {
                depth == 1
            };
            if within_depth && options.accepts(&info.name) {
                found.push(info.clone());
            }
        }

        if found.is_empty() && implied_dirs.is_empty() && !state.dirs.contains(&dir) {
            return Err(CleanupError::NotFound(path.to_string()));
        }

        if options.extensions.is_empty() {
            for child_dir in implied_dirs.into_values() {
                let original = format!("{}\\{}", utils::normalize_path(path), child_dir);
                found.push(FileInfo {
                    name: utils::display_name(&original),
                    path: original,
                    size: 0,
                    is_dir: true,
                    modified: None,
                });
            }
        }

        Ok(found)
    }

    fn get_file_info(&self, path: &str) -> Result<Option<FileInfo>, CleanupError> {
        self.guard()?;
        let state = self.state.lock().unwrap();
        let wanted = key(path);
        if let Some(info) = state.files.get(&wanted) {
            return Ok(Some(info.clone()));
        }
        let is_dir = state.dirs.contains(&wanted) || state.files.keys().any(|k| is_under(k, &wanted));
        Ok(is_dir.then(|| FileInfo {
            path: utils::normalize_path(path),
            name: utils::display_name(path),
            size: 0,
            is_dir: true,
            modified: None,
        }))
    }

    fn delete_files(&self, paths: &[String]) -> Result<DeleteReport, CleanupError> {
        self.guard()?;
        if self.file_deletion_unavailable {
            return Err(CleanupError::BackendUnavailable("文件删除不可用".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(paths.to_vec());

        if paths.iter().any(|p| self.throwing_paths.contains(&key(p))) {
            return Err(CleanupError::Backend("批量删除调用失败".to_string()));
        }

        let mut report = DeleteReport::default();
        for path in paths {
            let path_key = key(path);
            if let Some(reason) = self.delete_failures.get(&path_key) {
                report.failed_files.push(DeleteFailure {
                    path: path.clone(),
                    error: reason.clone(),
                });
                continue;
            }
            state.files.retain(|k, _| *k != path_key && !is_under(k, &path_key));
            report.deleted_files.push(path.clone());
        }
        Ok(report)
    }

    fn read_registry_key(&self, path: &str) -> Result<RegistryKeyInfo, CleanupError> {
        self.guard()?;
        let state = self.state.lock().unwrap();
        let wanted = key(path);
        let (_, values) = state
            .registry
            .get(&wanted)
            .ok_or_else(|| CleanupError::NotFound(path.to_string()))?;

        let subkeys = state
            .registry
            .iter()
            .filter(|(k, _)| is_under(k, &wanted) && !k[wanted.len() + 1..].contains('\\'))
            .map(|(_, (original, _))| utils::display_name(original))
            .collect();

        Ok(RegistryKeyInfo {
            values: values.clone(),
            subkeys,
        })
    }

    fn delete_registry_key(&self, path: &str) -> Result<(), CleanupError> {
        self.guard()?;
        if let Some(reason) = self.delete_failures.get(&key(path)) {
            return Err(CleanupError::Registry(reason.clone()));
        }
        let wanted = key(path);
        self.state
            .lock()
            .unwrap()
            .registry
            .retain(|k, _| *k != wanted && !is_under(k, &wanted));
        Ok(())
    }

    fn get_system_memory_info(&self) -> Result<MemoryInfo, CleanupError> {
        self.guard()?;
        if self.memory_unavailable {
            return Err(CleanupError::BackendUnavailable("内存信息不可用".to_string()));
        }
        Ok(self.memory)
    }

    fn flush_dns_cache(&self) -> Result<(), CleanupError> {
        self.guard()?;
        self.state.lock().unwrap().dns_flushes += 1;
        Ok(())
    }
}
