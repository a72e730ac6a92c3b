//! 真实的 Windows 后端

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{
    DeleteFailure, DeleteReport, DirScanOptions, FileInfo, MemoryInfo, RegistryKeyInfo,
    SystemBackend,
};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;

/// 基于本机文件系统、注册表和系统命令的后端
#[derive(Debug, Clone)]
pub struct NativeBackend {
    /// 文件删除时移入回收站而不是永久删除
    pub use_recycle_bin: bool,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self {
            use_recycle_bin: true,
        }
    }
}

impl NativeBackend {
    pub fn new(use_recycle_bin: bool) -> Self {
        Self { use_recycle_bin }
    }

    fn remove_path(&self, path: &Path) -> Result<(), CleanupError> {
        if self.use_recycle_bin {
            return trash::delete(path).map_err(|e| CleanupError::Backend(e.to_string()));
        }

        if path.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn to_utc(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

fn map_io_error(path: &str, error: std::io::Error) -> CleanupError {
    match error.kind() {
        std::io::ErrorKind::NotFound => CleanupError::NotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => CleanupError::PermissionDenied(path.to_string()),
        _ => CleanupError::FileSystem(error),
    }
}

fn file_info_from(path: &Path, metadata: &std::fs::Metadata) -> FileInfo {
    FileInfo {
        path: utils::path_string(path),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size: if metadata.is_file() { metadata.len() } else { 0 },
        is_dir: metadata.is_dir(),
        modified: to_utc(metadata.modified()),
    }
}

impl SystemBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn is_available(&self) -> bool {
        cfg!(windows)
    }

    fn scan_directory(
        &self,
        path: &str,
        options: &DirScanOptions,
    ) -> Result<Vec<FileInfo>, CleanupError> {
        let root = Path::new(path);
        let metadata = std::fs::metadata(root).map_err(|e| map_io_error(path, e))?;
        if !metadata.is_dir() {
            return Err(CleanupError::NotFound(format!("不是目录: {}", path)));
        }

        let max_depth = if options.recursive {
            options.max_depth.unwrap_or(usize::MAX)
        } else {
            1
        };

        // 根目录不可读时整体报错，子项不可读时跳过
        std::fs::read_dir(root).map_err(|e| map_io_error(path, e))?;

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false);

        let mut entries = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let info = file_info_from(entry.path(), &metadata);
            if info.is_dir {
                if options.extensions.is_empty() {
                    entries.push(info);
                }
            } else if options.accepts(&info.name) {
                entries.push(info);
            }
        }

        Ok(entries)
    }

    fn get_file_info(&self, path: &str) -> Result<Option<FileInfo>, CleanupError> {
        let target = Path::new(path);
        match std::fs::symlink_metadata(target) {
            Ok(metadata) => Ok(Some(file_info_from(target, &metadata))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(path, e)),
        }
    }

    fn delete_files(&self, paths: &[String]) -> Result<DeleteReport, CleanupError> {
        let mut report = DeleteReport::default();

        for raw in paths {
            let path = Path::new(raw);

            // 目标已不存在，视为成功
            if !path.exists() {
                report.deleted_files.push(raw.clone());
                continue;
            }

            match self.remove_path(path) {
                Ok(()) => {
                    tracing::info!("已删除: {}", raw);
                    report.deleted_files.push(raw.clone());
                }
                Err(e) => {
                    tracing::error!("删除失败 {}: {}", raw, e);
                    report.failed_files.push(DeleteFailure {
                        path: raw.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn read_registry_key(&self, path: &str) -> Result<RegistryKeyInfo, CleanupError> {
        registry::read_key(path)
    }

    fn delete_registry_key(&self, path: &str) -> Result<(), CleanupError> {
        registry::delete_key(path)
    }

    fn get_system_memory_info(&self) -> Result<MemoryInfo, CleanupError> {
        let mut system = sysinfo::System::new();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(CleanupError::Backend("无法读取内存信息".to_string()));
        }

        Ok(MemoryInfo {
            total,
            used: system.used_memory(),
            available: system.available_memory(),
        })
    }

    fn flush_dns_cache(&self) -> Result<(), CleanupError> {
        flush_dns()
    }
}

#[cfg(windows)]
fn flush_dns() -> Result<(), CleanupError> {
    let output = std::process::Command::new("ipconfig")
        .arg("/flushdns")
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CleanupError::Backend(format!("刷新 DNS 缓存失败: {}", stderr)));
    }

    tracing::info!("已刷新 DNS 缓存");
    Ok(())
}

#[cfg(not(windows))]
fn flush_dns() -> Result<(), CleanupError> {
    Err(CleanupError::BackendUnavailable(
        "DNS 缓存刷新仅支持 Windows".to_string(),
    ))
}

#[cfg(windows)]
mod registry {
    use super::{CleanupError, RegistryKeyInfo};
    use winreg::enums::*;
    use winreg::{RegKey, HKEY};

    /// 解析注册表路径
    fn parse_registry_path(path: &str) -> Option<(HKEY, &str)> {
        let path = path.trim();
        let roots: [(&str, HKEY); 10] = [
            ("HKEY_LOCAL_MACHINE\\", HKEY_LOCAL_MACHINE),
            ("HKEY_CURRENT_USER\\", HKEY_CURRENT_USER),
            ("HKEY_CLASSES_ROOT\\", HKEY_CLASSES_ROOT),
            ("HKEY_USERS\\", HKEY_USERS),
            ("HKEY_CURRENT_CONFIG\\", HKEY_CURRENT_CONFIG),
            ("HKLM\\", HKEY_LOCAL_MACHINE),
            ("HKCU\\", HKEY_CURRENT_USER),
            ("HKCR\\", HKEY_CLASSES_ROOT),
            ("HKU\\", HKEY_USERS),
            ("HKCC\\", HKEY_CURRENT_CONFIG),
        ];

        let upper = path.to_uppercase();
        roots
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix))
            .map(|(prefix, hkey)| (*hkey, &path[prefix.len()..]))
    }

    fn map_error(path: &str, e: std::io::Error) -> CleanupError {
        match e.kind() {
            std::io::ErrorKind::NotFound => CleanupError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                CleanupError::PermissionDenied(path.to_string())
            }
            _ => CleanupError::Registry(e.to_string()),
        }
    }

    pub fn read_key(path: &str) -> Result<RegistryKeyInfo, CleanupError> {
        let (hkey, subkey_path) = parse_registry_path(path)
            .ok_or_else(|| CleanupError::Registry(format!("无效的注册表路径格式: {}", path)))?;

        let key = RegKey::predef(hkey)
            .open_subkey_with_flags(subkey_path, KEY_READ)
            .map_err(|e| map_error(path, e))?;

        let mut info = RegistryKeyInfo::default();
        for (name, _) in key.enum_values().filter_map(|v| v.ok()) {
            if let Ok(text) = key.get_value::<String, _>(&name) {
                info.values.insert(name, text);
            } else if let Ok(number) = key.get_value::<u32, _>(&name) {
                info.values.insert(name, number.to_string());
            }
        }
        info.subkeys = key.enum_keys().filter_map(|k| k.ok()).collect();

        Ok(info)
    }

    pub fn delete_key(path: &str) -> Result<(), CleanupError> {
        let (hkey, subkey_path) = parse_registry_path(path)
            .ok_or_else(|| CleanupError::Registry("无效的注册表路径格式".to_string()))?;

        match RegKey::predef(hkey).delete_subkey_all(subkey_path) {
            Ok(_) => {
                tracing::info!("已删除注册表项: {}", path);
                Ok(())
            }
            // 键不存在，视为成功
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_error(path, e)),
        }
    }
}

#[cfg(not(windows))]
mod registry {
    use super::{CleanupError, RegistryKeyInfo};

    pub fn read_key(_path: &str) -> Result<RegistryKeyInfo, CleanupError> {
        Err(CleanupError::BackendUnavailable(
            "注册表仅支持 Windows".to_string(),
        ))
    }

    pub fn delete_key(_path: &str) -> Result<(), CleanupError> {
        Err(CleanupError::BackendUnavailable(
            "注册表仅支持 Windows".to_string(),
        ))
    }
}
