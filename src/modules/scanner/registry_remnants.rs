use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::software_remnants::{read_uninstall_entries, UninstallEntry};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

const APP_PATHS_ROOT: &str = r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths";

/// 扫描指向已不存在程序的卸载信息和 App Paths 注册项
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let mut candidates = Vec::new();

    let entries = read_uninstall_entries(backend)?;
    sink.report(20, "卸载信息").await;

    let total = entries.len().max(1);
    for (index, entry) in entries.iter().enumerate() {
        if is_stale_uninstall_entry(backend, entry)? {
            let name = if entry.display_name.is_empty() {
                utils::display_name(&entry.key_path)
            } else {
                entry.display_name.clone()
            };
            candidates.push(RawCandidate::new(
                format!("{} 的卸载信息", name),
                entry.key_path.clone(),
                CandidateKind::RegistryRemnant,
            ));
        }
        let percent = 20 + 50 * (index + 1) / total;
        sink.report(percent as u8, "检查卸载信息").await;
    }

    candidates.append(&mut scan_app_paths(backend)?);
    sink.report(100, "App Paths").await;

    Ok(candidates)
}

/// 安装目录或卸载程序已不存在
fn is_stale_uninstall_entry(
    backend: &dyn SystemBackend,
    entry: &UninstallEntry,
) -> Result<bool, CleanupError> {
    let location = entry.install_location.trim().trim_matches('"');
    if is_absolute(location) {
        return Ok(!exists(backend, location)?);
    }

    match executable_path(&entry.uninstall_string) {
        Some(exe) if is_absolute(&exe) && !is_system_tool(&exe) => Ok(!exists(backend, &exe)?),
        _ => Ok(false),
    }
}

fn scan_app_paths(backend: &dyn SystemBackend) -> Result<Vec<RawCandidate>, CleanupError> {
    let root = match backend.read_registry_key(APP_PATHS_ROOT) {
        Ok(info) => info,
        Err(e) if e.is_per_resource() => {
            tracing::debug!("跳过 App Paths: {}", e);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut candidates = Vec::new();
    for subkey in &root.subkeys {
        let key_path = format!("{}\\{}", APP_PATHS_ROOT, subkey);
        let info = match backend.read_registry_key(&key_path) {
            Ok(info) => info,
            Err(e) if e.is_per_resource() => continue,
            Err(e) => return Err(e),
        };

        // 默认值即程序路径
        let Some(target) = info.values.get("").and_then(|v| executable_path(v)) else {
            continue;
        };
        if is_absolute(&target) && !exists(backend, &target)? {
            candidates.push(RawCandidate::new(
                format!("{} 的程序路径", subkey),
                key_path,
                CandidateKind::RegistryRemnant,
            ));
        }
    }

    Ok(candidates)
}

fn exists(backend: &dyn SystemBackend, path: &str) -> Result<bool, CleanupError> {
    match backend.get_file_info(path) {
        Ok(info) => Ok(info.is_some()),
        // 无权访问时按存在处理，避免误报
        Err(e) if e.is_per_resource() => Ok(true),
        Err(e) => Err(e),
    }
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\'
}

fn is_system_tool(exe: &str) -> bool {
    let name = utils::display_name(exe).to_lowercase();
    matches!(name.as_str(), "msiexec.exe" | "rundll32.exe" | "cmd.exe")
}

/// 从命令行中取出可执行文件路径
fn executable_path(command: &str) -> Option<String> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    if let Some(rest) = command.strip_prefix('"') {
        return rest.split('"').next().map(|s| s.to_string());
    }

    let lower = command.to_lowercase();
    match lower.find(".exe") {
        Some(end) => Some(command[..end + 4].to_string()),
        None => command.split_whitespace().next().map(|s| s.to_string()),
    }
}

/// 注册表项没有修改时间，样本与时间无关
pub fn fixtures(_now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        RawCandidate::new(
            "OldEditor 的卸载信息",
            r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\OldEditor",
            CandidateKind::RegistryRemnant,
        ),
        RawCandidate::new(
            "retired.exe 的程序路径",
            r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths\retired.exe",
            CandidateKind::RegistryRemnant,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::backend::testing::MemoryBackend;
    use crate::modules::scanner::software_remnants::UNINSTALL_ROOTS;

    #[test]
    fn extracts_executable_from_command_line() {
        assert_eq!(
            executable_path(r#""C:\Program Files\App\uninst.exe" /S"#).as_deref(),
            Some(r"C:\Program Files\App\uninst.exe")
        );
        assert_eq!(
            executable_path(r"C:\Tools\App\Uninstall.EXE --quiet").as_deref(),
            Some(r"C:\Tools\App\Uninstall.EXE")
        );
        assert_eq!(executable_path("  "), None);
    }

    #[tokio::test]
    async fn flags_entries_pointing_to_missing_programs() {
        let root = UNINSTALL_ROOTS[2];
        let backend = MemoryBackend::new()
            .with_registry_key(root, &[])
            .with_registry_key(
                &format!(r"{}\Gone", root),
                &[("DisplayName", "Gone App"), ("InstallLocation", r"C:\Apps\Gone")],
            )
            .with_registry_key(
                &format!(r"{}\Present", root),
                &[("DisplayName", "Present App"), ("InstallLocation", r"C:\Apps\Present")],
            )
            .with_registry_key(
                &format!(r"{}\Msi", root),
                &[("UninstallString", "MsiExec.exe /X{1234}")],
            )
            .with_file(r"C:\Apps\Present\present.exe", 10, None)
            .with_registry_key(APP_PATHS_ROOT, &[])
            .with_registry_key(
                &format!(r"{}\lost.exe", APP_PATHS_ROOT),
                &[("", r"C:\Apps\Lost\lost.exe")],
            );
        let mut sink = ProgressSink::detached();

        let found = scan(&backend, &mut sink).await.unwrap();

        let paths: Vec<_> = found.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(found.len(), 2, "{:?}", paths);
        assert!(paths.iter().any(|p| p.ends_with(r"Uninstall\Gone")));
        assert!(paths.iter().any(|p| p.ends_with(r"App Paths\lost.exe")));
        assert!(found.iter().all(|c| c.kind == CandidateKind::RegistryRemnant));
        assert_eq!(sink.local_percent(), 100);
    }
}
