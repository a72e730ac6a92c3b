use crate::modules::classifier::models::{CleanupItem, RiskLevel};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;

/// 受保护的系统目录，其本身及其下所有内容都不能删除
const PROTECTED_PREFIXES: &[&str] = &[
    r"C:\Windows\System32",
    r"C:\Windows\SysWOW64",
    r"C:\Windows\WinSxS",
    r"C:\Windows\INF",
    r"C:\Windows\Boot",
    r"C:\Windows\Fonts",
    r"C:\Windows\servicing",
    r"C:\Windows\assembly",
    r"C:\Windows\DriverStore",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
];

/// 只保护目录本身，目录下的缓存和日志可以清理
const PROTECTED_ROOTS: &[&str] = &[
    r"C:\",
    r"C:\Windows",
    r"C:\Users",
    r"C:\ProgramData",
];

/// 关键注册表路径黑名单
const CRITICAL_REGISTRY_PATHS: &[&str] = &[
    r"HKLM\SYSTEM",
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion",
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Run",
    r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
    r"HKLM\BOOT",
    r"HKLM\SAM",
    r"HKLM\SECURITY",
];

/// 删除前检查，不通过的项被跳过而不是记为失败
pub fn pre_delete_check(item: &CleanupItem) -> Result<(), CleanupError> {
    if item.risk_level == RiskLevel::High {
        return Err(CleanupError::CriticalSystemItem(format!(
            "高风险项不能删除: {}",
            item.path
        )));
    }

    if item.retained {
        return Err(CleanupError::PermissionDenied(format!(
            "保留期内的内容: {}",
            item.path
        )));
    }

    if !item.can_delete {
        return Err(CleanupError::PermissionDenied(format!(
            "该项不允许删除: {}",
            item.path
        )));
    }

    if utils::is_pseudo_path(&item.path) {
        return Ok(());
    }

    if utils::is_registry_path(&item.path) {
        if is_critical_registry(&item.path) {
            return Err(CleanupError::CriticalSystemItem(
                "不能删除关键系统注册表项".to_string(),
            ));
        }
        return Ok(());
    }

    if is_protected_path(&item.path) {
        return Err(CleanupError::CriticalSystemItem(format!(
            "不能删除受保护的系统目录: {}",
            item.path
        )));
    }

    Ok(())
}

fn upper(path: &str) -> String {
    utils::normalize_path(path).to_uppercase()
}

/// 路径等于前缀，或位于前缀目录之下
fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix)
            && (prefix.ends_with('\\') || path[prefix.len()..].starts_with('\\')))
}

/// 检查是否为受保护的系统路径
pub fn is_protected_path(path: &str) -> bool {
    let path_upper = upper(path);
    if path_upper.is_empty() {
        return true;
    }

    // 系统目录可能不在 C 盘
    let windows = upper(&utils::path_string(&utils::windows_dir()));
    let drive = upper(&utils::path_string(&utils::system_drive()));

    if path_upper == windows || path_upper == drive {
        return true;
    }

    PROTECTED_ROOTS.iter().any(|root| path_upper == upper(root))
        || PROTECTED_PREFIXES
            .iter()
            .any(|prefix| is_within(&path_upper, &upper(prefix)))
}

/// 检查是否为关键注册表路径
fn is_critical_registry(path: &str) -> bool {
    let path_upper = upper(path)
        .replacen("HKEY_LOCAL_MACHINE\\", "HKLM\\", 1)
        .replacen("HKEY_CURRENT_USER\\", "HKCU\\", 1);

    CRITICAL_REGISTRY_PATHS
        .iter()
        .any(|critical| is_within(&path_upper, &critical.to_uppercase()))
}
