use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::path::PathBuf;

/// 非文件资源的伪路径前缀
pub const PSEUDO_PREFIX: &str = "pseudo:";

/// DNS 缓存伪路径
pub const DNS_CACHE_PATH: &str = "pseudo:dns-cache";

const REGISTRY_ROOTS: &[&str] = &[
    "HKLM\\",
    "HKCU\\",
    "HKCR\\",
    "HKU\\",
    "HKCC\\",
    "HKEY_LOCAL_MACHINE\\",
    "HKEY_CURRENT_USER\\",
    "HKEY_CLASSES_ROOT\\",
    "HKEY_USERS\\",
    "HKEY_CURRENT_CONFIG\\",
];

/// 规范化路径（统一反斜杠、合并连续分隔符、去掉末尾分隔符）
pub fn normalize_path(path: &str) -> String {
    let replaced = path.trim().replace('/', "\\");

    let mut normalized = String::with_capacity(replaced.len());
    let mut previous_was_separator = false;
    for ch in replaced.chars() {
        if ch == '\\' {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        normalized.push(ch);
    }

    // 保留盘符根目录 C:\ 的分隔符
    while normalized.ends_with('\\') && normalized.len() > 3 {
        normalized.pop();
    }

    normalized
}

/// 是否为注册表路径
pub fn is_registry_path(path: &str) -> bool {
    let upper = path.trim().to_uppercase();
    REGISTRY_ROOTS.iter().any(|root| upper.starts_with(root))
}

/// 是否为伪路径（DNS 缓存等非文件资源）
pub fn is_pseudo_path(path: &str) -> bool {
    path.trim().starts_with(PSEUDO_PREFIX)
}

/// 获取模糊匹配分数
pub fn fuzzy_score(text: &str, pattern: &str) -> i64 {
    let matcher = SkimMatcherV2::default();
    matcher.fuzzy_match(text, pattern).unwrap_or(0)
}

/// 格式化文件大小
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 由路径和类型标签生成稳定 ID，同一路径在一次扫描内始终得到相同 ID
pub fn stable_id(path: &str, tag: &str) -> String {
    let key = format!("{}|{}", tag, normalize_path(path).to_lowercase());
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// 生成唯一 ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn env_dir(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Windows 目录
pub fn windows_dir() -> PathBuf {
    env_dir("SystemRoot")
        .or_else(|| env_dir("windir"))
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
}

/// 系统盘根目录
pub fn system_drive() -> PathBuf {
    env_dir("SystemDrive")
        .map(|d| PathBuf::from(format!("{}\\", d.to_string_lossy())))
        .unwrap_or_else(|| PathBuf::from(r"C:\"))
}

/// %LOCALAPPDATA%
pub fn local_app_data() -> Option<PathBuf> {
    env_dir("LOCALAPPDATA").or_else(|| dirs::home_dir().map(|h| h.join("AppData").join("Local")))
}

/// %APPDATA%
pub fn roaming_app_data() -> Option<PathBuf> {
    env_dir("APPDATA").or_else(|| dirs::home_dir().map(|h| h.join("AppData").join("Roaming")))
}

/// %ProgramData%
pub fn program_data() -> PathBuf {
    env_dir("ProgramData").unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
}

/// 用户文档目录
pub fn documents_dir() -> Option<PathBuf> {
    dirs::document_dir().or_else(|| dirs::home_dir().map(|h| h.join("Documents")))
}

/// 用户下载目录
pub fn downloads_dir() -> Option<PathBuf> {
    dirs::download_dir().or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
}

/// 转为字符串路径
pub fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}

/// 取路径最后一段作为显示名
pub fn display_name(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized
        .rsplit('\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or(normalized.as_str())
        .to_string()
}
