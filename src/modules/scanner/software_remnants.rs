use std::path::Path;

use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, scan_targets, ScanTarget, TargetMode, AGGREGATE_DEPTH};
use crate::modules::backend::{DirScanOptions, SystemBackend};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 卸载信息所在的注册表位置
pub(crate) const UNINSTALL_ROOTS: &[&str] = &[
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
];

/// 系统或常见运行库目录，不视为残留
const APPDATA_ALLOWLIST: &[&str] = &[
    "microsoft",
    "windows",
    "packages",
    "temp",
    "programs",
    "publishers",
    "virtualstore",
    "connecteddevicesplatform",
    "comms",
    "crashdumps",
    "d3dscache",
    "google",
    "mozilla",
    "nvidia",
    "nvidia corporation",
    "intel",
    "amd",
    "apple",
    "adobe",
    "tencent",
    "package cache",
    "ssh",
    "usoshared",
    "usoprivate",
    "softwaredistribution",
    "regid.1991-06.com.microsoft",
    "rust-qing",
];

/// 名称过短时容易误匹配，不参与比较
const MIN_TOKEN_LEN: usize = 3;

/// 注册表中的一条卸载信息
#[derive(Debug, Clone, Default)]
pub(crate) struct UninstallEntry {
    pub key_path: String,
    pub display_name: String,
    pub publisher: String,
    pub install_location: String,
    pub uninstall_string: String,
}

/// 读取所有卸载信息，单个键不可读时跳过
pub(crate) fn read_uninstall_entries(
    backend: &dyn SystemBackend,
) -> Result<Vec<UninstallEntry>, CleanupError> {
    let mut entries = Vec::new();

    for root in UNINSTALL_ROOTS {
        let root_info = match backend.read_registry_key(root) {
            Ok(info) => info,
            Err(e) if e.is_per_resource() => {
                tracing::debug!("跳过卸载根键 {}: {}", root, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        for subkey in &root_info.subkeys {
            let key_path = format!("{}\\{}", root, subkey);
            match backend.read_registry_key(&key_path) {
                Ok(info) => {
                    let value = |name: &str| info.values.get(name).cloned().unwrap_or_default();
                    entries.push(UninstallEntry {
                        display_name: value("DisplayName"),
                        publisher: value("Publisher"),
                        install_location: value("InstallLocation"),
                        uninstall_string: value("UninstallString"),
                        key_path,
                    });
                }
                Err(e) if e.is_per_resource() => {
                    tracing::debug!("跳过卸载项 {}: {}", key_path, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(entries)
}

/// 扫描已卸载软件留下的数据目录和下载目录中的安装包
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let entries = read_uninstall_entries(backend)?;
    let known = known_tokens(&entries);
    sink.report(30, "已安装程序").await;

    let mut candidates = Vec::new();

    // 读不到任何已安装程序时无法判断归属，跳过残留目录检查
    if known.is_empty() {
        tracing::debug!("未读取到已安装程序，跳过残留目录检查");
    } else {
        let mut bases = Vec::new();
        if let Some(roaming) = utils::roaming_app_data() {
            bases.push(roaming);
        }
        if let Some(local) = utils::local_app_data() {
            bases.push(local);
        }
        bases.push(utils::program_data());

        for base in &bases {
            candidates.append(&mut scan_orphans(backend, base, &known)?);
        }
    }
    sink.report(70, "残留数据目录").await;

    let mut installers = scan_targets(backend, &installer_targets(), sink, 70, 100).await?;
    candidates.append(&mut installers);

    Ok(candidates)
}

/// 从程序名、发布者和安装目录名提取用于比较的小写名称
fn known_tokens(entries: &[UninstallEntry]) -> Vec<String> {
    let mut tokens: Vec<String> = entries
        .iter()
        .flat_map(|entry| {
            [
                entry.display_name.clone(),
                entry.publisher.clone(),
                utils::display_name(&entry.install_location),
            ]
        })
        .map(|token| token.trim().to_lowercase())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

fn belongs_to_known(dir_name: &str, known: &[String]) -> bool {
    let name = dir_name.to_lowercase();
    if APPDATA_ALLOWLIST.contains(&name.as_str()) {
        return true;
    }
    if name.chars().count() < MIN_TOKEN_LEN {
        return true;
    }
    known
        .iter()
        .any(|token| token.contains(&name) || name.contains(token.as_str()))
}

fn scan_orphans(
    backend: &dyn SystemBackend,
    base: &Path,
    known: &[String],
) -> Result<Vec<RawCandidate>, CleanupError> {
    let base_path = utils::path_string(base);
    let children = match backend.scan_directory(&base_path, &DirScanOptions::shallow()) {
        Ok(children) => children,
        Err(e) if e.is_per_resource() => {
            tracing::debug!("跳过目录 {}: {}", base_path, e);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut orphans = Vec::new();
    for child in children.iter().filter(|c| c.is_dir) {
        if belongs_to_known(&child.name, known) {
            continue;
        }

        match backend.scan_directory(&child.path, &DirScanOptions::recursive(AGGREGATE_DEPTH)) {
            Ok(entries) => {
                let files: Vec<_> = entries.iter().filter(|e| !e.is_dir).collect();
                if files.is_empty() {
                    continue;
                }
                let size = files.iter().map(|f| f.size).sum();
                let newest = files.iter().filter_map(|f| f.modified).max();
                orphans.push(
                    RawCandidate::new(
                        child.name.clone(),
                        child.path.clone(),
                        CandidateKind::OrphanedAppData,
                    )
                    .with_size(size)
                    .with_modified(newest),
                );
            }
            Err(e) if e.is_per_resource() => {
                tracing::debug!("跳过子目录 {}: {}", child.path, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(orphans)
}

fn installer_targets() -> Vec<ScanTarget> {
    utils::downloads_dir()
        .map(|downloads| {
            vec![ScanTarget::new(
                downloads,
                CandidateKind::LeftoverInstaller,
                TargetMode::EachFile,
                "下载目录中的安装包",
            )
            .extensions(&["exe", "msi"])]
        })
        .unwrap_or_default()
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "OldEditor",
            r"C:\Users\Public\AppData\Roaming\OldEditor",
            73_400_320,
            240,
            CandidateKind::OrphanedAppData,
            now,
        ),
        fixture(
            "RetiredTool",
            r"C:\ProgramData\RetiredTool",
            15_728_640,
            400,
            CandidateKind::OrphanedAppData,
            now,
        ),
        fixture(
            "setup-2.3.1.exe",
            r"C:\Users\Public\Downloads\setup-2.3.1.exe",
            104_857_600,
            90,
            CandidateKind::LeftoverInstaller,
            now,
        ),
    ]
}
