use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 记录最近使用痕迹的注册表键
const PRIVACY_REGISTRY_KEYS: &[(&str, &str)] = &[
    (
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\RecentDocs",
        "最近打开的文档记录",
    ),
    (
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\TypedPaths",
        "地址栏输入记录",
    ),
    (
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\RunMRU",
        "运行对话框历史",
    ),
    (
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\ComDlg32\OpenSavePidlMRU",
        "打开/保存对话框历史",
    ),
];

/// 扫描隐私痕迹：最近文档、跳转列表、浏览历史和注册表 MRU 记录
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let mut candidates = scan_targets(backend, &targets(), sink, 0, 80).await?;

    // 注册表部分按最后 20% 进度汇报
    let mut registry = Vec::new();
    for (path, label) in PRIVACY_REGISTRY_KEYS {
        match backend.read_registry_key(path) {
            Ok(info) => {
                if !info.values.is_empty() || !info.subkeys.is_empty() {
                    registry.push(RawCandidate::new(*label, *path, CandidateKind::PrivacyRegistry));
                }
            }
            Err(e) if e.is_per_resource() => {
                tracing::debug!("跳过注册表项 {}: {}", path, e);
            }
            Err(e) => return Err(e),
        }
    }
    sink.report(100, "注册表使用记录").await;

    candidates.append(&mut registry);
    Ok(candidates)
}

fn targets() -> Vec<ScanTarget> {
    let mut targets = Vec::new();

    if let Some(roaming) = utils::roaming_app_data() {
        let recent = join(&roaming, &["Microsoft", "Windows", "Recent"]);
        targets.push(
            ScanTarget::new(
                recent.clone(),
                CandidateKind::RecentDocument,
                TargetMode::EachFile,
                "最近使用的文件",
            )
            .extensions(&["lnk"]),
        );
        targets.push(ScanTarget::new(
            recent.join("AutomaticDestinations"),
            CandidateKind::JumpList,
            TargetMode::Whole,
            "跳转列表",
        ));
        targets.push(ScanTarget::new(
            recent.join("CustomDestinations"),
            CandidateKind::JumpList,
            TargetMode::Whole,
            "自定义跳转列表",
        ));
    }

    if let Some(local) = utils::local_app_data() {
        for (browser, profile) in [
            ("Chrome", join(&local, &["Google", "Chrome", "User Data", "Default"])),
            ("Edge", join(&local, &["Microsoft", "Edge", "User Data", "Default"])),
        ] {
            targets.push(ScanTarget::new(
                profile.join("History"),
                CandidateKind::BrowserHistory,
                TargetMode::File,
                &format!("{} 浏览历史", browser),
            ));
        }
    }

    targets
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "report.docx.lnk",
            r"C:\Users\Public\AppData\Roaming\Microsoft\Windows\Recent\report.docx.lnk",
            1_024,
            4,
            CandidateKind::RecentDocument,
            now,
        ),
        fixture(
            "跳转列表",
            r"C:\Users\Public\AppData\Roaming\Microsoft\Windows\Recent\AutomaticDestinations",
            2_097_152,
            1,
            CandidateKind::JumpList,
            now,
        ),
        RawCandidate::new(
            "运行对话框历史",
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\RunMRU",
            CandidateKind::PrivacyRegistry,
        ),
    ]
}
