use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 扫描 Windows 更新残留
///
/// 包括更新下载缓存、DataStore 日志、传递优化缓存，以及系统升级后
/// 遗留的 Windows.old / $Windows.~BT 目录。WinSxS 组件存储需要 DISM 处理，不在此列。
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    scan_targets(backend, &targets(), sink, 0, 100).await
}

fn targets() -> Vec<ScanTarget> {
    let windows = utils::windows_dir();
    let drive = utils::system_drive();
    let distribution = windows.join("SoftwareDistribution");

    vec![
        ScanTarget::new(
            distribution.join("Download"),
            CandidateKind::UpdateDownload,
            TargetMode::Whole,
            "更新下载缓存",
        ),
        ScanTarget::new(
            join(&distribution, &["DataStore", "Logs"]),
            CandidateKind::LogFile,
            TargetMode::Whole,
            "更新数据库日志",
        ),
        ScanTarget::new(
            join(
                &windows,
                &[
                    "ServiceProfiles",
                    "NetworkService",
                    "AppData",
                    "Local",
                    "Microsoft",
                    "Windows",
                    "DeliveryOptimization",
                    "Cache",
                ],
            ),
            CandidateKind::DeliveryOptimization,
            TargetMode::Whole,
            "传递优化缓存",
        ),
        ScanTarget::new(
            drive.join("Windows.old"),
            CandidateKind::PreviousInstallation,
            TargetMode::Whole,
            "旧版 Windows 安装",
        ),
        ScanTarget::new(
            drive.join("$Windows.~BT"),
            CandidateKind::PreviousInstallation,
            TargetMode::Whole,
            "升级临时文件",
        ),
        ScanTarget::new(
            drive.join("$Windows.~WS"),
            CandidateKind::PreviousInstallation,
            TargetMode::Whole,
            "升级安装介质",
        ),
    ]
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "更新下载缓存",
            r"C:\Windows\SoftwareDistribution\Download",
            734_003_200,
            20,
            CandidateKind::UpdateDownload,
            now,
        ),
        fixture(
            "传递优化缓存",
            r"C:\Windows\ServiceProfiles\NetworkService\AppData\Local\Microsoft\Windows\DeliveryOptimization\Cache",
            209_715_200,
            9,
            CandidateKind::DeliveryOptimization,
            now,
        ),
        fixture(
            "旧版 Windows 安装",
            r"C:\Windows.old",
            12_884_901_888,
            90,
            CandidateKind::PreviousInstallation,
            now,
        ),
    ]
}
