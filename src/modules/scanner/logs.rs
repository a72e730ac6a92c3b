use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

const LOG_EXTENSIONS: &[&str] = &["log", "etl", "evtx.bak", "old"];

/// 扫描系统日志与错误报告
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    scan_targets(backend, &targets(), sink, 0, 100).await
}

fn targets() -> Vec<ScanTarget> {
    let windows = utils::windows_dir();
    let program_data = utils::program_data();
    let wer = join(&program_data, &["Microsoft", "Windows", "WER"]);

    let mut targets = vec![
        // CBS、DISM 等各自汇总为一项
        ScanTarget::new(
            windows.join("Logs"),
            CandidateKind::LogFile,
            TargetMode::EachChild,
            "Windows 日志",
        )
        .extensions(LOG_EXTENSIONS),
        ScanTarget::new(
            windows.join("Debug"),
            CandidateKind::LogFile,
            TargetMode::Whole,
            "调试日志",
        )
        .extensions(&["log"]),
        ScanTarget::new(
            windows.join("Panther"),
            CandidateKind::LogFile,
            TargetMode::Whole,
            "安装日志",
        )
        .extensions(&["log", "etl"]),
        ScanTarget::new(
            wer.join("ReportArchive"),
            CandidateKind::ErrorReport,
            TargetMode::EachChild,
            "已归档错误报告",
        ),
        ScanTarget::new(
            wer.join("ReportQueue"),
            CandidateKind::ErrorReport,
            TargetMode::EachChild,
            "待发送错误报告",
        ),
    ];

    if let Some(local) = utils::local_app_data() {
        targets.push(ScanTarget::new(
            join(&local, &["Microsoft", "Windows", "WER"]),
            CandidateKind::ErrorReport,
            TargetMode::Whole,
            "用户错误报告",
        ));
    }

    targets
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "CBS",
            r"C:\Windows\Logs\CBS",
            52_428_800,
            3,
            CandidateKind::LogFile,
            now,
        ),
        fixture(
            "AppCrash_explorer.exe",
            r"C:\ProgramData\Microsoft\Windows\WER\ReportArchive\AppCrash_explorer.exe",
            1_048_576,
            12,
            CandidateKind::ErrorReport,
            now,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::backend::testing::MemoryBackend;

    #[tokio::test]
    async fn groups_windows_logs_by_subdirectory() {
        let windows = utils::path_string(&utils::windows_dir());
        let backend = MemoryBackend::new()
            .with_file(&format!(r"{}\Logs\CBS\CBS.log", windows), 40, None)
            .with_file(&format!(r"{}\Logs\CBS\CbsPersist.log", windows), 2, None)
            .with_file(&format!(r"{}\Logs\CBS\FilterList.dat", windows), 99, None)
            .with_file(&format!(r"{}\Logs\DISM\dism.log", windows), 8, None);
        let mut sink = ProgressSink::detached();

        let mut found = scan(&backend, &mut sink).await.unwrap();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        let summary: Vec<_> = found.iter().map(|c| (c.name.as_str(), c.size)).collect();
        assert_eq!(summary, vec![("CBS", 42), ("DISM", 8)]);
        assert!(sink.local_history().windows(2).all(|w| w[0] <= w[1]));
    }
}
