use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 扫描内存转储、崩溃转储和休眠文件
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    // 内存信息只用于进度提示，获取失败不影响扫描
    let label = match backend.get_system_memory_info() {
        Ok(info) => format!(
            "内存使用 {}%（可用 {}）",
            info.usage_percent(),
            utils::format_size(info.available)
        ),
        Err(e) if e.is_backend_unavailable() => return Err(e),
        Err(e) => {
            tracing::debug!("获取内存信息失败: {}", e);
            "内存信息".to_string()
        }
    };
    sink.report(5, label).await;

    scan_targets(backend, &targets(), sink, 5, 100).await
}

fn targets() -> Vec<ScanTarget> {
    let windows = utils::windows_dir();
    let drive = utils::system_drive();

    let mut targets = vec![
        ScanTarget::new(
            windows.join("MEMORY.DMP"),
            CandidateKind::MemoryDump,
            TargetMode::File,
            "系统内存转储",
        ),
        ScanTarget::new(
            windows.join("Minidump"),
            CandidateKind::CrashDump,
            TargetMode::EachFile,
            "小型内存转储",
        )
        .extensions(&["dmp"]),
        ScanTarget::new(
            windows.join("LiveKernelReports"),
            CandidateKind::CrashDump,
            TargetMode::Whole,
            "内核实时转储",
        )
        .extensions(&["dmp"]),
    ];

    if let Some(local) = utils::local_app_data() {
        targets.push(
            ScanTarget::new(
                local.join("CrashDumps"),
                CandidateKind::CrashDump,
                TargetMode::EachFile,
                "应用崩溃转储",
            )
            .extensions(&["dmp"]),
        );
    }

    targets.push(ScanTarget::new(
        join(&drive, &["hiberfil.sys"]),
        CandidateKind::HibernationFile,
        TargetMode::File,
        "休眠文件",
    ));

    targets
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "MEMORY.DMP",
            r"C:\Windows\MEMORY.DMP",
            805_306_368,
            12,
            CandidateKind::MemoryDump,
            now,
        ),
        fixture(
            "explorer.exe.4120.dmp",
            r"C:\Users\Public\AppData\Local\CrashDumps\explorer.exe.4120.dmp",
            41_943_040,
            6,
            CandidateKind::CrashDump,
            now,
        ),
    ]
}
