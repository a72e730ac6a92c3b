use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::{DirScanOptions, SystemBackend};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// Chromium 系浏览器的缓存子目录
const CHROMIUM_CACHE_DIRS: &[&str] = &["Cache", "Code Cache", "GPUCache"];

/// 扫描系统缓存、临时文件和浏览器缓存
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let mut targets = fixed_targets();

    // Firefox 的缓存位于各个配置目录下，先列出配置目录
    if let Some(local) = utils::local_app_data() {
        let profiles = join(&local, &["Mozilla", "Firefox", "Profiles"]);
        match backend.scan_directory(&utils::path_string(&profiles), &DirScanOptions::shallow()) {
            Ok(entries) => {
                for profile in entries.iter().filter(|e| e.is_dir) {
                    targets.push(ScanTarget::new(
                        std::path::Path::new(&profile.path).join("cache2"),
                        CandidateKind::BrowserCache,
                        TargetMode::Whole,
                        "Firefox 缓存",
                    ));
                }
            }
            Err(e) if e.is_per_resource() => {
                tracing::debug!("未找到 Firefox 配置: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
    sink.report(5, "浏览器配置").await;

    scan_targets(backend, &targets, sink, 5, 100).await
}

fn fixed_targets() -> Vec<ScanTarget> {
    let windows = utils::windows_dir();
    let mut targets = vec![
        ScanTarget::new(
            windows.join("Temp"),
            CandidateKind::SystemTemp,
            TargetMode::Whole,
            "Windows 临时文件",
        ),
        ScanTarget::new(
            windows.join("Prefetch"),
            CandidateKind::Prefetch,
            TargetMode::Whole,
            "预读取文件",
        )
        .extensions(&["pf"]),
    ];

    if let Some(local) = utils::local_app_data() {
        targets.push(ScanTarget::new(
            local.join("Temp"),
            CandidateKind::UserTemp,
            TargetMode::Whole,
            "用户临时文件",
        ));
        targets.push(
            ScanTarget::new(
                join(&local, &["Microsoft", "Windows", "Explorer"]),
                CandidateKind::ThumbnailCache,
                TargetMode::EachFile,
                "缩略图缓存",
            )
            .pattern("thumbcache_*.db"),
        );
        targets.push(ScanTarget::new(
            local.join("D3DSCache"),
            CandidateKind::ShaderCache,
            TargetMode::Whole,
            "DirectX 着色器缓存",
        ));
        targets.push(ScanTarget::new(
            join(&local, &["NVIDIA", "DXCache"]),
            CandidateKind::ShaderCache,
            TargetMode::Whole,
            "NVIDIA 着色器缓存",
        ));

        for (browser, base) in [
            ("Chrome", join(&local, &["Google", "Chrome", "User Data", "Default"])),
            ("Edge", join(&local, &["Microsoft", "Edge", "User Data", "Default"])),
        ] {
            for cache_dir in CHROMIUM_CACHE_DIRS {
                targets.push(ScanTarget::new(
                    base.join(cache_dir),
                    CandidateKind::BrowserCache,
                    TargetMode::Whole,
                    &format!("{} {}", browser, cache_dir),
                ));
            }
        }
    }

    targets
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        fixture(
            "Windows 临时文件",
            r"C:\Windows\Temp",
            184_320_000,
            2,
            CandidateKind::SystemTemp,
            now,
        ),
        fixture(
            "用户临时文件",
            r"C:\Users\Public\AppData\Local\Temp",
            96_468_992,
            1,
            CandidateKind::UserTemp,
            now,
        ),
        fixture(
            "预读取文件",
            r"C:\Windows\Prefetch",
            12_582_912,
            5,
            CandidateKind::Prefetch,
            now,
        ),
        fixture(
            "Chrome Cache",
            r"C:\Users\Public\AppData\Local\Google\Chrome\User Data\Default\Cache",
            268_435_456,
            1,
            CandidateKind::BrowserCache,
            now,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::backend::testing::MemoryBackend;

    #[tokio::test]
    async fn finds_temp_and_firefox_profiles() {
        let windows = utils::path_string(&utils::windows_dir());
        let mut backend = MemoryBackend::new()
            .with_file(&format!(r"{}\Temp\setup.tmp", windows), 100, None)
            .with_file(&format!(r"{}\Prefetch\APP.EXE-1234.pf", windows), 7, None)
            .with_file(&format!(r"{}\Prefetch\Layout.ini", windows), 3, None);

        if let Some(local) = utils::local_app_data() {
            let local = utils::path_string(&local);
            backend = backend.with_file(
                &format!(r"{}\Mozilla\Firefox\Profiles\abc.default\cache2\entries\X", local),
                50,
                None,
            );
        }

        let mut sink = ProgressSink::detached();
        let found = scan(&backend, &mut sink).await.unwrap();

        let temp = found.iter().find(|c| c.kind == CandidateKind::SystemTemp).unwrap();
        assert_eq!(temp.size, 100);
        let prefetch = found.iter().find(|c| c.kind == CandidateKind::Prefetch).unwrap();
        assert_eq!(prefetch.size, 7);
        if utils::local_app_data().is_some() {
            assert!(found.iter().any(|c| c.kind == CandidateKind::BrowserCache && c.size == 50));
        }
        assert_eq!(sink.local_percent(), 100);
    }

    #[test]
    fn fixtures_are_deterministic() {
        let now = Utc::now();
        assert_eq!(fixtures(now), fixtures(now));
    }
}
