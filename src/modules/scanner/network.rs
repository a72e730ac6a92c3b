use chrono::{DateTime, Utc};

use super::models::{CandidateKind, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::SystemBackend;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 扫描网络缓存：DNS 解析缓存、IE/Edge 旧版 Internet 缓存和 BITS 队列
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    // DNS 缓存不占磁盘空间，以伪路径表示，清理时走 flush_dns_cache
    let mut candidates = vec![dns_candidate()];
    sink.report(10, "DNS 缓存").await;

    candidates.append(&mut scan_targets(backend, &targets(), sink, 10, 100).await?);
    Ok(candidates)
}

fn dns_candidate() -> RawCandidate {
    RawCandidate::new("DNS 解析缓存", utils::DNS_CACHE_PATH, CandidateKind::DnsCache)
}

fn targets() -> Vec<ScanTarget> {
    let mut targets = Vec::new();

    if let Some(local) = utils::local_app_data() {
        targets.push(ScanTarget::new(
            join(&local, &["Microsoft", "Windows", "INetCache"]),
            CandidateKind::InternetCache,
            TargetMode::Whole,
            "Internet 临时文件",
        ));
    }

    targets.push(ScanTarget::new(
        join(&utils::program_data(), &["Microsoft", "Network", "Downloader"]),
        CandidateKind::BitsQueue,
        TargetMode::Whole,
        "后台传输队列",
    ));

    targets
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    vec![
        dns_candidate(),
        fixture(
            "Internet 临时文件",
            r"C:\Users\Public\AppData\Local\Microsoft\Windows\INetCache",
            52_428_800,
            3,
            CandidateKind::InternetCache,
            now,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dns_cache_is_always_reported() {
        let backend = crate::modules::backend::testing::MemoryBackend::new();
        let mut sink = ProgressSink::detached();

        let found = scan(&backend, &mut sink).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, utils::DNS_CACHE_PATH);
        assert_eq!(found[0].size, 0);
        assert_eq!(sink.local_percent(), 100);
    }
}
