//! 微信与 QQ 的本地缓存和接收文件
//!
//! 按月份分目录的内容（图片、视频、文件）逐个月份产出，
//! 以便保留策略按最后修改时间判断每个月份目录。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::models::{CandidateKind, ChatApp, ChatContent, RawCandidate};
use super::{fixture, join, scan_targets, ScanTarget, TargetMode};
use crate::modules::backend::{DirScanOptions, SystemBackend};
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::orchestrator::progress::ProgressSink;

/// 微信数据目录下不是账号的子目录
const WECHAT_NON_ACCOUNT_DIRS: &[&str] = &["all users", "applet", "wmpf", "plugins"];

const WECHAT_STORAGE: &[(&str, ChatContent)] = &[
    ("Cache", ChatContent::Cache),
    ("Image", ChatContent::Image),
    ("Video", ChatContent::Video),
    ("File", ChatContent::File),
];

const QQ_STORAGE: &[(&str, ChatContent)] = &[
    ("Image", ChatContent::Image),
    ("Video", ChatContent::Video),
    ("FileRecv", ChatContent::File),
    ("Audio", ChatContent::Voice),
];

fn chat_kind(app: ChatApp, content: ChatContent) -> CandidateKind {
    CandidateKind::Chat { app, content }
}

/// 扫描聊天软件缓存
pub async fn scan(
    backend: &dyn SystemBackend,
    sink: &mut ProgressSink,
) -> Result<Vec<RawCandidate>, CleanupError> {
    let mut targets = Vec::new();

    if let Some(documents) = utils::documents_dir() {
        let wechat_root = documents.join("WeChat Files");
        for account in list_accounts(backend, &wechat_root)? {
            let storage = account.join("FileStorage");
            for (dir, content) in WECHAT_STORAGE {
                targets.push(month_target(&storage, dir, ChatApp::WeChat, *content));
            }
        }
        sink.report(5, "微信账号").await;

        let qq_root = documents.join("Tencent Files");
        for account in list_accounts(backend, &qq_root)? {
            for (dir, content) in QQ_STORAGE {
                targets.push(month_target(&account, dir, ChatApp::Qq, *content));
            }
        }
    }
    sink.report(10, "QQ 账号").await;

    if let Some(roaming) = utils::roaming_app_data() {
        targets.push(ScanTarget::new(
            join(&roaming, &["Tencent", "WeChat", "log"]),
            chat_kind(ChatApp::WeChat, ChatContent::Log),
            TargetMode::Whole,
            "微信日志",
        ));
        targets.push(ScanTarget::new(
            join(&roaming, &["Tencent", "QQ", "Temp"]),
            chat_kind(ChatApp::Qq, ChatContent::Temp),
            TargetMode::Whole,
            "QQ 临时文件",
        ));
        targets.push(ScanTarget::new(
            join(&roaming, &["Tencent", "Logs"]),
            chat_kind(ChatApp::Qq, ChatContent::Log),
            TargetMode::Whole,
            "QQ 日志",
        ));
    }

    scan_targets(backend, &targets, sink, 10, 100).await
}

/// 列出账号目录，数据目录不存在时返回空
fn list_accounts(backend: &dyn SystemBackend, root: &Path) -> Result<Vec<PathBuf>, CleanupError> {
    let root_path = utils::path_string(root);
    match backend.scan_directory(&root_path, &DirScanOptions::shallow()) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|e| e.is_dir && !WECHAT_NON_ACCOUNT_DIRS.contains(&e.name.to_lowercase().as_str()))
            .map(|e| PathBuf::from(e.path))
            .collect()),
        Err(e) if e.is_per_resource() => {
            tracing::debug!("未找到聊天数据目录 {}: {}", root_path, e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn month_target(base: &Path, dir: &str, app: ChatApp, content: ChatContent) -> ScanTarget {
    ScanTarget::new(
        base.join(dir),
        chat_kind(app, content),
        TargetMode::EachChild,
        &format!("{}{}", app.label(), content.label()),
    )
}

pub fn fixtures(now: DateTime<Utc>) -> Vec<RawCandidate> {
    let wechat = r"C:\Users\Public\Documents\WeChat Files\wxid_demo\FileStorage";
    let qq = r"C:\Users\Public\Documents\Tencent Files\10001";

    vec![
        fixture(
            "2024-09",
            &format!(r"{}\Cache\2024-09", wechat),
            157_286_400,
            10,
            chat_kind(ChatApp::WeChat, ChatContent::Cache),
            now,
        ),
        fixture(
            "2024-09",
            &format!(r"{}\Image\2024-09", wechat),
            314_572_800,
            20,
            chat_kind(ChatApp::WeChat, ChatContent::Image),
            now,
        ),
        fixture(
            "2024-03",
            &format!(r"{}\Image\2024-03", wechat),
            524_288_000,
            200,
            chat_kind(ChatApp::WeChat, ChatContent::Image),
            now,
        ),
        fixture(
            "2024-08",
            &format!(r"{}\FileRecv\2024-08", qq),
            83_886_080,
            40,
            chat_kind(ChatApp::Qq, ChatContent::File),
            now,
        ),
        fixture(
            "QQ 临时文件",
            r"C:\Users\Public\AppData\Roaming\Tencent\QQ\Temp",
            20_971_520,
            2,
            chat_kind(ChatApp::Qq, ChatContent::Temp),
            now,
        ),
    ]
}
