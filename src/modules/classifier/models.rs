use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::scanner::models::{CandidateKind, ChatApp};

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Caution,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "安全",
            RiskLevel::Caution => "谨慎",
            RiskLevel::High => "高风险",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 清理项类别，分配后不再变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    System,
    Browser,
    User,
    Registry,
    Backup,
    Downloads,
    WeChat,
    Qq,
    Application,
    SoftwareRemnant,
    RegistryRemnant,
    PrivacyData,
    Network,
    Unknown,
}

impl ItemCategory {
    /// 由扫描器给出的类型标签映射类别
    pub fn from_kind(kind: &CandidateKind) -> Self {
        match kind {
            CandidateKind::SystemTemp
            | CandidateKind::Prefetch
            | CandidateKind::ThumbnailCache
            | CandidateKind::ShaderCache
            | CandidateKind::LogFile
            | CandidateKind::ErrorReport
            | CandidateKind::UpdateDownload
            | CandidateKind::DeliveryOptimization
            | CandidateKind::MemoryDump
            | CandidateKind::HibernationFile => ItemCategory::System,
            CandidateKind::CrashDump => ItemCategory::Application,
            CandidateKind::UserTemp => ItemCategory::User,
            CandidateKind::BrowserCache | CandidateKind::BrowserHistory => ItemCategory::Browser,
            CandidateKind::PreviousInstallation => ItemCategory::Backup,
            CandidateKind::RecentDocument | CandidateKind::JumpList => ItemCategory::PrivacyData,
            CandidateKind::PrivacyRegistry => ItemCategory::Registry,
            CandidateKind::DnsCache | CandidateKind::InternetCache | CandidateKind::BitsQueue => {
                ItemCategory::Network
            }
            CandidateKind::OrphanedAppData => ItemCategory::SoftwareRemnant,
            CandidateKind::LeftoverInstaller => ItemCategory::Downloads,
            CandidateKind::RegistryRemnant => ItemCategory::RegistryRemnant,
            CandidateKind::Chat { app, .. } => match app {
                ChatApp::WeChat => ItemCategory::WeChat,
                ChatApp::Qq => ItemCategory::Qq,
            },
            CandidateKind::Other { .. } => ItemCategory::Unknown,
        }
    }

    /// 内容本身可随时重建的类别
    pub fn is_known_safe(&self) -> bool {
        matches!(
            self,
            ItemCategory::System | ItemCategory::Browser | ItemCategory::User | ItemCategory::Network
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemCategory::System => "系统",
            ItemCategory::Browser => "浏览器",
            ItemCategory::User => "用户",
            ItemCategory::Registry => "注册表",
            ItemCategory::Backup => "备份",
            ItemCategory::Downloads => "下载",
            ItemCategory::WeChat => "微信",
            ItemCategory::Qq => "QQ",
            ItemCategory::Application => "应用程序",
            ItemCategory::SoftwareRemnant => "软件残留",
            ItemCategory::RegistryRemnant => "注册表残留",
            ItemCategory::PrivacyData => "隐私数据",
            ItemCategory::Network => "网络",
            ItemCategory::Unknown => "未知",
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 已分类的清理项
///
/// 由分类器一次性构造，之后直到被删除前不再修改。
/// `risk_level == High` 时 `can_delete` 一定为 `false`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupItem {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub category: ItemCategory,
    pub risk_level: RiskLevel,
    pub can_delete: bool,
    pub suggestion: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub kind: CandidateKind,
    /// 受保留策略保护
    #[serde(default)]
    pub retained: bool,
}
