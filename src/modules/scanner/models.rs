use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 扫描类别，声明顺序即扫描顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanCategory {
    /// 系统与浏览器缓存、临时文件
    SystemCache,
    /// 系统与应用日志、错误报告
    Logs,
    /// Windows 更新残留
    WindowsUpdate,
    /// 隐私痕迹
    Privacy,
    /// 内存转储等内存相关文件
    Memory,
    /// 网络缓存
    Network,
    /// 已卸载软件的残留目录、遗留安装包
    SoftwareRemnants,
    /// 注册表残留
    RegistryRemnants,
    /// 聊天软件缓存
    ChatApps,
}

impl ScanCategory {
    pub const ALL: [ScanCategory; 9] = [
        ScanCategory::SystemCache,
        ScanCategory::Logs,
        ScanCategory::WindowsUpdate,
        ScanCategory::Privacy,
        ScanCategory::Memory,
        ScanCategory::Network,
        ScanCategory::SoftwareRemnants,
        ScanCategory::RegistryRemnants,
        ScanCategory::ChatApps,
    ];

    /// 快速扫描子集
    pub const QUICK: [ScanCategory; 3] = [
        ScanCategory::SystemCache,
        ScanCategory::Logs,
        ScanCategory::Network,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScanCategory::SystemCache => "系统缓存",
            ScanCategory::Logs => "日志文件",
            ScanCategory::WindowsUpdate => "更新残留",
            ScanCategory::Privacy => "隐私痕迹",
            ScanCategory::Memory => "内存文件",
            ScanCategory::Network => "网络缓存",
            ScanCategory::SoftwareRemnants => "软件残留",
            ScanCategory::RegistryRemnants => "注册表残留",
            ScanCategory::ChatApps => "聊天软件",
        }
    }

    /// 按固定顺序排列并去重
    pub fn ordered(selection: &[ScanCategory]) -> Vec<ScanCategory> {
        Self::ALL
            .iter()
            .copied()
            .filter(|c| selection.contains(c))
            .collect()
    }

    pub fn parse(name: &str) -> Option<ScanCategory> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "system_cache" | "cache" | "system" => Some(ScanCategory::SystemCache),
            "logs" | "log" => Some(ScanCategory::Logs),
            "windows_update" | "update" => Some(ScanCategory::WindowsUpdate),
            "privacy" => Some(ScanCategory::Privacy),
            "memory" => Some(ScanCategory::Memory),
            "network" => Some(ScanCategory::Network),
            "software_remnants" | "software" => Some(ScanCategory::SoftwareRemnants),
            "registry_remnants" | "registry" => Some(ScanCategory::RegistryRemnants),
            "chat_apps" | "chat" => Some(ScanCategory::ChatApps),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 聊天软件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatApp {
    WeChat,
    Qq,
}

impl ChatApp {
    pub fn label(&self) -> &'static str {
        match self {
            ChatApp::WeChat => "微信",
            ChatApp::Qq => "QQ",
        }
    }
}

/// 聊天软件内容子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatContent {
    Cache,
    Log,
    Temp,
    Image,
    Video,
    Voice,
    File,
}

impl ChatContent {
    /// 临时类内容不受保留策略约束
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatContent::Cache | ChatContent::Log | ChatContent::Temp)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChatContent::Cache => "缓存",
            ChatContent::Log => "日志",
            ChatContent::Temp => "临时文件",
            ChatContent::Image => "图片",
            ChatContent::Video => "视频",
            ChatContent::Voice => "语音",
            ChatContent::File => "接收的文件",
        }
    }
}

/// 扫描器给出的临时类型标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CandidateKind {
    SystemTemp,
    UserTemp,
    Prefetch,
    ThumbnailCache,
    BrowserCache,
    ShaderCache,
    LogFile,
    ErrorReport,
    UpdateDownload,
    DeliveryOptimization,
    PreviousInstallation,
    RecentDocument,
    JumpList,
    BrowserHistory,
    PrivacyRegistry,
    MemoryDump,
    HibernationFile,
    CrashDump,
    DnsCache,
    InternetCache,
    BitsQueue,
    OrphanedAppData,
    LeftoverInstaller,
    RegistryRemnant,
    Chat { app: ChatApp, content: ChatContent },
    Other { tag: String },
}

impl CandidateKind {
    /// 稳定的文本标签，用于 ID 生成和日志
    pub fn tag(&self) -> String {
        match self {
            CandidateKind::Chat { app, content } => format!("chat:{:?}:{:?}", app, content),
            CandidateKind::Other { tag } => format!("other:{}", tag),
            other => format!("{:?}", other),
        }
    }
}

/// 扫描器产出的原始候选项，分类前不含风险等级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub kind: CandidateKind,
}

impl RawCandidate {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            last_modified: None,
            kind,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = modified;
        self
    }
}
