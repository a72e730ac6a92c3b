//! 用户设置
//!
//! 设置保存在 `<本地数据目录>/rust-qing/settings.json`，目录可以用环境变量
//! `RUST_QING_CONFIG_DIR` 覆盖。这里只读取，不写回。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::modules::classifier::enrichment::EnrichmentConfig;
use crate::modules::classifier::retention::RetentionSettings;
use crate::modules::cleaner::models::{CleanOptions, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::modules::common::error::CleanupError;

const APP_DIR: &str = "rust-qing";
const SETTINGS_FILE: &str = "settings.json";
pub const CONFIG_DIR_ENV: &str = "RUST_QING_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 聊天软件保留策略
    pub retention: RetentionSettings,
    /// 为 false 时始终使用模拟后端
    pub use_real_backend: bool,
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
    pub enrichment: EnrichmentConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let clean = CleanOptions::default();
        Self {
            retention: RetentionSettings::default(),
            use_real_backend: true,
            batch_size: clean.batch_size,
            inter_batch_delay_ms: clean.inter_batch_delay.as_millis() as u64,
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl Settings {
    /// 从默认位置加载
    pub fn load() -> Self {
        Self::load_from(&settings_file())
    }

    /// 从指定文件加载，文件缺失或损坏时使用默认设置
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(settings)) => {
                tracing::debug!("已加载设置: {}", path.display());
                settings
            }
            Ok(None) => {
                tracing::debug!("设置文件不存在，使用默认设置: {}", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("设置文件无效，使用默认设置: {}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>, CleanupError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)
            .map_err(|e| CleanupError::Config(format!("{}: {}", path.display(), e)))?;
        settings.batch_size = settings.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        Ok(Some(settings))
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions::new(
            self.batch_size,
            Duration::from_millis(self.inter_batch_delay_ms),
        )
    }
}

/// 设置目录
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn settings_file() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::classifier::retention::RetentionPolicy;

    fn temp_file(name: &str, content: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rust-qing-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_file("settings.json", None);
        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        assert!(settings.use_real_backend);
        assert_eq!(settings.batch_size, 8);
        assert!(!path.exists());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_file(
            "settings.json",
            Some(r#"{ "retention": { "wechat": { "months_to_keep": 3 } }, "batch_size": 500 }"#),
        );

        let settings = Settings::load_from(&path);

        assert_eq!(settings.retention.wechat, RetentionPolicy::keep_months(3));
        assert_eq!(settings.retention.qq, RetentionPolicy::default());
        assert_eq!(settings.batch_size, MAX_BATCH_SIZE);
        assert_eq!(settings.inter_batch_delay_ms, 100);
        assert!((settings.enrichment.min_confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(settings.clean_options().batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = temp_file("settings.json", Some("{ not json"));
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
