//! 模拟后端
//!
//! 真实后端不可用时替代扫描数据源和删除后端：扫描返回各类别的固定样本，
//! 删除总是成功，不触碰文件系统。进度节奏和真实运行一致，结果完全确定。

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::modules::backend::{
    DeleteReport, DirScanOptions, FileInfo, MemoryInfo, RegistryKeyInfo, SystemBackend,
};
use crate::modules::common::error::CleanupError;
use crate::modules::orchestrator::progress::ProgressSink;
use crate::modules::scanner::category_fixtures;
use crate::modules::scanner::models::{RawCandidate, ScanCategory};

/// 每个类别的模拟进度步数
const SCAN_STEPS: u8 = 4;

/// 模拟节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// 扫描进度每步的间隔
    pub step_delay: Duration,
    /// 每批删除的耗时
    pub delete_delay: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(60),
            delete_delay: Duration::from_millis(40),
        }
    }
}

impl SimulatorConfig {
    /// 无延迟，测试用
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            delete_delay: Duration::ZERO,
        }
    }
}

/// 模拟扫描一个类别
pub async fn simulate_scan(
    category: ScanCategory,
    sink: &mut ProgressSink,
    now: DateTime<Utc>,
    config: &SimulatorConfig,
) -> Vec<RawCandidate> {
    for step in 1..=SCAN_STEPS {
        if !config.step_delay.is_zero() {
            tokio::time::sleep(config.step_delay).await;
        }
        let percent = 100 * u32::from(step) / u32::from(SCAN_STEPS);
        sink.report(percent as u8, format!("{}（模拟）", category.label())).await;
    }

    category_fixtures(category, now)
}

/// 删除总是成功的模拟后端
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    config: SimulatorConfig,
}

impl SimulatedBackend {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }
}

impl SystemBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulator"
    }

    fn scan_directory(
        &self,
        _path: &str,
        _options: &DirScanOptions,
    ) -> Result<Vec<FileInfo>, CleanupError> {
        Ok(Vec::new())
    }

    fn get_file_info(&self, _path: &str) -> Result<Option<FileInfo>, CleanupError> {
        Ok(None)
    }

    fn delete_files(&self, paths: &[String]) -> Result<DeleteReport, CleanupError> {
        if !self.config.delete_delay.is_zero() {
            std::thread::sleep(self.config.delete_delay);
        }
        Ok(DeleteReport {
            deleted_files: paths.to_vec(),
            failed_files: Vec::new(),
        })
    }

    fn read_registry_key(&self, _path: &str) -> Result<RegistryKeyInfo, CleanupError> {
        Ok(RegistryKeyInfo::default())
    }

    fn delete_registry_key(&self, _path: &str) -> Result<(), CleanupError> {
        Ok(())
    }

    fn get_system_memory_info(&self) -> Result<MemoryInfo, CleanupError> {
        const GB: u64 = 1024 * 1024 * 1024;
        Ok(MemoryInfo {
            total: 16 * GB,
            used: 9 * GB,
            available: 7 * GB,
        })
    }

    fn flush_dns_cache(&self) -> Result<(), CleanupError> {
        Ok(())
    }
}
