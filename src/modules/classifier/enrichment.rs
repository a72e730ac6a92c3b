//! 可选的外部分析
//!
//! 外部分析器返回原始文本，这里按固定结构严格解码：字段缺失、多余字段、
//! 置信度越界都视为无效结果，分类保持规则判定不变。
//! 有效结果也只能收紧判定（提高风险、禁止删除），不能放宽。

use std::io::Write;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use super::models::{CleanupItem, RiskLevel};
use crate::modules::common::error::CleanupError;

/// 外部分析配置，由调用方显式传入分类器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    /// 低于该置信度的结果被忽略
    pub min_confidence: f64,
    /// 外部分析命令，从标准输入读取清理项 JSON，向标准输出写出判定 JSON
    pub command: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_confidence: 0.8,
            command: None,
        }
    }
}

/// 外部分析器
pub trait Enricher: Send + Sync {
    /// 返回未经解析的分析结果
    fn analyze(&self, item: &CleanupItem) -> Result<String, CleanupError>;
}

/// 外部分析给出的判定
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentVerdict {
    pub risk_level: RiskLevel,
    pub can_delete: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// 严格解码外部分析结果
pub fn decode_verdict(raw: &str) -> Result<EnrichmentVerdict, CleanupError> {
    let verdict: EnrichmentVerdict = serde_json::from_str(raw.trim())
        .map_err(|e| CleanupError::Enrichment(format!("分析结果格式不符: {}", e)))?;

    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(CleanupError::Enrichment(format!(
            "置信度超出范围: {}",
            verdict.confidence
        )));
    }

    Ok(verdict)
}

/// 收紧后的判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tightened {
    pub risk_level: RiskLevel,
    pub can_delete: bool,
    pub reason: Option<String>,
}

/// 把外部判定合并到规则判定上，只收紧不放宽；无变化时返回 `None`
pub fn tighten(
    item: &CleanupItem,
    verdict: &EnrichmentVerdict,
    config: &EnrichmentConfig,
) -> Option<Tightened> {
    if verdict.confidence < config.min_confidence {
        tracing::debug!(
            "忽略低置信度分析结果 {} ({:.2})",
            item.path,
            verdict.confidence
        );
        return None;
    }

    let risk_level = item.risk_level.max(verdict.risk_level);
    let can_delete = item.can_delete && verdict.can_delete && risk_level != RiskLevel::High;

    if risk_level == item.risk_level && can_delete == item.can_delete {
        return None;
    }

    Some(Tightened {
        risk_level,
        can_delete,
        reason: verdict.reason.clone(),
    })
}

/// 调用外部命令进行分析
pub struct CommandEnricher {
    program: String,
    args: Vec<String>,
}

impl CommandEnricher {
    /// 按空白拆分命令行
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(|s| s.to_string());
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Enricher for CommandEnricher {
    fn analyze(&self, item: &CleanupItem) -> Result<String, CleanupError> {
        let input = serde_json::to_vec(item).map_err(|e| CleanupError::Serde(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CleanupError::Enrichment(format!("无法启动分析命令: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .map_err(|e| CleanupError::Enrichment(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| CleanupError::Enrichment(e.to_string()))?;
        if !output.status.success() {
            return Err(CleanupError::Enrichment(format!(
                "分析命令退出码: {:?}",
                output.status.code()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
