//! 路径风险规则表
//!
//! 规则按声明顺序逐条匹配，第一条命中的规则决定风险等级；
//! 全部未命中时为 `Caution`。路径先规范化为反斜杠形式再匹配，不区分大小写。

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{ItemCategory, RiskLevel};
use crate::modules::common::utils;

/// 一条风险规则
#[derive(Debug)]
pub struct RiskRule {
    pub pattern: Regex,
    pub risk: RiskLevel,
    /// 只对该类别生效，`None` 表示所有类别
    pub scope: Option<ItemCategory>,
    pub reason: &'static str,
}

/// 规则匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleVerdict {
    pub risk: RiskLevel,
    pub reason: &'static str,
}

const DEFAULT_REASON: &str = "无法确认用途";

/// (正则, 风险, 作用类别, 说明)
const RULE_SOURCES: &[(&str, RiskLevel, Option<ItemCategory>, &str)] = &[
    // 关键系统目录
    (
        r"^[a-z]:\\windows\\(system32|syswow64|winsxs|inf|boot|fonts|servicing|assembly|driverstore)(\\|$)",
        RiskLevel::High,
        None,
        "核心系统目录",
    ),
    (
        r"^[a-z]:\\(windows|program files|program files \(x86\)|programdata|users)?\\?$",
        RiskLevel::High,
        None,
        "系统根目录",
    ),
    (
        r"^(hklm|hkey_local_machine)\\(system|sam|security|boot)(\\|$)",
        RiskLevel::High,
        None,
        "系统核心注册表",
    ),
    (
        r"^(hklm|hkey_local_machine|hkcu|hkey_current_user)\\software\\(wow6432node\\)?microsoft\\windows\\currentversion\\run(once)?(\\|$)",
        RiskLevel::High,
        None,
        "开机启动项",
    ),
    (
        r"^(hklm|hkey_local_machine)\\software\\microsoft\\windows nt\\currentversion(\\|$)",
        RiskLevel::High,
        None,
        "系统核心注册表",
    ),
    // 归属无法完全确认的残留，即使路径像缓存也保持谨慎
    (r".*", RiskLevel::Caution, Some(ItemCategory::SoftwareRemnant), "可能仍被其他程序使用"),
    (r".*", RiskLevel::Caution, Some(ItemCategory::RegistryRemnant), "指向的程序已不存在"),
    (r"\\hiberfil\.sys$", RiskLevel::Caution, None, "删除前需关闭休眠功能"),
    // 可重建的缓存、日志和临时文件
    (r"^pseudo:dns-cache$", RiskLevel::Safe, None, "DNS 缓存会自动重建"),
    (r"\\(temp|tmp)(\\|$)", RiskLevel::Safe, None, "临时文件"),
    (
        r"\\(cache|cache2|code cache|gpucache|inetcache|d3dscache|dxcache)(\\|$)",
        RiskLevel::Safe,
        None,
        "缓存会自动重建",
    ),
    (r"\\(logs?|debug|panther)(\\|$)", RiskLevel::Safe, None, "日志文件"),
    (r"\\wer\\report(archive|queue)(\\|$)", RiskLevel::Safe, None, "错误报告"),
    (r"\\(minidump|crashdumps|livekernelreports)(\\|$)", RiskLevel::Safe, None, "崩溃转储"),
    (r"\\prefetch(\\|$)", RiskLevel::Safe, None, "预读取数据会自动重建"),
    (
        r"\\softwaredistribution\\(download|datastore\\logs)(\\|$)",
        RiskLevel::Safe,
        None,
        "已安装更新的下载缓存",
    ),
    (r"\\deliveryoptimization\\cache(\\|$)", RiskLevel::Safe, None, "传递优化缓存"),
    (r"\\thumbcache_[^\\]*\.db$", RiskLevel::Safe, None, "缩略图缓存"),
    (r"\.(tmp|log|etl|dmp)$", RiskLevel::Safe, None, "临时或日志文件"),
];

lazy_static! {
    static ref DEFAULT_RULES: Vec<RiskRule> = RULE_SOURCES
        .iter()
        .filter_map(|(source, risk, scope, reason)| {
            match Regex::new(&format!("(?i){}", source)) {
                Ok(pattern) => Some(RiskRule {
                    pattern,
                    risk: *risk,
                    scope: *scope,
                    reason: *reason,
                }),
                Err(e) => {
                    tracing::error!("风险规则无效 {}: {}", source, e);
                    None
                }
            }
        })
        .collect();
}

/// 内置规则表
pub fn default_rules() -> &'static [RiskRule] {
    &DEFAULT_RULES
}

/// 按规则表判定路径风险
pub fn evaluate(path: &str, category: ItemCategory) -> RuleVerdict {
    evaluate_with(default_rules(), path, category)
}

pub fn evaluate_with(rules: &[RiskRule], path: &str, category: ItemCategory) -> RuleVerdict {
    let normalized = utils::normalize_path(path);

    rules
        .iter()
        .filter(|rule| rule.scope.map(|scope| scope == category).unwrap_or(true))
        .find(|rule| rule.pattern.is_match(&normalized))
        .map(|rule| RuleVerdict {
            risk: rule.risk,
            reason: rule.reason,
        })
        .unwrap_or(RuleVerdict {
            risk: RiskLevel::Caution,
            reason: DEFAULT_REASON,
        })
}
