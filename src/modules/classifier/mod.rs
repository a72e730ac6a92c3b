//! 清理项分类
//!
//! 把扫描器产出的 [`RawCandidate`] 转成 [`CleanupItem`]：
//! 类别映射、规则表判定风险、聊天内容的保留策略，最后是可选的外部分析。
//! 分类从不返回错误，字段异常时给出最保守的判定。

pub mod enrichment;
pub mod models;
pub mod retention;
pub mod rules;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::modules::common::utils;
use crate::modules::scanner::models::{CandidateKind, RawCandidate};
use enrichment::{CommandEnricher, Enricher, EnrichmentConfig};
use models::{CleanupItem, ItemCategory, RiskLevel};
use retention::RetentionSettings;

/// 分类器，持有显式传入的外部分析配置
#[derive(Clone, Default)]
pub struct Classifier {
    enrichment: EnrichmentConfig,
    enricher: Option<Arc<dyn Enricher>>,
}

impl Classifier {
    pub fn new(enrichment: EnrichmentConfig) -> Self {
        let enricher = if enrichment.enabled {
            enrichment
                .command
                .as_deref()
                .and_then(CommandEnricher::from_command_line)
                .map(|e| Arc::new(e) as Arc<dyn Enricher>)
        } else {
            None
        };

        Self {
            enrichment,
            enricher,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn classify(
        &self,
        candidate: &RawCandidate,
        retention: &RetentionSettings,
        now: DateTime<Utc>,
    ) -> CleanupItem {
        let mut item = classify(candidate, retention, now);
        if !item.retained {
            self.enrich(&mut item);
        }
        item
    }

    fn enrich(&self, item: &mut CleanupItem) {
        if !self.enrichment.enabled {
            return;
        }
        let Some(enricher) = &self.enricher else {
            return;
        };

        let verdict = match enricher.analyze(item).and_then(|raw| enrichment::decode_verdict(&raw)) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::debug!("外部分析失败，保持规则判定 {}: {}", item.path, e);
                return;
            }
        };

        if let Some(tightened) = enrichment::tighten(item, &verdict, &self.enrichment) {
            tracing::info!(
                "外部分析收紧判定 {}: {} -> {}",
                item.path,
                item.risk_level,
                tightened.risk_level
            );
            item.risk_level = tightened.risk_level;
            item.can_delete = tightened.can_delete;
            let reason = tightened.reason.unwrap_or_else(|| "外部分析".to_string());
            item.suggestion = suggestion(item.risk_level, item.can_delete, &reason);
        }
    }
}

/// 不依赖任何后端的纯分类
pub fn classify(
    candidate: &RawCandidate,
    retention: &RetentionSettings,
    now: DateTime<Utc>,
) -> CleanupItem {
    let category = ItemCategory::from_kind(&candidate.kind);
    let name = if candidate.name.trim().is_empty() {
        utils::display_name(&candidate.path)
    } else {
        candidate.name.clone()
    };
    let id_source = if candidate.path.trim().is_empty() {
        name.as_str()
    } else {
        candidate.path.as_str()
    };

    let mut item = CleanupItem {
        id: utils::stable_id(id_source, &candidate.kind.tag()),
        name,
        path: candidate.path.clone(),
        size_bytes: candidate.size,
        category,
        risk_level: RiskLevel::Caution,
        can_delete: false,
        suggestion: String::new(),
        last_modified: candidate.last_modified,
        kind: candidate.kind.clone(),
        retained: false,
    };

    let verdict = rules::evaluate(&candidate.path, category);

    if is_malformed(candidate) && verdict.risk != RiskLevel::High {
        item.risk_level = RiskLevel::Caution;
        item.can_delete = category.is_known_safe();
        item.suggestion = suggestion(item.risk_level, item.can_delete, "信息不完整");
        return item;
    }

    item.risk_level = verdict.risk;
    item.can_delete = verdict.risk != RiskLevel::High;
    item.suggestion = suggestion(item.risk_level, item.can_delete, verdict.reason);

    apply_retention(&mut item, retention, now);
    item
}

fn is_malformed(candidate: &RawCandidate) -> bool {
    candidate.path.trim().is_empty()
        || candidate.name.trim().is_empty()
        || matches!(candidate.kind, CandidateKind::Other { .. })
}

/// 保留策略只会把可删除项变为受保护项，保留项的风险等级统一为安全
fn apply_retention(item: &mut CleanupItem, retention: &RetentionSettings, now: DateTime<Utc>) {
    let CandidateKind::Chat { app, content } = item.kind else {
        return;
    };
    if content.is_transient() {
        return;
    }

    let policy = retention.for_app(app);
    if policy.is_retained(item.last_modified, now) {
        item.retained = true;
        item.can_delete = false;
        item.risk_level = RiskLevel::Safe;
        item.suggestion = format!(
            "{}最近 {} 个月内的{}，按保留策略保留",
            app.label(),
            policy.months_to_keep,
            content.label()
        );
    }
}

fn suggestion(risk: RiskLevel, can_delete: bool, reason: &str) -> String {
    match (risk, can_delete) {
        (RiskLevel::High, _) => format!("系统关键项，禁止删除（{}）", reason),
        (RiskLevel::Caution, true) => format!("建议确认后再删除（{}）", reason),
        (RiskLevel::Safe, true) => format!("可以安全删除（{}）", reason),
        (_, false) => format!("无法确认安全，已禁止删除（{}）", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::enrichment::EnrichmentConfig;
    use super::retention::RetentionPolicy;
    use super::*;
    use crate::modules::common::error::CleanupError;
    use crate::modules::scanner::models::{ChatApp, ChatContent, ScanCategory};
    use crate::modules::scanner::{category_fixtures, fixture};

    fn keep(months: u32) -> RetentionSettings {
        RetentionSettings {
            wechat: RetentionPolicy::keep_months(months),
            qq: RetentionPolicy::keep_months(months),
        }
    }

    fn wechat_image(age_days: i64, now: DateTime<Utc>) -> RawCandidate {
        fixture(
            "2024-06",
            r"C:\Users\a\Documents\WeChat Files\wxid\FileStorage\Image\2024-06",
            1000,
            age_days,
            CandidateKind::Chat {
                app: ChatApp::WeChat,
                content: ChatContent::Image,
            },
            now,
        )
    }

    #[test]
    fn high_risk_is_never_deletable() {
        let now = Utc::now();
        let mut candidates: Vec<RawCandidate> = ScanCategory::ALL
            .iter()
            .flat_map(|c| category_fixtures(*c, now))
            .collect();
        candidates.push(RawCandidate::new("System32", r"C:\Windows\System32", CandidateKind::SystemTemp));
        candidates.push(RawCandidate::new("Run", r"HKLM\SYSTEM\Setup", CandidateKind::Other { tag: "x".into() }));

        for candidate in &candidates {
            let item = classify(candidate, &keep(3), now);
            if item.risk_level == RiskLevel::High {
                assert!(!item.can_delete, "{}", item.path);
            }
        }
        let system32 = classify(&candidates[candidates.len() - 2], &keep(0), now);
        assert_eq!(system32.risk_level, RiskLevel::High);
    }

    #[test]
    fn retention_protects_recent_chat_media() {
        let now = Utc::now();

        let recent = classify(&wechat_image(30, now), &keep(3), now);
        assert!(recent.retained);
        assert!(!recent.can_delete);
        assert_eq!(recent.risk_level, RiskLevel::Safe);
        assert!(recent.suggestion.contains("保留"));

        let old = classify(&wechat_image(180, now), &keep(3), now);
        assert!(!old.retained);
        assert!(old.can_delete);
        assert_eq!(old.risk_level, RiskLevel::Caution);
    }

    #[test]
    fn zero_months_and_transient_content_are_always_eligible() {
        let now = Utc::now();
        assert!(classify(&wechat_image(1, now), &keep(0), now).can_delete);

        let cache = fixture(
            "2024-06",
            r"C:\Users\a\Documents\WeChat Files\wxid\FileStorage\Cache\2024-06",
            10,
            1,
            CandidateKind::Chat {
                app: ChatApp::WeChat,
                content: ChatContent::Cache,
            },
            now,
        );
        let item = classify(&cache, &keep(12), now);
        assert!(!item.retained);
        assert!(item.can_delete);
        assert_eq!(item.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn retention_is_per_app() {
        let now = Utc::now();
        let settings = RetentionSettings {
            wechat: RetentionPolicy::keep_months(0),
            qq: RetentionPolicy::keep_months(6),
        };
        assert!(classify(&wechat_image(10, now), &settings, now).can_delete);

        let qq_file = fixture(
            "2024-06",
            r"C:\Users\a\Documents\Tencent Files\10001\FileRecv\2024-06",
            10,
            10,
            CandidateKind::Chat {
                app: ChatApp::Qq,
                content: ChatContent::File,
            },
            now,
        );
        assert!(classify(&qq_file, &settings, now).retained);
    }

    #[test]
    fn malformed_candidates_get_conservative_verdict() {
        let now = Utc::now();

        let no_path = RawCandidate::new("temp", "", CandidateKind::SystemTemp);
        let item = classify(&no_path, &keep(0), now);
        assert_eq!(item.risk_level, RiskLevel::Caution);
        assert!(item.can_delete);

        let unknown = RawCandidate::new("x", r"D:\data\x", CandidateKind::Other { tag: "?".into() });
        let item = classify(&unknown, &keep(0), now);
        assert_eq!(item.category, ItemCategory::Unknown);
        assert_eq!(item.risk_level, RiskLevel::Caution);
        assert!(!item.can_delete);

        let no_name = RawCandidate::new("", r"C:\Temp\a.tmp", CandidateKind::UserTemp);
        assert_eq!(classify(&no_name, &keep(0), now).name, "a.tmp");
    }

    #[test]
    fn ids_are_stable_for_the_same_candidate() {
        let now = Utc::now();
        let a = classify(&wechat_image(5, now), &keep(0), now);
        let b = classify(&wechat_image(5, now), &keep(0), now);
        assert_eq!(a.id, b.id);
    }

    struct FixedEnricher(Result<&'static str, &'static str>);

    impl Enricher for FixedEnricher {
        fn analyze(&self, _item: &CleanupItem) -> Result<String, CleanupError> {
            self.0
                .map(|s| s.to_string())
                .map_err(|e| CleanupError::Enrichment(e.to_string()))
        }
    }

    fn enriched(response: Result<&'static str, &'static str>) -> Classifier {
        Classifier::new(EnrichmentConfig {
            enabled: true,
            ..EnrichmentConfig::default()
        })
        .with_enricher(Arc::new(FixedEnricher(response)))
    }

    fn temp_candidate() -> RawCandidate {
        RawCandidate::new("Temp", r"C:\Windows\Temp", CandidateKind::SystemTemp).with_size(5)
    }

    #[test]
    fn confident_enrichment_tightens() {
        let classifier =
            enriched(Ok(r#"{"risk_level":"high","can_delete":true,"confidence":0.95,"reason":"正在使用"}"#));
        let item = classifier.classify(&temp_candidate(), &keep(0), Utc::now());
        assert_eq!(item.risk_level, RiskLevel::High);
        assert!(!item.can_delete);
        assert!(item.suggestion.contains("正在使用"));
    }

    #[test]
    fn enrichment_never_relaxes_and_ignores_low_confidence() {
        let relaxing = enriched(Ok(r#"{"risk_level":"safe","can_delete":true,"confidence":0.99}"#));
        let system32 = RawCandidate::new("System32", r"C:\Windows\System32", CandidateKind::SystemTemp);
        let item = relaxing.classify(&system32, &keep(0), Utc::now());
        assert_eq!(item.risk_level, RiskLevel::High);
        assert!(!item.can_delete);

        let unsure = enriched(Ok(r#"{"risk_level":"high","can_delete":false,"confidence":0.3}"#));
        let item = unsure.classify(&temp_candidate(), &keep(0), Utc::now());
        assert_eq!(item.risk_level, RiskLevel::Safe);
        assert!(item.can_delete);
    }

    #[test]
    fn enrichment_failure_matches_plain_classification() {
        let now = Utc::now();
        let plain = classify(&temp_candidate(), &keep(0), now);

        for response in [Err("超时"), Ok("{\"risk_level\":\"high\"}"), Ok("garbage")] {
            let item = enriched(response).classify(&temp_candidate(), &keep(0), now);
            assert_eq!(item, plain);
        }
    }

    #[test]
    fn disabled_enrichment_is_not_called() {
        let classifier = Classifier::new(EnrichmentConfig::default())
            .with_enricher(Arc::new(FixedEnricher(Ok(
                r#"{"risk_level":"high","can_delete":false,"confidence":1.0}"#,
            ))));
        let item = classifier.classify(&temp_candidate(), &keep(0), Utc::now());
        assert_eq!(item.risk_level, RiskLevel::Safe);
    }
}
