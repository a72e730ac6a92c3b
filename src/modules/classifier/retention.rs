use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::scanner::models::ChatApp;

/// 单个聊天软件的保留策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// 保留最近几个月的内容，0 表示不保留
    pub months_to_keep: u32,
}

impl RetentionPolicy {
    pub fn keep_months(months_to_keep: u32) -> Self {
        Self { months_to_keep }
    }

    /// 截止时间，`months_to_keep == 0` 时没有截止时间
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.months_to_keep == 0 {
            return None;
        }
        Some(
            now.checked_sub_months(Months::new(self.months_to_keep))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// 最后修改时间晚于截止时间的内容被保留，缺少时间的内容不保留
    pub fn is_retained(&self, last_modified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self.cutoff(now), last_modified) {
            (Some(cutoff), Some(modified)) => modified > cutoff,
            _ => false,
        }
    }
}

/// 各聊天软件的保留策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub wechat: RetentionPolicy,
    pub qq: RetentionPolicy,
}

impl RetentionSettings {
    pub fn for_app(&self, app: ChatApp) -> RetentionPolicy {
        match app {
            ChatApp::WeChat => self.wechat,
            ChatApp::Qq => self.qq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn zero_months_keeps_nothing() {
        let now = Utc::now();
        let policy = RetentionPolicy::keep_months(0);
        assert_eq!(policy.cutoff(now), None);
        assert!(!policy.is_retained(Some(now), now));
    }

    #[test]
    fn cutoff_shifts_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let cutoff = RetentionPolicy::keep_months(3).cutoff(now).unwrap();
        // 2 月没有 31 日，取月末
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }

    #[test]
    fn retains_only_newer_than_cutoff() {
        let now = Utc::now();
        let policy = RetentionPolicy::keep_months(3);
        assert!(policy.is_retained(Some(now - Duration::days(30)), now));
        assert!(!policy.is_retained(Some(now - Duration::days(180)), now));
        assert!(!policy.is_retained(None, now));
    }
}
