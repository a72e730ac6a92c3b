use tokio::sync::mpsc;

use super::models::{ScanEvent, ScanProgress, ScanStage};

pub const TOTAL_UNITS: u32 = 100;

/// 扫描进度汇报
///
/// 扫描器只汇报本类别内 0..=100 的局部进度，这里负责换算到总体窗口
/// `[100·i/N, 100·(i+1)/N]`，并保证总体进度单调不减。
#[derive(Debug)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<ScanEvent>>,
    stage: ScanStage,
    window_index: u32,
    window_count: u32,
    last_local: u8,
    last_units: u32,
    local_history: Vec<u8>,
}

impl ProgressSink {
    pub fn new(tx: Option<mpsc::Sender<ScanEvent>>) -> Self {
        Self {
            tx,
            stage: ScanStage::Preparing,
            window_index: 0,
            window_count: 1,
            last_local: 0,
            last_units: 0,
            local_history: Vec::new(),
        }
    }

    /// 不推送事件，仅记录局部进度（单独运行扫描器时使用）
    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn current_units(&self) -> u32 {
        self.last_units
    }

    pub fn local_percent(&self) -> u8 {
        self.last_local
    }

    pub fn local_history(&self) -> &[u8] {
        &self.local_history
    }

    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    /// 进入第 `index` 个类别（共 `count` 个）
    pub fn enter_window(&mut self, index: usize, count: usize) {
        self.window_count = count.max(1) as u32;
        self.window_index = (index as u32).min(self.window_count - 1);
        self.last_local = 0;
        self.local_history.clear();
    }

    /// 汇报局部进度
    pub async fn report(&mut self, percent: u8, label: impl Into<String>) {
        let percent = percent.min(100).max(self.last_local);
        self.last_local = percent;
        self.local_history.push(percent);

        let units = (u64::from(self.window_index) * 100 + u64::from(percent))
            * u64::from(TOTAL_UNITS)
            / (u64::from(self.window_count) * 100);
        self.last_units = self.last_units.max(units as u32);

        self.emit(label.into()).await;
    }

    /// 切换阶段，总体进度不变
    pub async fn set_stage(&mut self, stage: ScanStage, label: impl Into<String>) {
        self.stage = stage;
        self.emit(label.into()).await;
    }

    /// 标记整个扫描完成，进度恰好为 100
    pub async fn complete(&mut self, label: impl Into<String>) {
        self.last_units = TOTAL_UNITS;
        self.set_stage(ScanStage::Completed, label).await;
    }

    pub fn snapshot(&self, label: String) -> ScanProgress {
        ScanProgress {
            stage: self.stage,
            current_units: self.last_units,
            total_units: TOTAL_UNITS,
            current_label: label,
        }
    }

    async fn emit(&mut self, label: String) {
        if let Some(tx) = &self.tx {
            // 接收方已关闭时不影响扫描本身
            let _ = tx.send(ScanEvent::Progress(self.snapshot(label))).await;
        }
    }
}
