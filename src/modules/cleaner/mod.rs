//! 分批清理
//!
//! 先做与分类无关的安全预检，不通过的项直接跳过；其余按固定大小分批交给后端。
//! 一批整体失败只影响该批，后续批次照常执行。取消只在批次之间检查。

pub mod models;
pub mod safety;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::modules::backend::{delete_batch, DeleteReport, SystemBackend};
use crate::modules::classifier::models::CleanupItem;
use crate::modules::common::cancel::CancelFlag;
use crate::modules::common::error::CleanupError;
use crate::modules::common::utils;
use crate::modules::simulator::{SimulatedBackend, SimulatorConfig};
use models::{CleanEvent, CleanOptions, CleaningProgress, CleaningResult, FailedItem};

const EVENT_BUFFER: usize = 64;

pub struct CleanExecutor {
    backend: Option<Arc<dyn SystemBackend>>,
    options: CleanOptions,
    simulator: SimulatorConfig,
    cancel: CancelFlag,
}

/// 一次清理运行中的累计状态
struct Run {
    result: CleaningResult,
    progress: CleaningProgress,
    batch_durations: Vec<Duration>,
}

impl CleanExecutor {
    /// `backend` 为 `None` 时使用模拟后端
    pub fn new(backend: Option<Arc<dyn SystemBackend>>, options: CleanOptions) -> Self {
        Self {
            backend,
            options: CleanOptions::new(options.batch_size, options.inter_batch_delay),
            simulator: SimulatorConfig::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_simulator(mut self, config: SimulatorConfig) -> Self {
        self.simulator = config;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// 在后台任务中执行清理，返回事件流和最终结果
    pub fn start(
        self,
        items: Vec<CleanupItem>,
    ) -> (mpsc::Receiver<CleanEvent>, JoinHandle<CleaningResult>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(async move { self.clean(&items, Some(tx)).await });
        (rx, handle)
    }

    /// 清理选中的项，从不返回错误
    pub async fn clean(
        &self,
        items: &[CleanupItem],
        tx: Option<mpsc::Sender<CleanEvent>>,
    ) -> CleaningResult {
        let mut run = Run {
            result: CleaningResult::default(),
            progress: CleaningProgress::default(),
            batch_durations: Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut eligible = Vec::new();
        for item in items {
            if !seen.insert(item.id.as_str()) {
                continue;
            }
            match safety::pre_delete_check(item) {
                Ok(()) => eligible.push(item),
                Err(e) => {
                    tracing::info!("跳过 {}: {}", item.name, e);
                    run.result.skipped_item_ids.push(item.id.clone());
                }
            }
        }

        let (mut backend, mut simulated) = self.select_backend();
        run.result.simulated = simulated;
        run.progress.items_total = eligible.len();
        run.progress.total_bytes = eligible.iter().map(|i| i.size_bytes).sum();

        tracing::info!(
            "开始清理: {} 项待删除，{} 项跳过，每批 {} 项",
            eligible.len(),
            run.result.skipped_item_ids.len(),
            self.options.batch_size
        );
        emit(&tx, CleanEvent::Progress(run.progress.clone())).await;

        let batches: Vec<&[&CleanupItem]> = eligible.chunks(self.options.batch_size).collect();
        for (index, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("清理已取消");
                run.result.cancelled = true;
                for pending in batches[index..].iter().flat_map(|b| b.iter()) {
                    run.result.skipped_item_ids.push(pending.id.clone());
                }
                break;
            }

            let first = batch[0];
            run.progress.current_item_name = first.name.clone();
            emit(
                &tx,
                CleanEvent::CurrentItem {
                    id: first.id.clone(),
                    name: first.name.clone(),
                },
            )
            .await;

            let started = Instant::now();
            let mut outcome = run_batch(Arc::clone(&backend), batch).await;

            // delete_batch 只在本批没有任何真实操作成功时返回不可用，第一批改为模拟不会混入真实删除
            if let Err(e) = &outcome {
                if e.is_backend_unavailable() && !simulated && index == 0 {
                    tracing::warn!("删除后端不可用，切换到模拟清理: {}", e);
                    backend = Arc::new(SimulatedBackend::new(self.simulator));
                    simulated = true;
                    run.result.simulated = true;
                    outcome = run_batch(Arc::clone(&backend), batch).await;
                }
            }

            match outcome {
                Ok(report) => record_report(&mut run, batch, report),
                Err(e) => {
                    tracing::warn!("第 {} 批删除失败: {}", index + 1, e);
                    for item in batch.iter() {
                        run.result.failed_items.push(FailedItem {
                            id: item.id.clone(),
                            error_reason: e.to_string(),
                        });
                    }
                }
            }

            run.batch_durations.push(started.elapsed());
            run.progress.items_done += batch.len();
            run.progress.estimated_seconds_left =
                Some(estimate_seconds_left(
                    &run.batch_durations,
                    run.progress.items_total - run.progress.items_done,
                ));
            emit(&tx, CleanEvent::Progress(run.progress.clone())).await;

            if index + 1 < batches.len() && !self.options.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.options.inter_batch_delay).await;
            }
        }

        tracing::info!(
            "清理结束: 删除 {} 项，失败 {} 项，跳过 {} 项，释放 {}",
            run.result.deleted_item_ids.len(),
            run.result.failed_items.len(),
            run.result.skipped_item_ids.len(),
            utils::format_size(run.result.bytes_freed)
        );
        run.result
    }

    fn select_backend(&self) -> (Arc<dyn SystemBackend>, bool) {
        match &self.backend {
            Some(backend) if backend.is_available() => (Arc::clone(backend), false),
            Some(backend) => {
                tracing::warn!("后端 {} 不可用，使用模拟清理", backend.name());
                (Arc::new(SimulatedBackend::new(self.simulator)), true)
            }
            None => (Arc::new(SimulatedBackend::new(self.simulator)), true),
        }
    }
}

/// 在阻塞线程中执行一批删除
async fn run_batch(
    backend: Arc<dyn SystemBackend>,
    batch: &[&CleanupItem],
) -> Result<DeleteReport, CleanupError> {
    let paths: Vec<String> = batch.iter().map(|item| item.path.clone()).collect();
    tokio::task::spawn_blocking(move || delete_batch(backend.as_ref(), &paths))
        .await
        .map_err(|e| CleanupError::Other(format!("删除任务异常结束: {}", e)))?
}

/// 把后端返回的逐项结果对应回清理项
fn record_report(run: &mut Run, batch: &[&CleanupItem], report: DeleteReport) {
    let key = |path: &str| utils::normalize_path(path).to_lowercase();
    let deleted: HashSet<String> = report.deleted_files.iter().map(|p| key(p)).collect();
    let failed: HashMap<String, String> = report
        .failed_files
        .into_iter()
        .map(|f| (key(&f.path), f.error))
        .collect();

    for item in batch {
        let path = key(&item.path);
        if let Some(reason) = failed.get(&path) {
            tracing::warn!("删除失败 {}: {}", item.path, reason);
            run.result.failed_items.push(FailedItem {
                id: item.id.clone(),
                error_reason: reason.clone(),
            });
        } else if deleted.contains(&path) {
            run.result.deleted_item_ids.push(item.id.clone());
            run.result.bytes_freed += item.size_bytes;
            run.progress.bytes_done += item.size_bytes;
        } else {
            run.result.failed_items.push(FailedItem {
                id: item.id.clone(),
                error_reason: "后端未返回该项的删除结果".to_string(),
            });
        }
    }
}

/// 剩余项数乘以已完成批次的平均耗时
fn estimate_seconds_left(durations: &[Duration], remaining_items: usize) -> u64 {
    if durations.is_empty() || remaining_items == 0 {
        return 0;
    }
    let average = durations.iter().sum::<Duration>() / durations.len() as u32;
    (average * remaining_items as u32).as_secs_f64().ceil() as u64
}

async fn emit(tx: &Option<mpsc::Sender<CleanEvent>>, event: CleanEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}
