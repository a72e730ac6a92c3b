//! 扫描编排
//!
//! 按固定顺序依次运行各类别扫描器，把每个类别的局部进度换算到总体进度，
//! 每分类一项就把完整结果列表推送给调用方。单个类别失败只记录并继续。
//!
//! 后端探测不可用、配置要求模拟，或者在产出任何真实结果之前后端报告不可用时，
//! 整次扫描改由模拟器完成，真实结果和模拟结果不会混在同一次扫描中。

pub mod models;
pub mod progress;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::modules::backend::SystemBackend;
use crate::modules::classifier::models::CleanupItem;
use crate::modules::classifier::Classifier;
use crate::modules::common::cancel::CancelFlag;
use crate::modules::common::error::CleanupError;
use crate::modules::scanner;
use crate::modules::scanner::models::{RawCandidate, ScanCategory};
use crate::modules::simulator::{self, SimulatorConfig};
use models::{CategoryFailure, ScanEvent, ScanOutcome, ScanRequest, ScanStage};
use progress::ProgressSink;

/// 事件通道容量
const EVENT_BUFFER: usize = 64;

/// 扫描数据来源
#[derive(Clone, Copy)]
enum Source<'a> {
    Real(&'a dyn SystemBackend),
    Simulated,
}

/// 类别循环的结束方式
enum LoopEnd {
    Finished,
    Cancelled,
    /// 尚未产出任何结果时后端不可用
    Unavailable(CleanupError),
}

#[derive(Default)]
struct Accumulator {
    items: Vec<CleanupItem>,
    seen: HashSet<String>,
    failures: Vec<CategoryFailure>,
}

pub struct ScanOrchestrator {
    backend: Option<Arc<dyn SystemBackend>>,
    classifier: Classifier,
    simulator: SimulatorConfig,
    cancel: CancelFlag,
}

impl ScanOrchestrator {
    /// `backend` 为 `None` 时总是使用模拟器
    pub fn new(backend: Option<Arc<dyn SystemBackend>>, classifier: Classifier) -> Self {
        Self {
            backend,
            classifier,
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

    /// 在后台任务中运行扫描，返回事件流和最终结果
    pub fn start(
        self,
        request: ScanRequest,
    ) -> (mpsc::Receiver<ScanEvent>, JoinHandle<ScanOutcome>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(async move { self.run_scan(&request, Some(tx)).await });
        (rx, handle)
    }

    /// 运行一次扫描，从不返回错误
    pub async fn run_scan(
        &self,
        request: &ScanRequest,
        tx: Option<mpsc::Sender<ScanEvent>>,
    ) -> ScanOutcome {
        let categories = ScanCategory::ordered(&request.categories);
        let mut sink = ProgressSink::new(tx.clone());
        let mut acc = Accumulator::default();

        tracing::info!("开始扫描，共 {} 个类别", categories.len());
        sink.set_stage(ScanStage::Preparing, "准备扫描").await;

        let backend = match &self.backend {
            Some(backend) if backend.is_available() => Some(Arc::clone(backend)),
            Some(backend) => {
                tracing::warn!("后端 {} 不可用，使用模拟扫描", backend.name());
                None
            }
            None => None,
        };

        let mut simulated = backend.is_none();
        let end = match &backend {
            Some(backend) => {
                sink.set_stage(ScanStage::Scanning, "开始扫描").await;
                let source = Source::Real(backend.as_ref());
                let end = self
                    .run_categories(source, &categories, request, &mut sink, &tx, &mut acc)
                    .await;
                match end {
                    LoopEnd::Unavailable(e) => {
                        tracing::warn!("后端不可用，切换到模拟扫描: {}", e);
                        simulated = true;
                        acc = Accumulator::default();
                        self.run_simulated(&categories, request, &mut sink, &tx, &mut acc)
                            .await
                    }
                    other => other,
                }
            }
            None => {
                self.run_simulated(&categories, request, &mut sink, &tx, &mut acc)
                    .await
            }
        };

        let stage = match end {
            LoopEnd::Cancelled => {
                tracing::info!("扫描已取消，保留 {} 项结果", acc.items.len());
                sink.set_stage(ScanStage::Cancelled, "扫描已取消").await;
                ScanStage::Cancelled
            }
            _ if !categories.is_empty() && acc.failures.len() == categories.len() => {
                tracing::warn!("所有类别扫描失败");
                sink.set_stage(ScanStage::Error, "所有类别扫描失败").await;
                ScanStage::Error
            }
            _ => {
                sink.set_stage(ScanStage::Analyzing, "汇总结果").await;
                sink.complete("扫描完成").await;
                tracing::info!(
                    "扫描完成: {} 项，{} 个类别失败",
                    acc.items.len(),
                    acc.failures.len()
                );
                ScanStage::Completed
            }
        };

        ScanOutcome {
            stage,
            items: acc.items,
            failures: acc.failures,
            simulated,
        }
    }

    async fn run_simulated(
        &self,
        categories: &[ScanCategory],
        request: &ScanRequest,
        sink: &mut ProgressSink,
        tx: &Option<mpsc::Sender<ScanEvent>>,
        acc: &mut Accumulator,
    ) -> LoopEnd {
        sink.set_stage(ScanStage::Fallback, "使用模拟数据").await;
        self.run_categories(Source::Simulated, categories, request, sink, tx, acc)
            .await
    }

    async fn run_categories(
        &self,
        source: Source<'_>,
        categories: &[ScanCategory],
        request: &ScanRequest,
        sink: &mut ProgressSink,
        tx: &Option<mpsc::Sender<ScanEvent>>,
        acc: &mut Accumulator,
    ) -> LoopEnd {
        let count = categories.len();

        for (index, category) in categories.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return LoopEnd::Cancelled;
            }

            sink.enter_window(index, count);
            sink.report(0, category.label()).await;

            let result = match source {
                Source::Real(backend) => scanner::scan_category(*category, backend, sink).await,
                Source::Simulated => Ok(simulator::simulate_scan(
                    *category,
                    sink,
                    request.now,
                    &self.simulator,
                )
                .await),
            };

            match result {
                Ok(candidates) => {
                    tracing::debug!("{} 扫描到 {} 项", category, candidates.len());
                    self.append(candidates, request, tx, acc).await;
                }
                Err(e) if e.is_backend_unavailable() && acc.items.is_empty() => {
                    return LoopEnd::Unavailable(e);
                }
                Err(e) => {
                    tracing::warn!("类别 {} 扫描失败: {}", category, e);
                    acc.failures.push(CategoryFailure {
                        category: *category,
                        error: e.to_string(),
                    });
                }
            }

            // 失败的类别同样占满自己的进度区间
            sink.report(100, category.label()).await;
        }

        LoopEnd::Finished
    }

    /// 逐项分类追加，每追加一项推送一次完整列表
    async fn append(
        &self,
        candidates: Vec<RawCandidate>,
        request: &ScanRequest,
        tx: &Option<mpsc::Sender<ScanEvent>>,
        acc: &mut Accumulator,
    ) {
        for candidate in &candidates {
            let item = self
                .classifier
                .classify(candidate, &request.retention, request.now);
            if !acc.seen.insert(item.id.clone()) {
                continue;
            }
            acc.items.push(item);

            if let Some(tx) = tx {
                let _ = tx.send(ScanEvent::ResultsGrew(acc.items.clone())).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::backend::testing::MemoryBackend;
    use crate::modules::classifier::retention::RetentionSettings;
    use crate::modules::common::utils;
    use chrono::Utc;

    fn orchestrator(backend: Option<Arc<dyn SystemBackend>>) -> ScanOrchestrator {
        ScanOrchestrator::new(backend, Classifier::default())
            .with_simulator(SimulatorConfig::instant())
    }

    fn request(categories: &[ScanCategory]) -> ScanRequest {
        ScanRequest::new(categories.to_vec(), RetentionSettings::default())
    }

    async fn collect(
        orchestrator: ScanOrchestrator,
        request: ScanRequest,
    ) -> (Vec<ScanEvent>, ScanOutcome) {
        let (mut rx, handle) = orchestrator.start(request);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, handle.await.unwrap())
    }

    fn progress_units(events: &[ScanEvent]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress(p) => Some(p.current_units),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn three_categories_stream_six_items_and_finish_at_100() {
        let categories = [ScanCategory::Logs, ScanCategory::Memory, ScanCategory::Network];
        let (events, outcome) = collect(orchestrator(None), request(&categories)).await;

        assert_eq!(outcome.stage, ScanStage::Completed);
        assert_eq!(outcome.items.len(), 6);
        assert!(outcome.simulated);

        let growth: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::ResultsGrew(items) => Some(items.len()),
                _ => None,
            })
            .collect();
        assert_eq!(growth, vec![1, 2, 3, 4, 5, 6]);

        let units = progress_units(&events);
        assert!(units.windows(2).all(|w| w[0] <= w[1]), "{:?}", units);
        assert_eq!(units.last(), Some(&100));

        match events.last() {
            Some(ScanEvent::Progress(p)) => {
                assert_eq!(p.stage, ScanStage::Completed);
                assert_eq!(p.current_units, p.total_units);
            }
            other => panic!("unexpected last event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unavailable_backend_matches_direct_simulation() {
        let now = Utc::now();
        let categories = ScanCategory::ALL;

        let backend: Arc<dyn SystemBackend> = Arc::new(MemoryBackend::unavailable_after_check());
        let fallback = orchestrator(Some(backend))
            .run_scan(&request(&categories).with_now(now), None)
            .await;
        let direct = orchestrator(None)
            .run_scan(&request(&categories).with_now(now), None)
            .await;

        assert!(fallback.simulated);
        assert_eq!(fallback.stage, direct.stage);
        assert_eq!(fallback.items, direct.items);
        assert!(fallback.failures.is_empty());
        assert_eq!(
            serde_json::to_string(&fallback).unwrap(),
            serde_json::to_string(&direct).unwrap()
        );
    }

    #[tokio::test]
    async fn availability_failure_goes_straight_to_simulation() {
        let backend = Arc::new(MemoryBackend::unavailable());
        let outcome = orchestrator(Some(backend.clone()))
            .run_scan(&request(&[ScanCategory::Logs]), None)
            .await;

        assert!(outcome.simulated);
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(backend.scan_calls(), 0);
    }

    #[tokio::test]
    async fn late_unavailability_is_a_category_failure() {
        let backend = Arc::new(MemoryBackend::new().without_memory_info());
        let outcome = orchestrator(Some(backend))
            .run_scan(&request(&[ScanCategory::Memory, ScanCategory::Network]), None)
            .await;

        // 内存类别先失败时还没有结果，整次扫描切换到模拟器
        assert!(outcome.simulated);

        let backend = Arc::new(MemoryBackend::new().without_memory_info());
        let outcome = orchestrator(Some(backend))
            .run_scan(&request(&[ScanCategory::Network, ScanCategory::Memory]), None)
            .await;

        assert!(!outcome.simulated);
        assert_eq!(outcome.stage, ScanStage::Completed);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].path, utils::DNS_CACHE_PATH);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].category, ScanCategory::Memory);
    }

    #[tokio::test]
    async fn every_category_failing_ends_in_error() {
        let backend = Arc::new(MemoryBackend::failing("磁盘控制器错误"));
        let (events, outcome) = collect(
            orchestrator(Some(backend)),
            request(&[ScanCategory::SystemCache, ScanCategory::Logs]),
        )
        .await;

        assert_eq!(outcome.stage, ScanStage::Error);
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(!outcome.simulated);

        let units = progress_units(&events);
        assert!(units.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn real_backend_results_are_classified_in_order() {
        let windows = utils::path_string(&utils::windows_dir());
        let backend = Arc::new(
            MemoryBackend::new().with_file(&format!(r"{}\Logs\CBS\CBS.log", windows), 10, None),
        );
        let outcome = orchestrator(Some(backend))
            .run_scan(&request(&[ScanCategory::Network, ScanCategory::Logs]), None)
            .await;

        assert_eq!(outcome.stage, ScanStage::Completed);
        assert!(!outcome.simulated);
        assert!(outcome.failures.is_empty());
        let names: Vec<_> = outcome.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["CBS", "DNS 解析缓存"]);
        assert!(outcome.items.iter().all(|i| i.can_delete));
    }

    #[tokio::test]
    async fn cancelled_scan_stops_before_next_category() {
        let backend = Arc::new(MemoryBackend::new());
        let orchestrator = orchestrator(Some(backend.clone()));
        orchestrator.cancel_flag().cancel();

        let outcome = orchestrator
            .run_scan(&request(&ScanCategory::ALL), None)
            .await;

        assert_eq!(outcome.stage, ScanStage::Cancelled);
        assert!(outcome.items.is_empty());
        assert_eq!(backend.scan_calls(), 0);
    }

    #[tokio::test]
    async fn empty_selection_completes_immediately() {
        let outcome = orchestrator(None).run_scan(&request(&[]), None).await;
        assert_eq!(outcome.stage, ScanStage::Completed);
        assert!(outcome.items.is_empty());
    }
}
