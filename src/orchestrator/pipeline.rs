//! 分析流水线编排器
//! 检索 → 解析 → 并发检测 → 聚合，全程受同一个截止时间约束
use std::any::Any;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{timeout_at, Instant};

use super::stage::{Stage, StageTracker};
use crate::config::{AnalysisConfig, AnalysisOptions};
use crate::detector::{CancelSignal, DetectionContext, DetectorRegistry, PartialSlot};
use crate::error::{DetectorFailure, SiteLensError, SlResult};
use crate::parser::{MarkupParser, ParsedDocument};
use crate::report::{AnalysisReport, DetectorOutcome, ReportAggregator, Section, SectionData};
use crate::retriever::{normalize_url, RetrievalResult, Retriever};

/// 已派发的检测任务
struct RunningDetector {
    section: Section,
    name: &'static str,
    cancel: CancelSignal,
    partial: PartialSlot,
    handle: JoinHandle<Result<SectionData, DetectorFailure>>,
}

/// 编排器：持有检索器、检测器注册表与不可变配置，可跨多次 analyze 复用
#[derive(Debug)]
pub struct Orchestrator {
    retriever: Retriever,
    registry: DetectorRegistry,
    config: Arc<AnalysisConfig>,
}

impl Orchestrator {
    /// 使用标准检测器集合构建
    pub fn new(config: AnalysisConfig) -> SlResult<Self> {
        Self::with_registry(config, DetectorRegistry::standard())
    }

    /// 使用自定义检测器注册表构建
    pub fn with_registry(config: AnalysisConfig, registry: DetectorRegistry) -> SlResult<Self> {
        let retriever = Retriever::new(config.retriever.clone())?;
        log::debug!(
            "Orchestrator ready | Detectors: {:?} | Relays: {} | Total timeout: {:?}",
            registry,
            config.retriever.relays.len(),
            config.total_timeout
        );
        Ok(Self {
            retriever,
            registry,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// 分析单个URL
    /// - URL非法：不进入检索阶段，直接返回 `InvalidUrl`
    /// - 检索链耗尽：返回 `Retrieval` 错误，不产出报告
    /// - 检测器失败 / 超时：只影响对应分区状态，报告照常产出
    pub async fn analyze(&self, url: &str, options: AnalysisOptions) -> SlResult<AnalysisReport> {
        let target = normalize_url(url)?;

        let mut tracker = StageTracker::new(options.progress.clone());
        let budget = options.timeout.unwrap_or(self.config.total_timeout);
        let deadline = tracker.started() + budget;
        log::info!("Analyzing {} | Budget: {:?}", target, budget);

        // ===================== 检索 =====================
        tracker.transition(Stage::Retrieving);
        let retrieval = match self.retriever.retrieve_until(&target, deadline).await {
            Ok(result) => Arc::new(result),
            Err(err) => {
                log::warn!("[Retrieve] All strategies failed for {}: {}", target, err);
                tracker.transition(Stage::Failed);
                return Err(SiteLensError::Retrieval(err));
            }
        };

        // ===================== 解析 =====================
        tracker.transition(Stage::Parsing);
        let document = match self.parse(&retrieval, &target, &options, deadline).await {
            Ok(document) => Arc::new(document),
            Err(err) => {
                log::error!("[Parse] {}", err);
                tracker.transition(Stage::Failed);
                return Err(err);
            }
        };

        // ===================== 检测 =====================
        tracker.transition(Stage::Detecting);
        let outcomes = self.detect(document, Arc::clone(&retrieval), &options, deadline).await;

        // ===================== 聚合 =====================
        tracker.transition(Stage::Aggregating);
        let report = ReportAggregator::aggregate(
            target.as_str(),
            &retrieval,
            outcomes,
            tracker.timeline(),
        );
        tracker.transition(Stage::Done);
        Ok(report)
    }

    async fn parse(
        &self,
        retrieval: &Arc<RetrievalResult>,
        target: &url::Url,
        options: &AnalysisOptions,
        deadline: Instant,
    ) -> SlResult<ParsedDocument> {
        let base = url::Url::parse(&retrieval.final_url).unwrap_or_else(|_| target.clone());
        let max_bytes = self.config.retriever.max_body_bytes;
        let source = Arc::clone(retrieval);

        let document = tokio::task::spawn_blocking(move || {
            MarkupParser::parse(&source.body, &base, max_bytes)
        })
        .await
        .map_err(|e| SiteLensError::Parse(e.to_string()))?;

        let stylesheet_opts = &self.config.stylesheets;
        if !options.is_enabled(Section::Design) || !stylesheet_opts.fetch_linked {
            return Ok(document);
        }
        let hrefs = document.stylesheet_hrefs();
        if hrefs.is_empty() {
            return Ok(document);
        }
        let sheets = self
            .retriever
            .fetch_stylesheets(&hrefs, stylesheet_opts, deadline)
            .await;
        log::debug!(
            "[Parse] Linked stylesheets fetched: {}/{}",
            sheets.len(),
            hrefs.len()
        );
        Ok(document.with_linked_styles(sheets))
    }

    async fn detect(
        &self,
        document: Arc<ParsedDocument>,
        retrieval: Arc<RetrievalResult>,
        options: &AnalysisOptions,
        deadline: Instant,
    ) -> Vec<DetectorOutcome> {
        let mut outcomes = Vec::with_capacity(Section::ALL.len());
        let mut running = Vec::new();

        for section in Section::ALL {
            if !options.is_enabled(section) {
                outcomes.push(DetectorOutcome::skipped(section));
                continue;
            }
            let Some(detector) = self.registry.get(section) else {
                log::warn!("[Detect] No detector registered for section {}", section);
                outcomes.push(DetectorOutcome::skipped(section));
                continue;
            };

            let ctx = DetectionContext::new(
                Arc::clone(&document),
                Arc::clone(&retrieval),
                Arc::clone(&self.config),
            );
            let cancel = ctx.cancel_signal().clone();
            let partial = ctx.partial_slot().clone();
            let worker = Arc::clone(detector);
            let handle = tokio::task::spawn_blocking(move || worker.run(&ctx));
            running.push(RunningDetector {
                section,
                name: detector.name(),
                cancel,
                partial,
                handle,
            });
        }
        log::debug!("[Detect] Dispatched {} detector(s)", running.len());

        let mut expired = false;
        for mut task in running {
            if !expired {
                match timeout_at(deadline, &mut task.handle).await {
                    Ok(joined) => {
                        outcomes.push(Self::settle(task.section, task.name, &task.partial, joined));
                        continue;
                    }
                    Err(_) => {
                        log::warn!("[Detect] Deadline reached while waiting for {}", task.name);
                        expired = true;
                    }
                }
            } else if task.handle.is_finished() {
                outcomes.push(Self::settle(task.section, task.name, &task.partial, task.handle.await));
                continue;
            }
            // 阻塞线程无法强制中止，置位取消信号后由检测器在下一个安全点退出
            task.cancel.cancel();
            outcomes.push(DetectorOutcome::timed_out(task.section, task.partial.take()));
        }
        outcomes
    }

    fn settle(
        section: Section,
        name: &'static str,
        partial: &PartialSlot,
        joined: Result<Result<SectionData, DetectorFailure>, JoinError>,
    ) -> DetectorOutcome {
        match joined {
            Ok(Ok(data)) if data.section() == section => DetectorOutcome::complete(data),
            Ok(Ok(data)) => {
                log::warn!(
                    "[Detect] {} returned data for section {} instead of {}",
                    name,
                    data.section(),
                    section
                );
                DetectorOutcome::failed(section, format!("detector returned data for {}", data.section()))
            }
            Ok(Err(DetectorFailure::Cancelled)) => DetectorOutcome::timed_out(section, partial.take()),
            Ok(Err(err)) => {
                log::warn!("[Detect] {} failed: {}", name, err);
                DetectorOutcome::failed(section, err.to_string())
            }
            Err(join_err) => {
                let failure = match join_err.try_into_panic() {
                    Ok(payload) => DetectorFailure::Panicked(panic_message(payload.as_ref())),
                    Err(other) => DetectorFailure::Internal(other.to_string()),
                };
                log::error!("[Detect] {} aborted: {}", name, failure);
                DetectorOutcome::failed(section, failure.to_string())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
