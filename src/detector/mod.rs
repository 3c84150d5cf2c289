//! 检测模块：统一的检测器接口、执行上下文与注册表
//! 检测器是无状态的同步单元，在阻塞线程池上并发执行，只读共享同一份文档
pub mod analyzer;
pub mod components;
pub mod design;
pub mod performance;
pub mod seo;
pub mod tech_stack;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::AnalysisConfig;
use crate::error::DetectorFailure;
use crate::parser::ParsedDocument;
use crate::report::{Section, SectionData};
use crate::retriever::RetrievalResult;

pub use self::components::ComponentClassifier;
pub use self::design::DesignSystemExtractor;
pub use self::performance::PerformanceProfiler;
pub use self::seo::SeoAnalyzer;
pub use self::tech_stack::TechStackDetector;

/// 检测器接口
pub trait Detector: Send + Sync {
    /// 检测器名称（日志用）
    fn name(&self) -> &'static str;

    /// 产出的报告分区
    fn section(&self) -> Section;

    /// 执行检测
    /// 应在安全点调用 `ctx.checkpoint()` 响应取消，可用 `ctx.commit()` 提交阶段性结果
    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure>;
}

// ===================== 协作式取消 =====================

/// 取消信号：编排器在截止时间到达时置位，检测器在安全点轮询
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 阶段性结果槽：整体替换写入，超时时编排器取走最后一次完整提交的数据
#[derive(Debug, Clone, Default)]
pub struct PartialSlot(Arc<Mutex<Option<SectionData>>>);

impl PartialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&self, data: SectionData) {
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(data);
    }

    pub fn take(&self) -> Option<SectionData> {
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take()
    }
}

// ===================== 执行上下文 =====================

/// 单个检测器的执行上下文
/// 文档与检索遥测以 Arc 只读共享；取消信号与结果槽每个检测器独立
#[derive(Clone)]
pub struct DetectionContext {
    document: Arc<ParsedDocument>,
    retrieval: Arc<RetrievalResult>,
    config: Arc<AnalysisConfig>,
    cancel: CancelSignal,
    partial: PartialSlot,
}

impl DetectionContext {
    pub fn new(
        document: Arc<ParsedDocument>,
        retrieval: Arc<RetrievalResult>,
        config: Arc<AnalysisConfig>,
    ) -> Self {
        Self {
            document,
            retrieval,
            config,
            cancel: CancelSignal::new(),
            partial: PartialSlot::new(),
        }
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    pub fn retrieval(&self) -> &RetrievalResult {
        &self.retrieval
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 安全点：已取消时返回 `DetectorFailure::Cancelled`
    pub fn checkpoint(&self) -> Result<(), DetectorFailure> {
        if self.cancel.is_cancelled() {
            Err(DetectorFailure::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 提交阶段性结果
    pub fn commit(&self, data: SectionData) {
        self.partial.commit(data);
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn partial_slot(&self) -> &PartialSlot {
        &self.partial
    }
}

impl fmt::Debug for DetectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionContext")
            .field("base_url", &self.document.base_url())
            .field("strategy", &self.retrieval.strategy_used)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ===================== 注册表 =====================

/// 有序检测器注册表
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 标准五检测器，固定顺序
    pub fn standard() -> Self {
        Self::empty()
            .with_detector(TechStackDetector)
            .with_detector(DesignSystemExtractor)
            .with_detector(ComponentClassifier)
            .with_detector(SeoAnalyzer)
            .with_detector(PerformanceProfiler)
    }

    /// 注册检测器；同一分区已存在时原位替换
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        let section = detector.section();
        match self.detectors.iter_mut().find(|d| d.section() == section) {
            Some(slot) => *slot = detector,
            None => self.detectors.push(detector),
        }
    }

    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.register(Arc::new(detector));
        self
    }

    pub fn get(&self, section: Section) -> Option<&Arc<dyn Detector>> {
        self.detectors.iter().find(|d| d.section() == section)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Detector>> {
        self.detectors.iter()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.name()))
            .finish()
    }
}
