//! 分析配置管理
//! 设计说明：
//! - AnalysisConfig 是构造期注入的不可变配置值（Orchestrator / Retriever 持有副本）
//! - AnalysisOptions 是单次 analyze 调用的覆盖项（超时、检测器子集、进度通道）
//! - 中继列表属于配置的一部分，不存在可变的全局状态

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::orchestrator::StageEvent;
use crate::report::Section;
use crate::retriever::relay::{default_relays, RelayEndpoint};

/// 阶段进度通道（单向、即发即弃）
pub type ProgressSender = UnboundedSender<StageEvent>;

/// 中继重试退避策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    None,             // 中继之间不等待
    Linear(Duration), // 第 n 个中继前等待 n × step（线性，非指数）
}

impl BackoffPolicy {
    /// 计算第 relay_index 个中继（从0开始）尝试前的等待时长
    pub fn delay_before(&self, relay_index: usize) -> Duration {
        match self {
            BackoffPolicy::None => Duration::ZERO,
            BackoffPolicy::Linear(step) => step.saturating_mul(relay_index as u32),
        }
    }
}

/// 检索器配置
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// 有序中继列表，按优先级依次尝试
    pub relays: Vec<RelayEndpoint>,
    /// 单次尝试超时
    pub attempt_timeout: Duration,
    /// 总尝试次数上限（含直连），与中继列表长度无关
    pub max_attempts: usize,
    pub backoff: BackoffPolicy,
    /// 检索子预算，实际使用时再与整体截止时间取较小值
    pub retrieval_budget: Duration,
    pub user_agent: String,
    /// 响应体最大字节数，超出部分在解析前截断
    pub max_body_bytes: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            attempt_timeout: Duration::from_secs(8),
            max_attempts: 4,
            backoff: BackoffPolicy::Linear(Duration::from_millis(250)),
            retrieval_budget: Duration::from_secs(20),
            user_agent: format!(
                "Mozilla/5.0 (compatible; rsitelens/{})",
                env!("CARGO_PKG_VERSION")
            ),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// 外链样式表采集选项
#[derive(Debug, Clone)]
pub struct StylesheetOptions {
    pub fetch_linked: bool,
    pub max_count: usize,
    pub timeout: Duration,
}

impl Default for StylesheetOptions {
    fn default() -> Self {
        Self {
            fetch_linked: true,
            max_count: 6,
            timeout: Duration::from_secs(3),
        }
    }
}

/// 性能分级阈值（延迟毫秒 / 传输字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceThresholds {
    /// 依次为 excellent / good / fair 的延迟上限，超出即 poor
    pub latency_ms: [u64; 3],
    /// 依次为 excellent / good / fair 的体积上限，超出即 poor
    pub weight_bytes: [u64; 3],
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            latency_ms: [500, 1_500, 3_500],
            weight_bytes: [100 * 1024, 500 * 1024, 1_500 * 1024],
        }
    }
}

/// 完整分析配置
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub retriever: RetrieverConfig,
    pub stylesheets: StylesheetOptions,
    /// 整条流水线的总时间预算
    pub total_timeout: Duration,
    pub max_components: usize,
    pub max_spacing_tokens: usize,
    pub max_custom_properties: usize,
    pub performance: PerformanceThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            retriever: RetrieverConfig::default(),
            stylesheets: StylesheetOptions::default(),
            total_timeout: Duration::from_secs(30),
            max_components: 200,
            max_spacing_tokens: 12,
            max_custom_properties: 64,
            performance: PerformanceThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::new()
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 替换中继列表（测试中可注入假中继）
    pub fn relays(mut self, relays: Vec<RelayEndpoint>) -> Self {
        self.config.retriever.relays = relays;
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.retriever.attempt_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.retriever.max_attempts = attempts.max(1);
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.retriever.backoff = backoff;
        self
    }

    pub fn retrieval_budget(mut self, budget: Duration) -> Self {
        self.config.retriever.retrieval_budget = budget;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.retriever.user_agent = user_agent.into();
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.retriever.max_body_bytes = bytes;
        self
    }

    pub fn stylesheets(mut self, options: StylesheetOptions) -> Self {
        self.config.stylesheets = options;
        self
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.config.total_timeout = timeout;
        self
    }

    pub fn max_components(mut self, cap: usize) -> Self {
        self.config.max_components = cap;
        self
    }

    pub fn max_spacing_tokens(mut self, cap: usize) -> Self {
        self.config.max_spacing_tokens = cap;
        self
    }

    pub fn max_custom_properties(mut self, cap: usize) -> Self {
        self.config.max_custom_properties = cap;
        self
    }

    pub fn performance(mut self, thresholds: PerformanceThresholds) -> Self {
        self.config.performance = thresholds;
        self
    }

    pub fn build(self) -> AnalysisConfig {
        self.config
    }
}

/// 单次分析的调用选项
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// 覆盖配置中的总超时
    pub timeout: Option<Duration>,
    /// 仅运行指定分区的检测器，None 表示全部
    pub detectors: Option<Vec<Section>>,
    /// 阶段进度通知
    pub progress: Option<ProgressSender>,
}

impl AnalysisOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_detectors(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        self.detectors = Some(sections.into_iter().collect());
        self
    }

    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// 判断分区是否被选中
    pub fn is_enabled(&self, section: Section) -> bool {
        self.detectors
            .as_ref()
            .map_or(true, |selected| selected.contains(&section))
    }
}
