//! rsitelens - 网站技术栈 / 设计令牌 / 组件 / SEO / 性能分析工具

// 导出全局错误类型
pub use self::error::{DetectorFailure, RetrievalError, RetrievalErrorKind, SiteLensError, SlResult};

// 导出配置模块
pub use self::config::{
    AnalysisConfig, AnalysisConfigBuilder, AnalysisOptions, BackoffPolicy, PerformanceThresholds,
    ProgressSender, RetrieverConfig, StylesheetOptions,
};

// 导出编排入口
pub use self::orchestrator::{analyze, init_global_orchestrator, Orchestrator, Stage, StageEvent};

// 导出报告模型
pub use self::report::{
    AnalysisReport, OverallStatus, RetrievalSummary, Section, SectionData, SectionStatus,
};

// 导出检测器扩展接口
pub use self::detector::{DetectionContext, Detector, DetectorRegistry};

// 导出检索与解析
pub use self::parser::{MarkupParser, ParsedDocument};
pub use self::retriever::{RelayEndpoint, RelayFormat, RetrievalResult, RetrievalStrategy, Retriever};

// 声明所有子模块
pub mod config;
pub mod detector;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod retriever;
pub mod rule;
pub mod utils;
