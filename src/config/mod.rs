//! 配置模块：分析流水线的全部可配置项
pub mod analysis;

pub use self::analysis::{
    AnalysisConfig, AnalysisConfigBuilder, AnalysisOptions, BackoffPolicy, PerformanceThresholds,
    ProgressSender, RetrieverConfig, StylesheetOptions,
};
