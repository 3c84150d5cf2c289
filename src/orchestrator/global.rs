//! 全局编排器单例管理
use once_cell::sync::Lazy;
use tokio::sync::OnceCell;

use super::pipeline::Orchestrator;
use crate::config::{AnalysisConfig, AnalysisOptions};
use crate::error::SlResult;
use crate::report::AnalysisReport;

/// 全局编排器实例
static GLOBAL_ORCHESTRATOR: Lazy<OnceCell<Orchestrator>> = Lazy::new(OnceCell::new);

/// 带自定义配置初始化全局编排器；已初始化时保持原实例
pub async fn init_global_orchestrator(config: AnalysisConfig) -> SlResult<()> {
    GLOBAL_ORCHESTRATOR
        .get_or_try_init(|| async move { Orchestrator::new(config) })
        .await?;
    Ok(())
}

/// 获取全局编排器，未初始化时按默认配置懒加载
async fn global_orchestrator() -> SlResult<&'static Orchestrator> {
    GLOBAL_ORCHESTRATOR
        .get_or_try_init(|| async { Orchestrator::new(AnalysisConfig::default()) })
        .await
}

/// 使用全局编排器分析单个URL
pub async fn analyze(url: &str, options: AnalysisOptions) -> SlResult<AnalysisReport> {
    global_orchestrator().await?.analyze(url, options).await
}
