//! rsitelens 网站分析演示程序
//! 功能说明：
//! 1. 使用默认中继列表与默认超时构建编排器
//! 2. 实时打印阶段进度事件
//! 3. 输出结构化JSON报告
//!
//! 运行命令：
//! cargo run --example analyze_demo -- https://example.com

use std::error::Error;
use std::time::Instant;

use env_logger::{Builder, Env, Target};
use rsitelens::{AnalysisConfig, AnalysisOptions, Orchestrator, StageEvent};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // ========== 1. 日志系统初始化 ==========
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    // ========== 2. 构建编排器 ==========
    let orchestrator = Orchestrator::new(AnalysisConfig::default())?;

    // ========== 3. 订阅阶段进度 ==========
    let (tx, mut rx) = mpsc::unbounded_channel::<StageEvent>();
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("⏱  {:>6}ms  {:?}", event.elapsed_ms, event.stage);
        }
    });

    // ========== 4. 执行分析 ==========
    let started = Instant::now();
    let result = orchestrator
        .analyze(&url, AnalysisOptions::default().with_progress(tx))
        .await;
    let _ = progress.await;

    match result {
        Ok(report) => {
            eprintln!(
                "✅ 分析完成 | 状态: {:?} | 策略: {} | 耗时: {:?}",
                report.overall_status(),
                report.strategy_used().label(),
                started.elapsed()
            );
            println!("{}", report.to_json_pretty()?);
        }
        Err(err) => {
            eprintln!("❌ 分析失败: {}", err);
            if let rsitelens::SiteLensError::Retrieval(retrieval) = &err {
                for attempt in &retrieval.attempts {
                    eprintln!("   - {}: {} ({})", attempt.strategy, attempt.kind, attempt.detail);
                }
            }
            return Err(err.into());
        }
    }

    Ok(())
}
