//! 全局错误类型定义
//! 分层说明：
//! 1. RetrievalError：检索层终止性错误，唯一会中断整条流水线的错误
//! 2. DetectorFailure：单个检测器的局部错误，只在聚合器边界被记录，从不向外传播
//! 3. SiteLensError：对调用方暴露的统一错误
use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ===================== 检索相关错误 =====================

/// 检索失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "status")]
pub enum RetrievalErrorKind {
    /// 网络层不可达（连接被拒绝 / DNS失败等）
    Unreachable,
    /// 目标或中继拒绝提供内容（跨域拦截、反爬、401/403/429...）
    Blocked,
    /// 超过单次或整体时间预算
    Timeout,
    /// 目标自身返回了错误状态码
    HttpError(u16),
}

impl fmt::Display for RetrievalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("unreachable"),
            Self::Blocked => f.write_str("blocked"),
            Self::Timeout => f.write_str("timeout"),
            Self::HttpError(status) => write!(f, "http error {}", status),
        }
    }
}

/// 单次检索尝试的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFailure {
    /// 策略名称（direct 或中继名称）
    pub strategy: String,
    pub kind: RetrievalErrorKind,
    pub detail: String,
}

/// 检索层终止性错误
/// relays_tried > 0 表示中继链已被尝试并耗尽
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("Retrieval of {target} failed ({kind}) after {} attempt(s), {relays_tried} relay(s) tried", .attempts.len())]
pub struct RetrievalError {
    pub kind: RetrievalErrorKind,
    pub target: String,
    pub attempts: Vec<AttemptFailure>,
    pub relays_tried: usize,
}

impl RetrievalError {
    /// 是否已尝试并耗尽中继链
    pub fn relays_exhausted(&self) -> bool {
        self.relays_tried > 0
    }
}

// ===================== 检测器相关错误 =====================

/// 检测器局部失败，只会被记录进报告的 section_status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorFailure {
    /// 检测器内部逻辑错误
    #[error("Detector failed: {0}")]
    Internal(String),
    /// 检测器在安全点观察到取消信号并主动退出
    #[error("Detector cancelled at the deadline")]
    Cancelled,
    /// 检测器任务panic，由聚合器边界捕获
    #[error("Detector panicked: {0}")]
    Panicked(String),
}

// ===================== 对外统一错误 =====================

#[derive(Error, Debug)]
pub enum SiteLensError {
    /// 输入URL非法（规范化或主机校验失败）
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// 检索链耗尽
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// 解析阶段异常（容错解析器理论上不会触发，仍做防护）
    #[error("Markup parsing aborted: {0}")]
    Parse(String),

    /// 运行时异常（HTTP客户端构建失败、阻塞线程池不可用等）
    #[error("Runtime failure: {0}")]
    Runtime(String),
}

// 全局Result类型
pub type SlResult<T> = Result<T, SiteLensError>;
