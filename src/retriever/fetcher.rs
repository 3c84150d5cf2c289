//! Page retriever
//! 页面检索器
//! 核心特性：
//! 1. 先直连，遇到跨域拦截 / 网络拒绝 / 超时再依次回退到中继列表
//! 2. 严格串行：同一时刻只有一个请求打向目标，避免触发二次限流
//! 3. 总尝试次数封顶（含直连），与中继列表长度无关
//! 4. 中继之间线性退避
//! 5. 每次失败都被分类记录，而不只是打日志

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::time::{sleep, timeout_at, Instant};
use url::Url;

use crate::config::{RetrieverConfig, StylesheetOptions};
use crate::error::{AttemptFailure, RetrievalError, RetrievalErrorKind, SiteLensError, SlResult};
use crate::parser::{InputGuard, LinkedStylesheet};
use crate::retriever::relay::RelayEndpoint;
use crate::utils::preview::preview_compact;

/// 视为"被拦截"的状态码，直连遇到时回退到中继
const BLOCKED_STATUSES: [u16; 6] = [401, 403, 407, 429, 451, 503];

const DIRECT: &str = "direct";

/// 实际提供内容的检索策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RetrievalStrategy {
    Direct,
    Relay { name: String },
}

impl RetrievalStrategy {
    pub fn is_relay(&self) -> bool {
        matches!(self, RetrievalStrategy::Relay { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            RetrievalStrategy::Direct => DIRECT,
            RetrievalStrategy::Relay { name } => name,
        }
    }
}

/// 检索结果，单次分析期间由编排器独占
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub final_url: String,
    pub body: Vec<u8>,
    pub strategy_used: RetrievalStrategy,
    pub http_status: u16,
    pub elapsed_ms: u64,
    /// 响应头（名称小写）
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    /// max(实际字节数, content-length)
    pub transfer_bytes: u64,
}

impl RetrievalResult {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 单次尝试成功时的原始响应
struct RawResponse {
    final_url: String,
    status: u16,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    content_length: Option<u64>,
    /// 实际收到的字节数，可能大于截断后的 body
    received: u64,
    body: Vec<u8>,
}

type AttemptResult<T> = Result<T, (RetrievalErrorKind, String)>;

/// 页面检索器：中继列表在构造时注入，不持有跨调用状态
#[derive(Debug, Clone)]
pub struct Retriever {
    client: Client,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(config: RetrieverConfig) -> SlResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .gzip(true)
            .build()
            .map_err(|e| SiteLensError::Runtime(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// 使用配置中的检索子预算执行检索
    pub async fn retrieve(&self, url: &Url) -> Result<RetrievalResult, RetrievalError> {
        let deadline = Instant::now() + self.config.retrieval_budget;
        self.retrieve_until(url, deadline).await
    }

    /// 在给定截止时间内执行完整的回退链
    pub async fn retrieve_until(
        &self,
        url: &Url,
        deadline: Instant,
    ) -> Result<RetrievalResult, RetrievalError> {
        let started = Instant::now();
        let deadline = deadline.min(started + self.config.retrieval_budget);
        let mut attempts: Vec<AttemptFailure> = Vec::new();

        // 1. 直连
        match self.attempt(url.clone(), deadline).await {
            Ok(raw) => {
                log::info!(
                    "[Retrieve] Direct retrieval succeeded | URL: {} | Status: {} | Bytes: {} | Time: {}ms",
                    url,
                    raw.status,
                    raw.body.len(),
                    started.elapsed().as_millis()
                );
                return Ok(Self::finish(raw, RetrievalStrategy::Direct, started));
            }
            Err((kind, detail)) => {
                log::warn!(
                    "[Retrieve] Direct retrieval failed | URL: {} | Kind: {} | Detail: {}",
                    url,
                    kind,
                    detail
                );
                attempts.push(AttemptFailure {
                    strategy: DIRECT.to_string(),
                    kind,
                    detail,
                });
                // 目标自身返回错误状态：终止，不走中继
                if let RetrievalErrorKind::HttpError(_) = kind {
                    return Err(RetrievalError {
                        kind,
                        target: url.to_string(),
                        attempts,
                        relays_tried: 0,
                    });
                }
            }
        }

        // 2. 中继回退链
        let relay_slots = self.config.max_attempts.saturating_sub(1);
        let mut relays_tried = 0;
        let mut budget_exhausted = false;

        for (index, relay) in self.config.relays.iter().take(relay_slots).enumerate() {
            let delay = self.config.backoff.delay_before(index);
            if Instant::now() + delay >= deadline {
                budget_exhausted = true;
                break;
            }
            if !delay.is_zero() {
                sleep(delay).await;
            }

            relays_tried += 1;
            match self.attempt_relay(relay, url, deadline).await {
                Ok(raw) => {
                    log::info!(
                        "[Retrieve] Relay retrieval succeeded | Relay: {} | URL: {} | Bytes: {} | Time: {}ms",
                        relay.name,
                        url,
                        raw.body.len(),
                        started.elapsed().as_millis()
                    );
                    let strategy = RetrievalStrategy::Relay {
                        name: relay.name.clone(),
                    };
                    return Ok(Self::finish(raw, strategy, started));
                }
                Err((kind, detail)) => {
                    log::warn!(
                        "[Retrieve] Relay attempt failed ({}/{}) | Relay: {} | Kind: {} | Detail: {}",
                        relays_tried,
                        relay_slots.min(self.config.relays.len()),
                        relay.name,
                        kind,
                        detail
                    );
                    attempts.push(AttemptFailure {
                        strategy: relay.name.clone(),
                        kind,
                        detail,
                    });
                }
            }
        }

        let kind = if budget_exhausted
            || attempts
                .iter()
                .all(|a| a.kind == RetrievalErrorKind::Timeout)
        {
            RetrievalErrorKind::Timeout
        } else {
            attempts
                .first()
                .map_or(RetrievalErrorKind::Unreachable, |a| a.kind)
        };

        log::error!(
            "[Retrieve] All strategies exhausted | URL: {} | Kind: {} | Attempts: {} | Relays tried: {}",
            url,
            kind,
            attempts.len(),
            relays_tried
        );

        Err(RetrievalError {
            kind,
            target: url.to_string(),
            attempts,
            relays_tried,
        })
    }

    /// 通过中继抓取，目标URL作为查询参数
    async fn attempt_relay(
        &self,
        relay: &RelayEndpoint,
        target: &Url,
        deadline: Instant,
    ) -> AttemptResult<RawResponse> {
        let request_url = relay.request_url(target).map_err(|e| {
            (
                RetrievalErrorKind::Unreachable,
                format!("invalid relay endpoint {}: {}", relay.base_url, e),
            )
        })?;

        let mut raw = self.attempt(request_url, deadline).await?;
        let body = relay.unwrap_body(&raw.body).ok_or_else(|| {
            (
                RetrievalErrorKind::Blocked,
                format!(
                    "relay returned a malformed envelope: {}",
                    preview_compact(&String::from_utf8_lossy(&raw.body), 120)
                ),
            )
        })?;
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err((
                RetrievalErrorKind::Blocked,
                "relay returned an empty body".to_string(),
            ));
        }

        raw.body = body;
        raw.final_url = target.to_string();
        Ok(raw)
    }

    /// 单次GET请求，超时取 min(单次超时, 剩余预算)
    async fn attempt(&self, url: Url, deadline: Instant) -> AttemptResult<RawResponse> {
        let now = Instant::now();
        if now >= deadline {
            return Err((
                RetrievalErrorKind::Timeout,
                "retrieval budget exhausted".to_string(),
            ));
        }
        let attempt_deadline = deadline.min(now + self.config.attempt_timeout);

        match timeout_at(attempt_deadline, self.send(url)).await {
            Ok(result) => result,
            Err(_) => Err((
                RetrievalErrorKind::Timeout,
                format!(
                    "no response within {}ms",
                    attempt_deadline.saturating_duration_since(now).as_millis()
                ),
            )),
        }
    }

    async fn send(&self, url: Url) -> AttemptResult<RawResponse> {
        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| (classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err((classify_status(status), format!("status {}", status)));
        }

        let final_url = response.url().to_string();
        let content_length = response.content_length();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let content_type = headers
            .iter()
            .find(|(k, _)| k == "content-type")
            .map(|(_, v)| v.clone());

        // 分块读取，达到上限即停止，超出部分不进入内存
        let limit = self.config.max_body_bytes;
        let mut body: Vec<u8> =
            Vec::with_capacity(content_length.map_or(0, |len| len.min(limit as u64) as usize));
        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| (classify_transport(&e), format!("failed to read body: {}", e)))?
        {
            received += chunk.len() as u64;
            let room = limit - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                log::debug!(
                    "[Retrieve] Body capped | URL: {} | Limit: {} | Received: {}",
                    final_url,
                    limit,
                    received
                );
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            final_url,
            status: status.as_u16(),
            headers,
            content_type,
            content_length,
            received,
            body,
        })
    }

    fn finish(raw: RawResponse, strategy: RetrievalStrategy, started: Instant) -> RetrievalResult {
        let seen = raw.received.max(raw.body.len() as u64);
        RetrievalResult {
            final_url: raw.final_url,
            transfer_bytes: raw.content_length.map_or(seen, |len| len.max(seen)),
            body: raw.body,
            strategy_used: strategy,
            http_status: raw.status,
            elapsed_ms: started.elapsed().as_millis() as u64,
            headers: raw.headers,
            content_type: raw.content_type,
        }
    }

    /// 串行直连抓取外链样式表，失败只记录日志
    pub async fn fetch_stylesheets(
        &self,
        hrefs: &[String],
        options: &StylesheetOptions,
        deadline: Instant,
    ) -> Vec<LinkedStylesheet> {
        let mut sheets = Vec::new();
        if !options.fetch_linked {
            return sheets;
        }

        for href in hrefs.iter().take(options.max_count) {
            let now = Instant::now();
            if now >= deadline {
                log::debug!("[Retrieve] Deadline reached, skip remaining stylesheets");
                break;
            }
            let Ok(url) = Url::parse(href) else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }

            let until = deadline.min(now + options.timeout);
            match timeout_at(until, self.send(url)).await {
                Ok(Ok(raw)) => {
                    let text = InputGuard::decode(&raw.body, self.config.max_body_bytes);
                    log::debug!(
                        "[Retrieve] Stylesheet collected | URL: {} | Bytes: {}",
                        href,
                        text.len()
                    );
                    sheets.push(LinkedStylesheet {
                        url: href.clone(),
                        text,
                    });
                }
                Ok(Err((kind, detail))) => {
                    log::debug!(
                        "[Retrieve] Stylesheet skipped | URL: {} | Kind: {} | Detail: {}",
                        href,
                        kind,
                        detail
                    );
                }
                Err(_) => {
                    log::debug!("[Retrieve] Stylesheet timed out | URL: {}", href);
                }
            }
        }

        sheets
    }
}

fn classify_transport(error: &reqwest::Error) -> RetrievalErrorKind {
    if error.is_timeout() {
        RetrievalErrorKind::Timeout
    } else {
        RetrievalErrorKind::Unreachable
    }
}

fn classify_status(status: StatusCode) -> RetrievalErrorKind {
    if BLOCKED_STATUSES.contains(&status.as_u16()) {
        RetrievalErrorKind::Blocked
    } else {
        RetrievalErrorKind::HttpError(status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::FORBIDDEN), RetrievalErrorKind::Blocked);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            RetrievalErrorKind::Blocked
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            RetrievalErrorKind::HttpError(404)
        );
    }

    #[test]
    fn test_strategy_label() {
        assert_eq!(RetrievalStrategy::Direct.label(), "direct");
        let relay = RetrievalStrategy::Relay { name: "codetabs".into() };
        assert!(relay.is_relay());
        assert_eq!(relay.label(), "codetabs");
    }
}
