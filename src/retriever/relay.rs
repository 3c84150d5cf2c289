//! 中继端点定义
//! 中继是代替调用方抓取目标URL的第三方HTTP服务，用于绕过跨域限制

use serde::{Deserialize, Serialize};
use url::Url;

/// 中继响应格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayFormat {
    /// 响应体即页面原文
    Raw,
    /// JSON信封，页面原文位于 `contents` 字段
    JsonContents,
}

/// 中继端点：base_url + 查询参数名（目标URL作为该参数值，自动URL编码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEndpoint {
    pub name: String,
    pub base_url: String,
    pub param: String,
    pub format: RelayFormat,
}

impl RelayEndpoint {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        param: impl Into<String>,
        format: RelayFormat,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            param: param.into(),
            format,
        }
    }

    /// 构造中继请求URL
    pub fn request_url(&self, target: &Url) -> Result<Url, url::ParseError> {
        Url::parse_with_params(&self.base_url, &[(self.param.as_str(), target.as_str())])
    }

    /// 从中继响应中取出页面原文；JSON信封缺失 contents 时返回 None
    pub fn unwrap_body(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        match self.format {
            RelayFormat::Raw => Some(bytes.to_vec()),
            RelayFormat::JsonContents => {
                let envelope: serde_json::Value = serde_json::from_slice(bytes).ok()?;
                envelope
                    .get("contents")
                    .and_then(|v| v.as_str())
                    .map(|s| s.as_bytes().to_vec())
            }
        }
    }
}

/// 默认中继列表（固定优先级）
pub fn default_relays() -> Vec<RelayEndpoint> {
    vec![
        RelayEndpoint::new(
            "allorigins-raw",
            "https://api.allorigins.win/raw",
            "url",
            RelayFormat::Raw,
        ),
        RelayEndpoint::new("corsproxy", "https://corsproxy.io/", "url", RelayFormat::Raw),
        RelayEndpoint::new(
            "codetabs",
            "https://api.codetabs.com/v1/proxy",
            "quest",
            RelayFormat::Raw,
        ),
        RelayEndpoint::new(
            "allorigins-json",
            "https://api.allorigins.win/get",
            "url",
            RelayFormat::JsonContents,
        ),
    ]
}
