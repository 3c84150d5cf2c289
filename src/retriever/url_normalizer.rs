//! URL 规范化与主机校验

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

use crate::error::{SiteLensError, SlResult};

/// 点分域名 + 字母顶级域
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z][a-z0-9-]{0,61}[a-z0-9]$").unwrap()
});

/// 规范化调用方传入的URL
/// 规则：
/// 1. 去除首尾空白，缺省scheme时补 https
/// 2. 仅允许 http / https
/// 3. 主机必须为 IP、localhost 或合法点分域名
/// 4. 丢弃片段（#...）
pub fn normalize_url(raw: &str) -> SlResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SiteLensError::InvalidUrl("empty URL".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let mut url = Url::parse(&candidate)
        .map_err(|e| SiteLensError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SiteLensError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
        Some(Host::Domain(domain)) => {
            if !is_valid_domain(domain) {
                return Err(SiteLensError::InvalidUrl(format!("invalid host '{}'", domain)));
            }
        }
        None => return Err(SiteLensError::InvalidUrl(format!("{}: missing host", trimmed))),
    }

    url.set_fragment(None);
    Ok(url)
}

fn is_valid_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }
    domain.len() <= 253 && DOMAIN_RE.is_match(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_defaults_to_https() {
        let url = normalize_url("  example.com/path#top ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn test_keeps_http_and_ip_hosts() {
        assert_eq!(
            normalize_url("http://127.0.0.1:8080/").unwrap().as_str(),
            "http://127.0.0.1:8080/"
        );
        assert!(normalize_url("http://localhost:3000").is_ok());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(normalize_url("").is_err());
        assert!(normalize_url("ftp://example.com").is_err());
        assert!(normalize_url("https://not_a_host").is_err());
        assert!(normalize_url("https://example").is_err());
        assert!(normalize_url("javascript:alert(1)").is_err());
    }
}
