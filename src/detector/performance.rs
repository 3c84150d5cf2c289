//! 性能画像
//! 唯一同时依赖检索遥测与文档的检测器：延迟 / 传输体积 / 资源数量 → 粗粒度分级
use url::{Host, Url};

use super::{DetectionContext, Detector};
use crate::error::DetectorFailure;
use crate::report::{PerformanceSection, PerformanceTier, Section, SectionData};

pub struct PerformanceProfiler;

impl Detector for PerformanceProfiler {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn section(&self) -> Section {
        Section::Performance
    }

    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure> {
        let doc = ctx.document();
        let retrieval = ctx.retrieval();
        let thresholds = &ctx.config().performance;

        let page_host = Url::parse(&retrieval.final_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
        let third_party_script_count = doc
            .scripts()
            .iter()
            .filter(|src| match (&page_host, Url::parse(src).ok()) {
                (Some(page), Some(url)) => !same_site(page, &url),
                _ => false,
            })
            .count();

        let latency_tier = tier_for(retrieval.elapsed_ms, thresholds.latency_ms);
        let weight_tier = tier_for(retrieval.transfer_bytes, thresholds.weight_bytes);

        let section = PerformanceSection {
            latency_ms: retrieval.elapsed_ms,
            transfer_bytes: retrieval.transfer_bytes,
            document_bytes: doc.byte_len() as u64,
            element_count: doc.element_count(),
            script_count: doc.scripts().len(),
            inline_script_count: doc.inline_scripts().len(),
            third_party_script_count,
            stylesheet_count: doc.stylesheet_hrefs().len() + doc.style_blocks().len(),
            image_count: doc.images().len(),
            via_relay: retrieval.strategy_used.is_relay(),
            latency_tier,
            weight_tier,
            tier: latency_tier.max(weight_tier),
        };

        log::debug!(
            "[Detect] Performance profiled | Latency: {}ms ({:?}) | Bytes: {} ({:?}) | Tier: {:?}",
            section.latency_ms,
            section.latency_tier,
            section.transfer_bytes,
            section.weight_tier,
            section.tier
        );
        Ok(SectionData::Performance(section))
    }
}

/// 阈值依次为 excellent / good / fair 的上限（含），超出即 poor
pub fn tier_for(value: u64, limits: [u64; 3]) -> PerformanceTier {
    if value <= limits[0] {
        PerformanceTier::Excellent
    } else if value <= limits[1] {
        PerformanceTier::Good
    } else if value <= limits[2] {
        PerformanceTier::Fair
    } else {
        PerformanceTier::Poor
    }
}

/// 粗略同站判断：比较可注册域名（见 site_key）；IP 需完全一致
fn same_site(page_host: &str, url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            site_key(&domain) == site_key(page_host)
        }
        Some(_) => url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(page_host)),
        None => true,
    }
}

/// 国家顶级域下常见的二级公共后缀，如 co.uk / com.au
const CC_SECOND_LEVEL: [&str; 9] = ["co", "com", "net", "org", "ac", "gov", "edu", "ne", "or"];

/// 可注册域名的近似：默认取最后两级标签，
/// 两字母国家顶级域且倒数第二级为公共二级后缀时取三级。
/// 非完整公共后缀表，未收录的多级后缀仍按两级比较
fn site_key(host: &str) -> String {
    let labels: Vec<&str> = host.trim_end_matches('.').rsplit('.').collect();
    let depth = match labels.as_slice() {
        [tld, second, ..]
            if tld.len() == 2
                && tld.bytes().all(|b| b.is_ascii_alphabetic())
                && CC_SECOND_LEVEL.iter().any(|s| second.eq_ignore_ascii_case(s)) =>
        {
            3
        }
        _ => 2,
    };
    let mut key: Vec<&str> = labels.into_iter().take(depth).collect();
    key.reverse();
    key.join(".").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::parser::MarkupParser;
    use crate::retriever::{RetrievalResult, RetrievalStrategy};

    fn profile(elapsed_ms: u64, transfer_bytes: u64, strategy: RetrievalStrategy) -> PerformanceSection {
        let html = r#"<link rel="stylesheet" href="/a.css"><style>p{}</style>
            <script src="/app.js"></script>
            <script src="https://static.example.com/vendor.js"></script>
            <script src="https://www.googletagmanager.com/gtm.js?id=X"></script>
            <script>var x = 1;</script><img src="/a.png">"#;
        let base = Url::parse("https://www.example.com/").unwrap();
        let doc = MarkupParser::parse(html.as_bytes(), &base, 1 << 20);
        let retrieval = RetrievalResult {
            final_url: base.to_string(),
            body: html.as_bytes().to_vec(),
            strategy_used: strategy,
            http_status: 200,
            elapsed_ms,
            headers: Vec::new(),
            content_type: None,
            transfer_bytes,
        };
        let ctx = DetectionContext::new(
            Arc::new(doc),
            Arc::new(retrieval),
            Arc::new(AnalysisConfig::default()),
        );
        match PerformanceProfiler.run(&ctx) {
            Ok(SectionData::Performance(section)) => section,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_resource_counts() {
        let section = profile(120, 4_000, RetrievalStrategy::Direct);
        assert_eq!(section.script_count, 3);
        assert_eq!(section.inline_script_count, 1);
        assert_eq!(section.third_party_script_count, 1);
        assert_eq!(section.stylesheet_count, 2);
        assert_eq!(section.image_count, 1);
        assert!(!section.via_relay);
        assert_eq!(section.tier, PerformanceTier::Excellent);
    }

    #[test]
    fn test_overall_tier_is_the_worse_of_latency_and_weight() {
        let section = profile(1_000, 2_000_000, RetrievalStrategy::Relay { name: "r".into() });
        assert_eq!(section.latency_tier, PerformanceTier::Good);
        assert_eq!(section.weight_tier, PerformanceTier::Poor);
        assert_eq!(section.tier, PerformanceTier::Poor);
        assert!(section.via_relay);
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        let limits = [500, 1_500, 3_500];
        assert_eq!(tier_for(500, limits), PerformanceTier::Excellent);
        assert_eq!(tier_for(501, limits), PerformanceTier::Good);
        assert_eq!(tier_for(3_500, limits), PerformanceTier::Fair);
        assert_eq!(tier_for(3_501, limits), PerformanceTier::Poor);
    }

    #[test]
    fn test_country_code_second_level_suffixes_split_sites() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(!same_site("shop.example.co.uk", &url("https://cdn.other.co.uk/a.js")));
        assert!(same_site("shop.example.co.uk", &url("https://static.example.co.uk/a.js")));
        assert!(!same_site("www.acme.com.au", &url("https://tracker.com.au/t.js")));
        // 两字母顶级域本身仍按两级比较
        assert!(same_site("www.example.io", &url("https://cdn.example.io/a.js")));
        assert_eq!(site_key("WWW.Example.CO.UK."), "example.co.uk");
    }
}
