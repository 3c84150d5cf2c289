//! SEO 分析器
//! 元数据缺失属于数据而非错误：违规项只记录，不会让分区失败
use std::collections::BTreeMap;

use super::{DetectionContext, Detector};
use crate::error::DetectorFailure;
use crate::report::{Section, SectionData, SeoSection, SeoViolation, Severity};

const TITLE_MIN_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 60;
const DESCRIPTION_MIN_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 160;

const OG_REQUIRED: [&str; 3] = ["og:title", "og:description", "og:image"];

pub struct SeoAnalyzer;

impl Detector for SeoAnalyzer {
    fn name(&self) -> &'static str {
        "seo"
    }

    fn section(&self) -> Section {
        Section::Seo
    }

    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure> {
        let doc = ctx.document();

        let mut open_graph = BTreeMap::new();
        let mut twitter = BTreeMap::new();
        for meta in doc.meta_tags() {
            if meta.name.starts_with("og:") {
                open_graph.entry(meta.name.clone()).or_insert_with(|| meta.content.clone());
            } else if meta.name.starts_with("twitter:") {
                twitter.entry(meta.name.clone()).or_insert_with(|| meta.content.clone());
            }
        }

        let non_empty = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let images = doc.images();

        let mut seo = SeoSection {
            title: non_empty(doc.title()),
            description: non_empty(doc.meta("description")),
            canonical: non_empty(doc.canonical()),
            robots: non_empty(doc.meta("robots")),
            viewport: non_empty(doc.meta("viewport")),
            lang: non_empty(doc.lang()),
            open_graph,
            twitter,
            headings: doc.headings().to_vec(),
            image_count: images.len(),
            images_missing_alt: images
                .iter()
                .filter(|img| img.alt.as_deref().map_or(true, str::is_empty))
                .count(),
            violations: Vec::new(),
        };
        ctx.checkpoint()?;

        seo.violations = collect_violations(&seo);
        log::debug!(
            "[Detect] SEO checked | Title: {:?} | Violations: {}",
            seo.title,
            seo.violations.len()
        );
        Ok(SectionData::Seo(seo))
    }
}

fn violation(code: &'static str, severity: Severity, message: impl Into<String>) -> SeoViolation {
    SeoViolation {
        code,
        message: message.into(),
        severity,
    }
}

fn collect_violations(seo: &SeoSection) -> Vec<SeoViolation> {
    let mut out = Vec::new();

    match &seo.title {
        None => out.push(violation("missing-title", Severity::Error, "missing title")),
        Some(title) => {
            let len = title.chars().count();
            if len < TITLE_MIN_CHARS {
                out.push(violation(
                    "title-too-short",
                    Severity::Warning,
                    format!("title is {} characters, shorter than {}", len, TITLE_MIN_CHARS),
                ));
            } else if len > TITLE_MAX_CHARS {
                out.push(violation(
                    "title-too-long",
                    Severity::Warning,
                    format!("title is {} characters, longer than {}", len, TITLE_MAX_CHARS),
                ));
            }
        }
    }

    match &seo.description {
        None => out.push(violation(
            "missing-meta-description",
            Severity::Error,
            "missing meta description",
        )),
        Some(description) => {
            let len = description.chars().count();
            if len < DESCRIPTION_MIN_CHARS {
                out.push(violation(
                    "description-too-short",
                    Severity::Info,
                    format!("meta description is {} characters, shorter than {}", len, DESCRIPTION_MIN_CHARS),
                ));
            } else if len > DESCRIPTION_MAX_CHARS {
                out.push(violation(
                    "description-too-long",
                    Severity::Warning,
                    format!("meta description is {} characters, longer than {}", len, DESCRIPTION_MAX_CHARS),
                ));
            }
        }
    }

    if seo.canonical.is_none() {
        out.push(violation("missing-canonical", Severity::Warning, "missing canonical link"));
    }

    if seo.open_graph.is_empty() {
        out.push(violation("missing-open-graph", Severity::Warning, "missing Open Graph tags"));
    } else {
        for tag in OG_REQUIRED {
            if !seo.open_graph.contains_key(tag) {
                out.push(violation("missing-og-tag", Severity::Info, format!("missing {}", tag)));
            }
        }
    }

    check_headings(seo, &mut out);

    if seo.lang.is_none() {
        out.push(violation("missing-lang", Severity::Warning, "missing lang attribute on <html>"));
    }
    if seo.viewport.is_none() {
        out.push(violation("missing-viewport", Severity::Warning, "missing viewport meta tag"));
    }
    if seo
        .robots
        .as_deref()
        .is_some_and(|r| r.to_ascii_lowercase().contains("noindex"))
    {
        out.push(violation("noindex", Severity::Warning, "page is excluded from indexing (noindex)"));
    }
    if seo.images_missing_alt > 0 {
        out.push(violation(
            "images-missing-alt",
            Severity::Warning,
            format!("{} of {} image(s) missing alt text", seo.images_missing_alt, seo.image_count),
        ));
    }

    out
}

/// 标题层级：至多一个 h1，相邻标题层级跳跃不超过一级
fn check_headings(seo: &SeoSection, out: &mut Vec<SeoViolation>) {
    let h1_count = seo.headings.iter().filter(|h| h.level == 1).count();
    match h1_count {
        0 => out.push(violation("missing-h1", Severity::Warning, "missing top-level heading (h1)")),
        1 => {}
        n => out.push(violation(
            "multiple-h1",
            Severity::Error,
            format!("{} top-level headings (h1), expected at most one", n),
        )),
    }

    let mut reported: Vec<(u8, u8)> = Vec::new();
    for pair in seo.headings.windows(2) {
        let (prev, current) = (pair[0].level, pair[1].level);
        if current > prev + 1 && !reported.contains(&(prev, current)) {
            reported.push((prev, current));
            out.push(violation(
                "heading-level-skipped",
                Severity::Warning,
                format!("heading level skipped: h{} followed by h{}", prev, current),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::parser::MarkupParser;
    use crate::retriever::{RetrievalResult, RetrievalStrategy};

    fn run(html: &str) -> SeoSection {
        let base = Url::parse("https://example.com/").unwrap();
        let doc = MarkupParser::parse(html.as_bytes(), &base, 1 << 20);
        let retrieval = RetrievalResult {
            final_url: base.to_string(),
            body: Vec::new(),
            strategy_used: RetrievalStrategy::Direct,
            http_status: 200,
            elapsed_ms: 1,
            headers: Vec::new(),
            content_type: None,
            transfer_bytes: 0,
        };
        let ctx = DetectionContext::new(
            Arc::new(doc),
            Arc::new(retrieval),
            Arc::new(AnalysisConfig::default()),
        );
        match SeoAnalyzer.run(&ctx) {
            Ok(SectionData::Seo(seo)) => seo,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_missing_description_is_a_violation() {
        let seo = run("<html><head><title>A reasonably sized title</title></head><body><h1>x</h1></body></html>");
        let missing = seo
            .violations
            .iter()
            .find(|v| v.code == "missing-meta-description")
            .unwrap();
        assert!(missing.message.contains("missing meta description"));
        assert_eq!(missing.severity, Severity::Error);
        assert!(seo.description.is_none());
    }

    #[test]
    fn test_well_formed_page_has_no_violations() {
        let seo = run(
            r#"<html lang="en"><head>
                <title>Example Domain for Docs</title>
                <meta name="description" content="An example page used to illustrate documentation examples safely.">
                <meta name="viewport" content="width=device-width, initial-scale=1">
                <link rel="canonical" href="https://example.com/">
                <meta property="og:title" content="Example">
                <meta property="og:description" content="Example page">
                <meta property="og:image" content="https://example.com/og.png">
                <meta name="twitter:card" content="summary">
            </head><body><h1>Example</h1><h2>Intro</h2><h3>Detail</h3><h2>More</h2><img src="a.png" alt="A"></body></html>"#,
        );
        assert!(seo.violations.is_empty(), "{:?}", seo.violations);
        assert_eq!(seo.open_graph.len(), 3);
        assert_eq!(seo.twitter.get("twitter:card").map(String::as_str), Some("summary"));
        assert_eq!(seo.headings.len(), 4);
    }

    #[test]
    fn test_heading_hierarchy_violations() {
        let seo = run("<h1>One</h1><h3>Skipped</h3><h1>Two</h1><h4>Again</h4><h1>Three</h1><h3>Same skip</h3>");
        assert!(seo.has_violation("multiple-h1"));
        let skips: Vec<&str> = seo
            .violations
            .iter()
            .filter(|v| v.code == "heading-level-skipped")
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(
            skips,
            vec![
                "heading level skipped: h1 followed by h3",
                "heading level skipped: h1 followed by h4",
            ]
        );
    }

    #[test]
    fn test_images_without_alt_and_noindex() {
        let seo = run(r#"<meta name="robots" content="NOINDEX, follow"><img src="a.png"><img src="b.png" alt=""><img src="c.png" alt="C">"#);
        assert_eq!(seo.image_count, 3);
        assert_eq!(seo.images_missing_alt, 2);
        assert!(seo.has_violation("images-missing-alt"));
        assert!(seo.has_violation("noindex"));
    }
}
