//! 技术栈检测器
//! 匹配脚本地址、内联脚本全局变量、HTML 特征、meta generator 与（直连时）响应头
use super::analyzer::{HeaderAnalyzer, HtmlAnalyzer, InlineScriptAnalyzer, MetaAnalyzer, ScriptAnalyzer};
use super::{DetectionContext, Detector};
use crate::error::DetectorFailure;
use crate::report::{DetectedTech, Section, SectionData, TechStackSection};
use crate::rule::SignatureTable;
use crate::utils::DetectionUpdater;

pub struct TechStackDetector;

impl Detector for TechStackDetector {
    fn name(&self) -> &'static str {
        "tech-stack"
    }

    fn section(&self) -> Section {
        Section::TechStack
    }

    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure> {
        let table = SignatureTable::builtin();
        let doc = ctx.document();
        let mut detected = Default::default();

        ScriptAnalyzer::analyze(table, doc.scripts(), &mut detected);
        ctx.checkpoint()?;
        InlineScriptAnalyzer::analyze(table, doc.inline_scripts(), &mut detected);
        ctx.checkpoint()?;
        HtmlAnalyzer::analyze(table, doc.markup(), &mut detected);
        ctx.checkpoint()?;

        let generators: Vec<&str> = doc
            .meta_tags()
            .iter()
            .filter(|m| m.name == "generator")
            .map(|m| m.content.as_str())
            .collect();
        MetaAnalyzer::analyze(table, &generators, &mut detected);

        // 中继返回的响应头属于中继自身，不代表目标站点
        let retrieval = ctx.retrieval();
        if !retrieval.strategy_used.is_relay() {
            HeaderAnalyzer::analyze(table, &retrieval.headers, &mut detected);
        }
        ctx.checkpoint()?;

        let implied = DetectionUpdater::apply_implies(table, &detected);

        let mut technologies: Vec<DetectedTech> = detected
            .into_iter()
            .filter_map(|(name, evidence)| {
                let signature = table.get(&name)?;
                Some(DetectedTech {
                    category: signature.category.to_string(),
                    confidence: evidence.confidence(),
                    version: evidence.version,
                    signals: evidence.signals,
                    implied_by: Vec::new(),
                    name,
                })
            })
            .chain(implied.into_iter().filter_map(|(name, imp)| {
                let signature = table.get(&name)?;
                Some(DetectedTech {
                    category: signature.category.to_string(),
                    confidence: imp.confidence,
                    version: None,
                    signals: Vec::new(),
                    implied_by: imp.implied_by,
                    name,
                })
            }))
            .collect();

        technologies.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.name.cmp(&b.name))
        });

        log::debug!(
            "[Detect] Tech stack resolved | Technologies: {}",
            technologies
                .iter()
                .map(|t| format!("{}({})", t.name, t.confidence))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(SectionData::TechStack(TechStackSection { technologies }))
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

    fn run(html: &str, strategy: RetrievalStrategy, headers: Vec<(String, String)>) -> TechStackSection {
        let base = Url::parse("https://example.com/").unwrap();
        let doc = MarkupParser::parse(html.as_bytes(), &base, 1 << 20);
        let retrieval = RetrievalResult {
            final_url: base.to_string(),
            body: html.as_bytes().to_vec(),
            strategy_used: strategy,
            http_status: 200,
            elapsed_ms: 10,
            headers,
            content_type: None,
            transfer_bytes: html.len() as u64,
        };
        let ctx = DetectionContext::new(
            Arc::new(doc),
            Arc::new(retrieval),
            Arc::new(AnalysisConfig::default()),
        );
        match TechStackDetector.run(&ctx) {
            Ok(SectionData::TechStack(section)) => section,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_next_js_implies_react_and_node() {
        let html = r#"<html><head>
            <script src="/_next/static/chunks/main-abc.js"></script>
            </head><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#;
        let section = run(html, RetrievalStrategy::Direct, Vec::new());

        let names: Vec<&str> = section.technologies.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names[0], "Next.js");
        let next = &section.technologies[0];
        assert_eq!(next.confidence, 100);
        assert_eq!(next.signals.len(), 2);

        let react = section.technologies.iter().find(|t| t.name == "React").unwrap();
        assert_eq!(react.implied_by, vec!["Next.js".to_string()]);
        assert_eq!(react.confidence, 95);
        assert!(names.contains(&"Node.js"));
    }

    #[test]
    fn test_empty_document_is_complete_with_no_technologies() {
        let section = run("<html><body><p>plain</p></body></html>", RetrievalStrategy::Direct, Vec::new());
        assert!(section.technologies.is_empty());
    }

    #[test]
    fn test_relay_headers_are_ignored() {
        let headers = vec![("server".to_string(), "cloudflare".to_string())];
        let relayed = run(
            "<html></html>",
            RetrievalStrategy::Relay { name: "r".into() },
            headers.clone(),
        );
        assert!(relayed.technologies.is_empty());

        let direct = run("<html></html>", RetrievalStrategy::Direct, headers);
        assert_eq!(direct.technologies[0].name, "Cloudflare");
    }

    #[test]
    fn test_sorted_by_confidence_then_name() {
        let html = r#"<script src="https://cdn.example.com/jquery-3.6.0.min.js"></script>
            <script src="https://unpkg.com/lodash@4.17.21/lodash.min.js"></script>
            <link rel="stylesheet" href="https://cdn.example.com/bootstrap@5.3.2/dist/css/bootstrap.min.css">"#;
        let section = run(html, RetrievalStrategy::Direct, Vec::new());
        let ranked: Vec<(&str, u8)> = section
            .technologies
            .iter()
            .map(|t| (t.name.as_str(), t.confidence))
            .collect();
        assert_eq!(ranked, vec![("jQuery", 90), ("Bootstrap", 85), ("Lodash", 85)]);
        assert_eq!(section.technologies[0].version.as_deref(), Some("3.6.0"));
        assert_eq!(section.technologies[1].version.as_deref(), Some("5.3.2"));
    }
}
