//! 设计令牌提取器
//! 扫描 `<style>` 块、外链样式表与内联 style 属性，提取颜色 / 字体 / 间距 / 断点 / 自定义属性
//! 各子提取相互独立：断点解析遇到畸形 @media 时只清空该字段并记入 errors，分区整体降级为 partial
use std::collections::hash_map::Entry;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{DetectionContext, Detector};
use crate::error::DetectorFailure;
use crate::report::{CustomProperty, DesignSection, Section, SectionData, SpacingToken};

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([0-9a-fA-F]{3,8})\b").unwrap());
static RGB_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\brgba?\(\s*([^)]*)\)").unwrap());
static SPACING_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)(?:px|rem|em|%|vh|vw|ch|pt)?$").unwrap());
static MEDIA_WIDTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(?:min|max)-width\s*:\s*|\bwidth\s*(?:>=|<=|>|<)\s*)(\d+(?:\.\d+)?)(px|em|rem)?").unwrap()
});

/// 根字号，用于 em / rem 断点换算
const ROOT_FONT_PX: f64 = 16.0;

/// CSS 声明
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    property: String,
    value: String,
}

/// 扫描结果：平铺的声明列表与 @media 前导
#[derive(Debug, Default)]
struct CssSheet {
    declarations: Vec<Declaration>,
    media_queries: Vec<String>,
}

/// 容错 CSS 扫描器
/// `{` 之前的片段视为前导（选择器 / @规则），`;` 或 `}` 之前的片段视为声明
struct CssScanner;

impl CssScanner {
    fn scan(text: &str, sheet: &mut CssSheet) {
        let text = Self::strip_comments(text);
        let mut buffer = String::new();
        let mut quote: Option<char> = None;

        for ch in text.chars() {
            if let Some(q) = quote {
                buffer.push(ch);
                if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    buffer.push(ch);
                }
                '{' => {
                    let prelude = buffer.trim();
                    if let Some(query) = prelude
                        .get(..6)
                        .filter(|head| head.eq_ignore_ascii_case("@media"))
                        .and_then(|_| prelude.get(6..))
                    {
                        sheet.media_queries.push(query.trim().to_string());
                    }
                    buffer.clear();
                }
                ';' | '}' => {
                    Self::push_declaration(&buffer, sheet);
                    buffer.clear();
                }
                _ => buffer.push(ch),
            }
        }
        Self::push_declaration(&buffer, sheet);
    }

    fn push_declaration(segment: &str, sheet: &mut CssSheet) {
        let Some((property, value)) = segment.split_once(':') else {
            return;
        };
        let property = property.trim();
        let value = value.trim().trim_end_matches("!important").trim();
        if property.is_empty() || value.is_empty() || property.contains(char::is_whitespace) {
            return;
        }
        // 自定义属性名大小写敏感
        let property = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };
        sheet.declarations.push(Declaration {
            property,
            value: value.to_string(),
        });
    }

    fn strip_comments(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("/*") {
            out.push_str(&rest[..start]);
            match rest[start + 2..].find("*/") {
                Some(end) => rest = &rest[start + 2 + end + 2..],
                // 未闭合注释吞掉余下内容
                None => return out,
            }
        }
        out.push_str(rest);
        out
    }
}

pub struct DesignSystemExtractor;

impl Detector for DesignSystemExtractor {
    fn name(&self) -> &'static str {
        "design-system"
    }

    fn section(&self) -> Section {
        Section::Design
    }

    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure> {
        let doc = ctx.document();
        let config = ctx.config();

        let mut sheet = CssSheet::default();
        for text in doc.stylesheet_texts() {
            CssScanner::scan(text, &mut sheet);
            ctx.checkpoint()?;
        }
        for inline in doc.inline_styles() {
            CssScanner::scan(inline, &mut sheet);
        }
        ctx.checkpoint()?;

        let mut design = DesignSection {
            colors: extract_colors(&sheet.declarations),
            ..DesignSection::default()
        };
        ctx.commit(SectionData::Design(design.clone()));
        ctx.checkpoint()?;

        design.fonts = extract_fonts(&sheet.declarations);
        design.spacing = extract_spacing(&sheet.declarations, config.max_spacing_tokens);
        ctx.commit(SectionData::Design(design.clone()));
        ctx.checkpoint()?;

        match extract_breakpoints(&sheet.media_queries) {
            Ok(breakpoints) => design.breakpoints = breakpoints,
            Err(e) => design.errors.push(format!("breakpoints: {}", e)),
        }
        design.custom_properties = extract_custom_properties(&sheet.declarations, config.max_custom_properties);

        log::debug!(
            "[Detect] Design tokens | Declarations: {} | Colors: {} | Fonts: {} | Spacing: {} | Breakpoints: {} | Errors: {}",
            sheet.declarations.len(),
            design.colors.len(),
            design.fonts.len(),
            design.spacing.len(),
            design.breakpoints.len(),
            design.errors.len()
        );

        Ok(SectionData::Design(design))
    }
}

// ===================== 颜色 =====================

fn extract_colors(declarations: &[Declaration]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut colors = Vec::new();

    for decl in declarations {
        // 按出现位置合并两类字面量，保持首次出现顺序
        let mut found: Vec<(usize, String)> = HEX_COLOR_RE
            .captures_iter(&decl.value)
            .filter_map(|c| {
                let m = c.get(0)?;
                normalize_hex(c.get(1)?.as_str()).map(|color| (m.start(), color))
            })
            .collect();
        found.extend(RGB_COLOR_RE.captures_iter(&decl.value).filter_map(|c| {
            let m = c.get(0)?;
            normalize_rgb(c.get(1)?.as_str()).map(|color| (m.start(), color))
        }));
        found.sort_by_key(|(pos, _)| *pos);

        for (_, color) in found {
            if seen.insert(color.clone()) {
                colors.push(color);
            }
        }
    }
    colors
}

/// 十六进制颜色规范化：#rgb / #rgba / #rrggbb / #rrggbbaa
fn normalize_hex(hex: &str) -> Option<String> {
    let expand = |s: &str| -> String { s.chars().flat_map(|c| [c, c]).collect() };
    let full = match hex.len() {
        3 | 4 => expand(hex),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&full[i..i + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    let alpha = if full.len() == 8 {
        channel(6)? as f64 / 255.0
    } else {
        1.0
    };
    Some(canonical_color(r, g, b, alpha))
}

/// rgb() / rgba() 规范化，兼容逗号与空格 / 斜杠两种语法
fn normalize_rgb(args: &str) -> Option<String> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |s: &str| -> Option<u8> {
        let value = match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? * 255.0 / 100.0,
            None => s.parse::<f64>().ok()?,
        };
        if !value.is_finite() {
            return None;
        }
        Some(value.round().clamp(0.0, 255.0) as u8)
    };
    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;

    let alpha = match parts.get(3) {
        Some(a) => match a.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? / 100.0,
            None => a.parse::<f64>().ok()?,
        },
        None => 1.0,
    };
    if !alpha.is_finite() {
        return None;
    }
    Some(canonical_color(r, g, b, alpha.clamp(0.0, 1.0)))
}

/// 不透明色统一为 #rrggbb，半透明统一为 rgba(r, g, b, a)
fn canonical_color(r: u8, g: u8, b: u8, alpha: f64) -> String {
    let alpha = (alpha * 1000.0).round() / 1000.0;
    if alpha >= 1.0 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        let a = format!("{:.3}", alpha);
        let a = a.trim_end_matches('0').trim_end_matches('.');
        format!("rgba({}, {}, {}, {})", r, g, b, if a.is_empty() { "0" } else { a })
    }
}

// ===================== 字体 =====================

const CSS_WIDE_KEYWORDS: [&str; 5] = ["inherit", "initial", "unset", "revert", "revert-layer"];

fn extract_fonts(declarations: &[Declaration]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut fonts = Vec::new();

    for decl in declarations.iter().filter(|d| d.property == "font-family") {
        for family in decl.value.split(',') {
            let family = family.trim().trim_matches(|c| c == '"' || c == '\'').trim();
            if family.is_empty()
                || family.starts_with("var(")
                || CSS_WIDE_KEYWORDS.iter().any(|k| family.eq_ignore_ascii_case(k))
            {
                continue;
            }
            if seen.insert(family.to_ascii_lowercase()) {
                fonts.push(family.to_string());
            }
        }
    }
    fonts
}

// ===================== 间距 =====================

fn is_spacing_property(property: &str) -> bool {
    property == "margin"
        || property == "padding"
        || property.starts_with("margin-")
        || property.starts_with("padding-")
        || matches!(property, "gap" | "row-gap" | "column-gap" | "grid-gap")
}

fn extract_spacing(declarations: &[Declaration], cap: usize) -> Vec<SpacingToken> {
    // 值 → (频次, 首次出现序号)
    let mut counts: FxHashMap<String, (usize, usize)> = FxHashMap::default();

    for decl in declarations.iter().filter(|d| is_spacing_property(&d.property)) {
        for token in decl.value.split_whitespace() {
            let token = token.to_ascii_lowercase();
            if !SPACING_VALUE_RE.is_match(&token) || token.trim_start_matches('-').trim_start_matches('0').is_empty() {
                continue;
            }
            let order = counts.len();
            match counts.entry(token) {
                Entry::Occupied(mut e) => e.get_mut().0 += 1,
                Entry::Vacant(e) => {
                    e.insert((1, order));
                }
            }
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(cap)
        .map(|(value, (count, _))| SpacingToken { value, count })
        .collect()
}

// ===================== 断点 =====================

fn extract_breakpoints(media_queries: &[String]) -> Result<Vec<u32>, String> {
    let mut breakpoints = Vec::new();

    for query in media_queries {
        let mut depth: i32 = 0;
        for ch in query.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                break;
            }
        }
        if depth != 0 {
            return Err(format!("malformed media query '{}'", query));
        }

        for caps in MEDIA_WIDTH_RE.captures_iter(query) {
            let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) else {
                continue;
            };
            let px = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                Some(unit) if unit == "em" || unit == "rem" => value * ROOT_FONT_PX,
                _ => value,
            };
            if px > 0.0 && px < u32::MAX as f64 {
                breakpoints.push(px.round() as u32);
            }
        }
    }

    breakpoints.sort_unstable();
    breakpoints.dedup();
    Ok(breakpoints)
}

// ===================== 自定义属性 =====================

fn extract_custom_properties(declarations: &[Declaration], cap: usize) -> Vec<CustomProperty> {
    let mut seen = FxHashSet::default();
    let mut props = Vec::new();
    for decl in declarations.iter().filter(|d| d.property.starts_with("--")) {
        if props.len() >= cap {
            break;
        }
        if seen.insert(decl.property.as_str()) {
            props.push(CustomProperty {
                name: decl.property.clone(),
                value: decl.value.clone(),
            });
        }
    }
    props
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::parser::MarkupParser;
    use crate::retriever::{RetrievalResult, RetrievalStrategy};

    fn run(html: &str) -> DesignSection {
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
        let config = AnalysisConfig::builder().max_spacing_tokens(3).build();
        let ctx = DetectionContext::new(Arc::new(doc), Arc::new(retrieval), Arc::new(config));
        match DesignSystemExtractor.run(&ctx) {
            Ok(SectionData::Design(design)) => design,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_equivalent_colors_collapse_to_one_entry() {
        let design = run(
            "<style>a { color: #FFAAFF; } b { color: #ffaaff } i { background: rgba(255,170,255,1) }</style>",
        );
        assert_eq!(design.colors, vec!["#ffaaff".to_string()]);
    }

    #[test]
    fn test_color_normalization_forms() {
        assert_eq!(normalize_hex("FA0").as_deref(), Some("#ffaa00"));
        assert_eq!(normalize_hex("ffaaff80").as_deref(), Some("rgba(255, 170, 255, 0.502)"));
        assert_eq!(normalize_hex("ffaaffff").as_deref(), Some("#ffaaff"));
        assert_eq!(normalize_hex("abcde"), None);
        assert_eq!(normalize_rgb("0 128 255 / 50%").as_deref(), Some("rgba(0, 128, 255, 0.5)"));
        assert_eq!(normalize_rgb("100%, 0%, 0%").as_deref(), Some("#ff0000"));
        assert_eq!(normalize_rgb("1, 2"), None);
    }

    #[test]
    fn test_non_finite_rgb_values_are_rejected() {
        assert_eq!(normalize_rgb("1, 2, 3, NaN"), None);
        assert_eq!(normalize_rgb("inf, 0, 0"), None);
        assert_eq!(normalize_rgb("0, -infinity, 0"), None);
        assert_eq!(normalize_rgb("1e400, 0, 0"), None);
        assert_eq!(normalize_rgb("0 0 0 / NaN%"), None);
        assert_eq!(normalize_rgb("1, 2, 3, 1").as_deref(), Some("#010203"));
    }

    #[test]
    fn test_fonts_dedupe_in_first_seen_order() {
        let design = run(
            r#"<style>body { font-family: "Inter", Arial, sans-serif; } h1 { font-family: arial, 'Playfair Display'; } p { font-family: inherit }</style>"#,
        );
        assert_eq!(design.fonts, vec!["Inter", "Arial", "sans-serif", "Playfair Display"]);
    }

    #[test]
    fn test_spacing_ranked_by_frequency_and_capped() {
        let design = run(
            r#"<style>a { margin: 8px 16px; } b { padding: 8px; gap: 4px } c { margin-top: 16px; padding: 0 8px } d { padding-left: 2rem }</style>"#,
        );
        let values: Vec<(&str, usize)> = design.spacing.iter().map(|t| (t.value.as_str(), t.count)).collect();
        assert_eq!(values, vec![("8px", 3), ("16px", 2), ("4px", 1)]);
    }

    #[test]
    fn test_breakpoints_from_media_queries() {
        let design = run(
            "<style>@media (min-width: 768px) { a { color: red } } @media screen and (max-width: 64em) { b { color: blue } } @media (width >= 1280px) {}</style>",
        );
        assert_eq!(design.breakpoints, vec![768, 1024, 1280]);
        assert!(design.errors.is_empty());
    }

    #[test]
    fn test_malformed_media_query_only_empties_breakpoints() {
        let design = run(
            "<style>@media (min-width: 768px { a { color: #000 } } @media (max-width: 480px) { b { margin: 12px } }</style>",
        );
        assert!(design.breakpoints.is_empty());
        assert_eq!(design.errors.len(), 1);
        assert!(design.errors[0].starts_with("breakpoints"));
        assert_eq!(design.colors, vec!["#000000".to_string()]);
        assert_eq!(design.spacing[0].value, "12px");
    }

    #[test]
    fn test_inline_styles_and_custom_properties() {
        let design = run(
            r#"<style>:root { --brand: #0af; --Space-1: 4px; --brand: #000 }</style><div style="color: rgb(10, 20, 30); margin: 2px"></div>"#,
        );
        assert_eq!(design.colors, vec!["#00aaff", "#000000", "#0a141e"]);
        let names: Vec<&str> = design.custom_properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["--brand", "--Space-1"]);
        assert_eq!(design.spacing[0].value, "2px");
    }
}
