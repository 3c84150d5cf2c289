//! 信号分析器：按来源维度匹配技术签名
use rustc_hash::FxHashMap;

use crate::rule::{SignalSource, SignatureTable};
use crate::utils::{DetectionUpdater, TechEvidence, VersionExtractor};

type Detected = FxHashMap<String, TechEvidence>;

/// 用指定来源维度的模式匹配一组输入
fn match_source(table: &SignatureTable, source: SignalSource, inputs: &[&str], detected: &mut Detected) {
    for signature in table.iter() {
        for pattern in signature.patterns.iter().filter(|p| p.source == source) {
            for input in inputs {
                if let Some(captures) = pattern.regex.captures(input) {
                    let version = VersionExtractor::extract(pattern.version, &captures);
                    log::trace!(
                        "[Detect] Signature matched | Tech: {} | Source: {} | Version: {:?}",
                        signature.name,
                        source.label(),
                        version
                    );
                    DetectionUpdater::update(
                        detected,
                        signature.name,
                        pattern.weight,
                        pattern.describe(),
                        version,
                    );
                    // 同一模式只计一次
                    break;
                }
            }
        }
    }
}

/// Script 地址分析器
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn analyze(table: &SignatureTable, script_srcs: &[String], detected: &mut Detected) {
        let inputs: Vec<&str> = script_srcs.iter().map(String::as_str).collect();
        match_source(table, SignalSource::ScriptSrc, &inputs, detected);
    }
}

/// 内联脚本分析器（全局变量标记）
pub struct InlineScriptAnalyzer;

impl InlineScriptAnalyzer {
    pub fn analyze(table: &SignatureTable, scripts: &[String], detected: &mut Detected) {
        let inputs: Vec<&str> = scripts.iter().map(String::as_str).collect();
        match_source(table, SignalSource::InlineScript, &inputs, detected);
    }
}

/// HTML 原文分析器
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn analyze(table: &SignatureTable, markup: &str, detected: &mut Detected) {
        if markup.is_empty() {
            return;
        }
        match_source(table, SignalSource::Html, &[markup], detected);
    }
}

/// Meta generator 分析器
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    pub fn analyze(table: &SignatureTable, generators: &[&str], detected: &mut Detected) {
        match_source(table, SignalSource::MetaGenerator, generators, detected);
    }
}

/// 响应头分析器
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    /// headers 名称需为小写
    pub fn analyze(table: &SignatureTable, headers: &[(String, String)], detected: &mut Detected) {
        for signature in table.iter() {
            for pattern in &signature.patterns {
                let SignalSource::Header(header_name) = pattern.source else {
                    continue;
                };
                let matched = headers
                    .iter()
                    .filter(|(name, _)| name == header_name)
                    .find_map(|(_, value)| pattern.regex.captures(value));
                if let Some(captures) = matched {
                    let version = VersionExtractor::extract(pattern.version, &captures);
                    log::trace!(
                        "[Detect] Header matched | Tech: {} | Header: {} | Version: {:?}",
                        signature.name,
                        header_name,
                        version
                    );
                    DetectionUpdater::update(
                        detected,
                        signature.name,
                        pattern.weight,
                        pattern.describe(),
                        version,
                    );
                }
            }
        }
    }
}
