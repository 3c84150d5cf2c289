//! 技术签名模型与编译
//! 签名定义为静态表（名称 → 匹配模式列表），首次使用时编译为正则
//! 单条模式编译失败只跳过该模式，不影响整张表

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::builtin::BUILTIN_SIGNATURES;

/// 信号来源维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalSource {
    /// `<script src>` 绝对地址
    ScriptSrc,
    /// 内联脚本文本（全局变量标记）
    InlineScript,
    /// 原始标记文本（属性 / 注释 / 目录特征）
    Html,
    /// `<meta name="generator">`
    MetaGenerator,
    /// 响应头（仅直连时可信）
    Header(&'static str),
}

impl SignalSource {
    pub fn label(&self) -> &'static str {
        match self {
            SignalSource::ScriptSrc => "script",
            SignalSource::InlineScript => "inline-script",
            SignalSource::Html => "html",
            SignalSource::MetaGenerator => "meta-generator",
            SignalSource::Header(name) => name,
        }
    }
}

/// 原始模式定义
#[derive(Debug, Clone, Copy)]
pub struct PatternDef {
    pub source: SignalSource,
    pub pattern: &'static str,
    /// 单条信号的置信度权重（0-100）
    pub weight: u8,
    /// 版本模板（\1 / $1）
    pub version: Option<&'static str>,
}

/// 原始签名定义
#[derive(Debug, Clone, Copy)]
pub struct SignatureDef {
    pub name: &'static str,
    pub category: &'static str,
    pub implies: &'static [&'static str],
    pub patterns: &'static [PatternDef],
}

/// 编译后的模式
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: SignalSource,
    pub regex: Regex,
    pub weight: u8,
    pub version: Option<&'static str>,
}

impl CompiledPattern {
    /// 匹配描述，用于证据列表与日志
    pub fn describe(&self) -> String {
        format!("{}:{}", self.source.label(), self.regex.as_str())
    }
}

/// 编译后的技术签名
#[derive(Debug, Clone)]
pub struct TechSignature {
    pub name: &'static str,
    pub category: &'static str,
    pub implies: &'static [&'static str],
    pub patterns: Vec<CompiledPattern>,
}

/// 签名表
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    signatures: Vec<TechSignature>,
    by_name: FxHashMap<&'static str, usize>,
}

static BUILTIN_TABLE: Lazy<SignatureTable> = Lazy::new(|| {
    let table = SignatureTable::compile(BUILTIN_SIGNATURES);
    log::debug!(
        "Built-in signature table compiled | Technologies: {} | Patterns: {}",
        table.len(),
        table.pattern_count()
    );
    table
});

impl SignatureTable {
    /// 内置签名表（进程内仅编译一次）
    pub fn builtin() -> &'static SignatureTable {
        &BUILTIN_TABLE
    }

    /// 编译签名定义，非法正则记录警告后跳过
    pub fn compile(defs: &[SignatureDef]) -> Self {
        let mut signatures = Vec::with_capacity(defs.len());
        let mut by_name = FxHashMap::default();

        for def in defs {
            let patterns: Vec<CompiledPattern> = def
                .patterns
                .iter()
                .filter_map(|p| {
                    RegexBuilder::new(p.pattern)
                        .case_insensitive(true)
                        .size_limit(1 << 20)
                        .build()
                        .map_err(|e| {
                            log::warn!(
                                "Skipping invalid signature pattern | Tech: {} | Pattern: {} | Error: {}",
                                def.name,
                                p.pattern,
                                e
                            )
                        })
                        .ok()
                        .map(|regex| CompiledPattern {
                            source: p.source,
                            regex,
                            weight: p.weight.min(100),
                            version: p.version,
                        })
                })
                .collect();

            if by_name.contains_key(def.name) {
                log::warn!("Duplicate signature definition ignored: {}", def.name);
                continue;
            }
            by_name.insert(def.name, signatures.len());
            signatures.push(TechSignature {
                name: def.name,
                category: def.category,
                implies: def.implies,
                patterns,
            });
        }

        Self {
            signatures,
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<&TechSignature> {
        self.by_name.get(name).map(|&idx| &self.signatures[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechSignature> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.signatures.iter().map(|s| s.patterns.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_compiles_every_pattern() {
        let table = SignatureTable::builtin();
        let defined: usize = BUILTIN_SIGNATURES.iter().map(|d| d.patterns.len()).sum();
        assert_eq!(table.pattern_count(), defined);
        assert!(table.get("React").is_some());
    }

    #[test]
    fn test_builtin_implies_reference_known_technologies() {
        let table = SignatureTable::builtin();
        for sig in table.iter() {
            for implied in sig.implies {
                assert!(table.get(implied).is_some(), "{} implies unknown {}", sig.name, implied);
            }
        }
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        const BROKEN: &[SignatureDef] = &[SignatureDef {
            name: "Broken",
            category: "Test",
            implies: &[],
            patterns: &[
                PatternDef {
                    source: SignalSource::Html,
                    pattern: "(unclosed",
                    weight: 50,
                    version: None,
                },
                PatternDef {
                    source: SignalSource::Html,
                    pattern: "broken-marker",
                    weight: 50,
                    version: None,
                },
            ],
        }];
        let table = SignatureTable::compile(BROKEN);
        assert_eq!(table.len(), 1);
        assert_eq!(table.pattern_count(), 1);
    }
}
