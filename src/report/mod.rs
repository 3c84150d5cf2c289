//! 报告模块：分区定义、检测结果、不可变分析报告与聚合器
pub mod aggregator;
pub mod sections;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::StageEvent;
use crate::retriever::{RetrievalResult, RetrievalStrategy};

pub use self::aggregator::ReportAggregator;
pub use self::sections::{
    ComponentEntry, ComponentRole, ComponentsSection, CustomProperty, DesignSection, DetectedTech,
    PerformanceSection, PerformanceTier, SectionData, SeoSection, SeoViolation, Severity,
    SpacingToken, TechStackSection,
};

/// 报告分区
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    TechStack,
    Design,
    Components,
    Seo,
    Performance,
}

impl Section {
    /// 固定顺序
    pub const ALL: [Section; 5] = [
        Section::TechStack,
        Section::Design,
        Section::Components,
        Section::Seo,
        Section::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::TechStack => "techStack",
            Section::Design => "design",
            Section::Components => "components",
            Section::Seo => "seo",
            Section::Performance => "performance",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分区完成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionStatus {
    Complete,
    Partial,
    Failed,
    TimedOut,
    /// 未被调用方选中
    Skipped,
}

impl SectionStatus {
    /// 是否产出了可用数据
    pub fn has_data(&self) -> bool {
        matches!(self, SectionStatus::Complete | SectionStatus::Partial)
    }
}

/// 报告整体状态；检索失败时不产生报告（以 Err 返回）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallStatus {
    Complete,
    Partial,
    InsufficientData,
}

/// 单个检测器的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorOutcome {
    pub section: Section,
    pub status: SectionStatus,
    pub data: Option<SectionData>,
    pub error: Option<String>,
}

impl DetectorOutcome {
    pub fn complete(data: SectionData) -> Self {
        let status = if data.is_degraded() {
            SectionStatus::Partial
        } else {
            SectionStatus::Complete
        };
        Self {
            section: data.section(),
            status,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(section: Section, error: impl Into<String>) -> Self {
        Self {
            section,
            status: SectionStatus::Failed,
            data: None,
            error: Some(error.into()),
        }
    }

    /// 超时：保留已提交的部分结果
    pub fn timed_out(section: Section, partial: Option<SectionData>) -> Self {
        Self {
            section,
            status: SectionStatus::TimedOut,
            data: partial,
            error: Some("detector did not finish before the deadline".to_string()),
        }
    }

    pub fn skipped(section: Section) -> Self {
        Self {
            section,
            status: SectionStatus::Skipped,
            data: None,
            error: None,
        }
    }
}

/// 检索摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSummary {
    pub final_url: String,
    pub strategy_used: RetrievalStrategy,
    pub http_status: u16,
    pub elapsed_ms: u64,
    pub transfer_bytes: u64,
}

impl From<&RetrievalResult> for RetrievalSummary {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            final_url: result.final_url.clone(),
            strategy_used: result.strategy_used.clone(),
            http_status: result.http_status,
            elapsed_ms: result.elapsed_ms,
            transfer_bytes: result.transfer_bytes,
        }
    }
}

/// 最终分析报告（聚合后不可变，仅提供只读访问）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    url: String,
    retrieval: RetrievalSummary,
    tech_stack: TechStackSection,
    design: DesignSection,
    components: ComponentsSection,
    seo: SeoSection,
    performance: PerformanceSection,
    overall_status: OverallStatus,
    section_status: BTreeMap<Section, SectionStatus>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    section_errors: BTreeMap<Section, String>,
    timeline: Vec<StageEvent>,
    generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retrieval(&self) -> &RetrievalSummary {
        &self.retrieval
    }

    pub fn strategy_used(&self) -> &RetrievalStrategy {
        &self.retrieval.strategy_used
    }

    pub fn tech_stack(&self) -> &TechStackSection {
        &self.tech_stack
    }

    pub fn design(&self) -> &DesignSection {
        &self.design
    }

    pub fn components(&self) -> &ComponentsSection {
        &self.components
    }

    pub fn seo(&self) -> &SeoSection {
        &self.seo
    }

    pub fn performance(&self) -> &PerformanceSection {
        &self.performance
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    pub fn section_status(&self) -> &BTreeMap<Section, SectionStatus> {
        &self.section_status
    }

    /// 单个分区状态（所有分区均有记录）
    pub fn status_of(&self, section: Section) -> SectionStatus {
        self.section_status
            .get(&section)
            .copied()
            .unwrap_or(SectionStatus::Skipped)
    }

    pub fn section_errors(&self) -> &BTreeMap<Section, String> {
        &self.section_errors
    }

    pub fn timeline(&self) -> &[StageEvent] {
        &self.timeline
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// 转为 JSON 字符串
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
