//! 报告聚合器
//! 把各检测器结果（含失败 / 超时 / 跳过）折叠为一份不可变报告
//! 没有数据的分区填空结构并打上状态标记，绝不省略

use std::collections::BTreeMap;

use chrono::Utc;

use super::{
    AnalysisReport, DetectorOutcome, OverallStatus, RetrievalSummary, Section, SectionData,
    SectionStatus,
};
use crate::orchestrator::StageEvent;
use crate::retriever::RetrievalResult;

pub struct ReportAggregator;

impl ReportAggregator {
    /// 聚合检测结果
    /// - outcomes：每个分区至多一条；缺失的分区记为 skipped
    pub fn aggregate(
        url: &str,
        retrieval: &RetrievalResult,
        outcomes: Vec<DetectorOutcome>,
        timeline: Vec<StageEvent>,
    ) -> AnalysisReport {
        let mut section_status = BTreeMap::new();
        let mut section_errors = BTreeMap::new();
        let mut data: BTreeMap<Section, SectionData> = BTreeMap::new();

        for outcome in outcomes {
            if section_status.contains_key(&outcome.section) {
                log::warn!(
                    "[Aggregate] Duplicate outcome for section {} ignored",
                    outcome.section
                );
                continue;
            }
            // 数据与分区不符时按空结构处理
            if let Some(section_data) = outcome.data {
                if section_data.section() == outcome.section {
                    data.insert(outcome.section, section_data);
                } else {
                    log::warn!(
                        "[Aggregate] Section {} produced {} data, discarded",
                        outcome.section,
                        section_data.section()
                    );
                }
            }
            if let Some(error) = outcome.error {
                section_errors.insert(outcome.section, error);
            }
            section_status.insert(outcome.section, outcome.status);
        }

        for section in Section::ALL {
            section_status.entry(section).or_insert(SectionStatus::Skipped);
        }

        let overall_status = Self::overall_status(&section_status);
        log::info!(
            "[Aggregate] Report ready for {} | Overall: {:?} | Sections: {}",
            url,
            overall_status,
            section_status
                .iter()
                .map(|(s, st)| format!("{}={:?}", s, st))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut report = AnalysisReport {
            url: url.to_string(),
            retrieval: RetrievalSummary::from(retrieval),
            tech_stack: Default::default(),
            design: Default::default(),
            components: Default::default(),
            seo: Default::default(),
            performance: Default::default(),
            overall_status,
            section_status,
            section_errors,
            timeline,
            generated_at: Utc::now(),
        };

        for (_, section_data) in data {
            match section_data {
                SectionData::TechStack(v) => report.tech_stack = v,
                SectionData::Design(v) => report.design = v,
                SectionData::Components(v) => report.components = v,
                SectionData::Seo(v) => report.seo = v,
                SectionData::Performance(v) => report.performance = v,
            }
        }

        report
    }

    /// 整体状态
    /// - 被选中分区全部 complete → complete
    /// - 无任何被选中分区产出数据 → insufficientData
    /// - 其余 → partial
    pub fn overall_status(section_status: &BTreeMap<Section, SectionStatus>) -> OverallStatus {
        let selected: Vec<SectionStatus> = section_status
            .values()
            .copied()
            .filter(|s| *s != SectionStatus::Skipped)
            .collect();

        if selected.is_empty() || !selected.iter().any(SectionStatus::has_data) {
            OverallStatus::InsufficientData
        } else if selected.iter().all(|s| *s == SectionStatus::Complete) {
            OverallStatus::Complete
        } else {
            OverallStatus::Partial
        }
    }
}
