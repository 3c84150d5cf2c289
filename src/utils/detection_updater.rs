//! 检测结果更新工具
//! 同一技术的多条弱信号合并为一个带上限的置信度，而非累加

use std::collections::hash_map::Entry;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::rule::SignatureTable;

/// 单条信号的合并增益
const BOOST_PER_MATCH: u16 = 10;
/// 推导技术：置信度上限与每个额外来源的增益
const MAX_IMPLY_CONF: u16 = 95;
const BOOST_PER_SOURCE: u16 = 3;

/// 单个技术的累计证据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechEvidence {
    /// 最强单条信号权重
    pub strongest: u8,
    /// 命中的不同模式（按描述去重，保持首次出现顺序）
    pub signals: Vec<String>,
    pub version: Option<String>,
}

impl TechEvidence {
    /// 合并置信度：min(100, strongest + 10 × (distinct_matches − 1))
    pub fn confidence(&self) -> u8 {
        let extra = self.signals.len().saturating_sub(1) as u16;
        (self.strongest as u16 + BOOST_PER_MATCH * extra).min(100) as u8
    }
}

/// 推导得到的技术
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpliedTech {
    pub confidence: u8,
    /// 来源技术名（已排序）
    pub implied_by: Vec<String>,
}

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 记录一条命中信号
    /// 同一模式重复命中只算一次；版本取更优者
    pub fn update(
        detected: &mut FxHashMap<String, TechEvidence>,
        tech_name: &str,
        weight: u8,
        signal: String,
        version: Option<String>,
    ) {
        let evidence = match detected.entry(tech_name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(TechEvidence::default()),
        };

        if !evidence.signals.contains(&signal) {
            evidence.signals.push(signal);
        }
        if weight > evidence.strongest {
            evidence.strongest = weight;
        }
        if Self::is_new_version_better(&version, &evidence.version) {
            evidence.version = version;
        }
    }

    /// 根据 implies 关系推导技术
    /// 返回值：推导技术名 → 推导结果；已被直接命中的技术不会出现在结果中
    pub fn apply_implies(
        table: &SignatureTable,
        detected: &FxHashMap<String, TechEvidence>,
    ) -> FxHashMap<String, ImpliedTech> {
        // 推导技术名 → (来源集合, 最强来源置信度)
        let mut sources: FxHashMap<&str, (FxHashSet<&str>, u8)> = FxHashMap::default();

        for (source_name, evidence) in detected {
            let Some(signature) = table.get(source_name) else {
                continue;
            };
            for &target in signature.implies {
                if detected.contains_key(target) || table.get(target).is_none() {
                    continue;
                }
                let slot = sources.entry(target).or_default();
                slot.0.insert(source_name.as_str());
                slot.1 = slot.1.max(evidence.confidence());
            }
        }

        // 推导链只展开一层：被推导的技术若也有 implies，从其最强来源继续向下推导
        let mut second_hop: FxHashMap<&str, (FxHashSet<&str>, u8)> = FxHashMap::default();
        for (&target, (_, conf)) in &sources {
            if let Some(signature) = table.get(target) {
                for &next in signature.implies {
                    if detected.contains_key(next) || sources.contains_key(next) || table.get(next).is_none() {
                        continue;
                    }
                    let slot = second_hop.entry(next).or_default();
                    slot.0.insert(target);
                    slot.1 = slot.1.max(*conf);
                }
            }
        }
        sources.extend(second_hop);

        sources
            .into_iter()
            .map(|(target, (source_set, strongest))| {
                let extra = source_set.len().saturating_sub(1) as u16;
                let confidence = (strongest as u16 + BOOST_PER_SOURCE * extra).min(MAX_IMPLY_CONF) as u8;
                let mut implied_by: Vec<String> = source_set.into_iter().map(str::to_string).collect();
                implied_by.sort_unstable();
                (
                    target.to_string(),
                    ImpliedTech {
                        confidence,
                        implied_by,
                    },
                )
            })
            .collect()
    }

    /// 辅助函数：判断新版本是否比旧版本更优（更具体者优先）
    fn is_new_version_better(new_version: &Option<String>, old_version: &Option<String>) -> bool {
        match (new_version, old_version) {
            (Some(_), None) => true,
            (Some(new_ver), Some(old_ver)) => new_ver.len() > old_ver.len(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_signals_are_capped_not_summed() {
        let mut detected = FxHashMap::default();
        DetectionUpdater::update(&mut detected, "jQuery", 50, "a".into(), None);
        assert_eq!(detected["jQuery"].confidence(), 50);

        DetectionUpdater::update(&mut detected, "jQuery", 40, "b".into(), None);
        DetectionUpdater::update(&mut detected, "jQuery", 30, "c".into(), None);
        assert_eq!(detected["jQuery"].confidence(), 70);

        // 同一模式重复命中不增益
        DetectionUpdater::update(&mut detected, "jQuery", 30, "c".into(), None);
        assert_eq!(detected["jQuery"].confidence(), 70);

        for i in 0..10 {
            DetectionUpdater::update(&mut detected, "jQuery", 90, format!("s{}", i), None);
        }
        assert_eq!(detected["jQuery"].confidence(), 100);
    }

    #[test]
    fn test_version_prefers_more_specific() {
        let mut detected = FxHashMap::default();
        DetectionUpdater::update(&mut detected, "Nginx", 95, "a".into(), Some("1.2".into()));
        DetectionUpdater::update(&mut detected, "Nginx", 95, "b".into(), None);
        DetectionUpdater::update(&mut detected, "Nginx", 95, "c".into(), Some("1.25.3".into()));
        assert_eq!(detected["Nginx"].version.as_deref(), Some("1.25.3"));
    }

    #[test]
    fn test_implies_do_not_override_direct_match() {
        let table = SignatureTable::builtin();
        let mut detected = FxHashMap::default();
        DetectionUpdater::update(&mut detected, "Next.js", 95, "a".into(), None);
        DetectionUpdater::update(&mut detected, "React", 80, "b".into(), None);

        let implied = DetectionUpdater::apply_implies(table, &detected);
        assert!(!implied.contains_key("React"));
        let node = &implied["Node.js"];
        assert_eq!(node.implied_by, vec!["Next.js".to_string()]);
        assert_eq!(node.confidence, 95);
    }

    #[test]
    fn test_implied_confidence_boost_per_source() {
        let table = SignatureTable::builtin();
        let mut detected = FxHashMap::default();
        DetectionUpdater::update(&mut detected, "Drupal", 85, "a".into(), None);
        DetectionUpdater::update(&mut detected, "Joomla", 80, "b".into(), None);

        let implied = DetectionUpdater::apply_implies(table, &detected);
        let php = &implied["PHP"];
        assert_eq!(php.implied_by, vec!["Drupal".to_string(), "Joomla".to_string()]);
        assert_eq!(php.confidence, 88);
    }

    #[test]
    fn test_implies_follow_one_extra_hop() {
        let table = SignatureTable::builtin();
        let mut detected = FxHashMap::default();
        DetectionUpdater::update(&mut detected, "WooCommerce", 90, "a".into(), None);

        let implied = DetectionUpdater::apply_implies(table, &detected);
        assert_eq!(implied["WordPress"].implied_by, vec!["WooCommerce".to_string()]);
        assert_eq!(implied["PHP"].implied_by, vec!["WordPress".to_string()]);
        assert!(implied.contains_key("MySQL"));
    }
}
