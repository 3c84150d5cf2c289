//! 工具模块：版本提取、检测结果合并、日志预览
pub mod detection_updater;
pub mod preview;
pub mod version_extractor;

pub use self::detection_updater::{DetectionUpdater, ImpliedTech, TechEvidence};
pub use self::preview::{normalize_label, preview_compact};
pub use self::version_extractor::VersionExtractor;
