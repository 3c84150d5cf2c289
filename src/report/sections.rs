//! 报告分区数据结构
//! 每个分区都有明确的空结构（Default），检测失败时以空结构 + 状态标记占位

use std::collections::BTreeMap;

use serde::Serialize;

use super::Section;
use crate::parser::Heading;

// ===================== 技术栈 =====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStackSection {
    /// 按置信度降序、名称升序
    pub technologies: Vec<DetectedTech>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedTech {
    pub name: String,
    pub category: String,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 命中的信号描述
    pub signals: Vec<String>,
    /// 推导来源；直接命中时为空
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub implied_by: Vec<String>,
}

// ===================== 设计令牌 =====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSection {
    /// 规范化颜色（#rrggbb 或 rgba(r, g, b, a)），首次出现顺序
    pub colors: Vec<String>,
    /// 字体族，首次出现顺序
    pub fonts: Vec<String>,
    /// 间距值，按出现频次降序
    pub spacing: Vec<SpacingToken>,
    /// 断点宽度（px），升序
    pub breakpoints: Vec<u32>,
    pub custom_properties: Vec<CustomProperty>,
    /// 失败的子提取项
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingToken {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProperty {
    pub name: String,
    pub value: String,
}

// ===================== 组件 =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentRole {
    Navigation,
    Header,
    Footer,
    Main,
    Sidebar,
    Hero,
    Card,
    Button,
    Form,
    Input,
    Search,
    Modal,
    Dropdown,
    Tabs,
    Accordion,
    Carousel,
    Breadcrumb,
    Pagination,
    Table,
    List,
    Alert,
    Badge,
    Avatar,
    Tooltip,
}

impl ComponentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentRole::Navigation => "navigation",
            ComponentRole::Header => "header",
            ComponentRole::Footer => "footer",
            ComponentRole::Main => "main",
            ComponentRole::Sidebar => "sidebar",
            ComponentRole::Hero => "hero",
            ComponentRole::Card => "card",
            ComponentRole::Button => "button",
            ComponentRole::Form => "form",
            ComponentRole::Input => "input",
            ComponentRole::Search => "search",
            ComponentRole::Modal => "modal",
            ComponentRole::Dropdown => "dropdown",
            ComponentRole::Tabs => "tabs",
            ComponentRole::Accordion => "accordion",
            ComponentRole::Carousel => "carousel",
            ComponentRole::Breadcrumb => "breadcrumb",
            ComponentRole::Pagination => "pagination",
            ComponentRole::Table => "table",
            ComponentRole::List => "list",
            ComponentRole::Alert => "alert",
            ComponentRole::Badge => "badge",
            ComponentRole::Avatar => "avatar",
            ComponentRole::Tooltip => "tooltip",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsSection {
    pub items: Vec<ComponentEntry>,
    /// 超出上限被截断
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    pub role: ComponentRole,
    pub tag: String,
    /// 规范化标签文本，与 role 组成去重键
    pub label: String,
    /// 首次出现元素的选择器提示（tag#id.class）
    pub hint: String,
    pub count: usize,
}

// ===================== SEO =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoViolation {
    pub code: &'static str,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSection {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub robots: Option<String>,
    pub viewport: Option<String>,
    pub lang: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter: BTreeMap<String, String>,
    pub headings: Vec<Heading>,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub violations: Vec<SeoViolation>,
}

impl SeoSection {
    pub fn has_violation(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }
}

// ===================== 性能 =====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Fair,
    #[default]
    Poor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSection {
    pub latency_ms: u64,
    pub transfer_bytes: u64,
    pub document_bytes: u64,
    pub element_count: usize,
    pub script_count: usize,
    pub inline_script_count: usize,
    pub third_party_script_count: usize,
    pub stylesheet_count: usize,
    pub image_count: usize,
    pub via_relay: bool,
    pub latency_tier: PerformanceTier,
    pub weight_tier: PerformanceTier,
    /// 延迟与体积两档中较差者
    pub tier: PerformanceTier,
}

// ===================== 分区数据 =====================

/// 单个检测器产出的分区数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionData {
    TechStack(TechStackSection),
    Design(DesignSection),
    Components(ComponentsSection),
    Seo(SeoSection),
    Performance(PerformanceSection),
}

impl SectionData {
    pub fn section(&self) -> Section {
        match self {
            SectionData::TechStack(_) => Section::TechStack,
            SectionData::Design(_) => Section::Design,
            SectionData::Components(_) => Section::Components,
            SectionData::Seo(_) => Section::Seo,
            SectionData::Performance(_) => Section::Performance,
        }
    }

    /// 数据本身不完整（如设计令牌有子提取失败）
    pub fn is_degraded(&self) -> bool {
        matches!(self, SectionData::Design(design) if !design.errors.is_empty())
    }

    /// 分区的空结构
    pub fn empty(section: Section) -> Self {
        match section {
            Section::TechStack => SectionData::TechStack(TechStackSection::default()),
            Section::Design => SectionData::Design(DesignSection::default()),
            Section::Components => SectionData::Components(ComponentsSection::default()),
            Section::Seo => SectionData::Seo(SeoSection::default()),
            Section::Performance => SectionData::Performance(PerformanceSection::default()),
        }
    }
}
