//! 组件分类器
//! 判定优先级：标签名 → ARIA role → class 关键词；未命中任何规则的元素直接忽略
use rustc_hash::FxHashMap;

use super::{DetectionContext, Detector};
use crate::error::DetectorFailure;
use crate::parser::ElementNode;
use crate::report::{ComponentEntry, ComponentRole, ComponentsSection, Section, SectionData};
use crate::utils::normalize_label;

use ComponentRole::*;

/// 标签文本最大字符数
const MAX_LABEL_CHARS: usize = 60;
/// 每处理多少个元素检查一次取消并提交阶段性结果
const CHECKPOINT_INTERVAL: usize = 256;

/// class 关键词表
const CLASS_KEYWORDS: &[(&str, ComponentRole)] = &[
    ("nav", Navigation),
    ("navbar", Navigation),
    ("navigation", Navigation),
    ("menu", Navigation),
    ("header", Header),
    ("masthead", Header),
    ("footer", Footer),
    ("sidebar", Sidebar),
    ("hero", Hero),
    ("jumbotron", Hero),
    ("banner", Hero),
    ("card", Card),
    ("tile", Card),
    ("btn", Button),
    ("button", Button),
    ("form", Form),
    ("search", Search),
    ("searchbar", Search),
    ("modal", Modal),
    ("dialog", Modal),
    ("popup", Modal),
    ("dropdown", Dropdown),
    ("tabs", Tabs),
    ("accordion", Accordion),
    ("carousel", Carousel),
    ("slider", Carousel),
    ("swiper", Carousel),
    ("breadcrumb", Breadcrumb),
    ("breadcrumbs", Breadcrumb),
    ("pagination", Pagination),
    ("pager", Pagination),
    ("alert", Alert),
    ("toast", Alert),
    ("notification", Alert),
    ("badge", Badge),
    ("chip", Badge),
    ("pill", Badge),
    ("avatar", Avatar),
    ("tooltip", Tooltip),
];

fn role_by_tag(el: &ElementNode) -> Option<ComponentRole> {
    let role = match el.tag.as_str() {
        "nav" => Navigation,
        "header" => Header,
        "footer" => Footer,
        "main" => Main,
        "aside" => Sidebar,
        "button" => Button,
        "form" => Form,
        "dialog" => Modal,
        "details" => Accordion,
        "table" => Table,
        "select" | "textarea" => Input,
        "input" => match el.attr("type").map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("hidden") => return None,
            Some("search") => Search,
            Some("submit") | Some("button") | Some("reset") => Button,
            _ => Input,
        },
        _ => return None,
    };
    Some(role)
}

fn role_by_aria(el: &ElementNode) -> Option<ComponentRole> {
    let role = match el.attr("role")?.trim().to_ascii_lowercase().as_str() {
        "navigation" | "menubar" => Navigation,
        "banner" => Header,
        "contentinfo" => Footer,
        "main" => Main,
        "complementary" => Sidebar,
        "button" => Button,
        "form" => Form,
        "search" | "searchbox" => Search,
        "textbox" | "combobox" => Input,
        "dialog" | "alertdialog" => Modal,
        "menu" | "listbox" => Dropdown,
        "tablist" => Tabs,
        "table" | "grid" => Table,
        "list" => List,
        "alert" | "status" => Alert,
        "tooltip" => Tooltip,
        _ => return None,
    };
    Some(role)
}

fn keyword_role(word: &str) -> Option<ComponentRole> {
    CLASS_KEYWORDS
        .iter()
        .find(|(keyword, _)| *keyword == word)
        .map(|(_, role)| *role)
}

/// class 关键词匹配
/// - class 等于关键词，或末段（按 - / _ 切分）等于关键词
/// - BEM 元素（含 `__`）与首段本身就是关键词的子部件（如 card-header）不参与
fn role_by_class(el: &ElementNode) -> Option<ComponentRole> {
    el.classes().find_map(|class| {
        let class = class.to_ascii_lowercase();
        if class.contains("__") {
            return None;
        }
        if let Some(role) = keyword_role(&class) {
            return Some(role);
        }
        let mut segments = class.split(|c| c == '-' || c == '_').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let last = segments.last()?;
        if keyword_role(first).is_some() {
            return None;
        }
        keyword_role(last)
    })
}

pub fn classify(el: &ElementNode) -> Option<ComponentRole> {
    role_by_tag(el)
        .or_else(|| role_by_aria(el))
        .or_else(|| role_by_class(el))
}

/// 组件标签：aria-label → 按钮/链接文本 → 输入提示 → id → class → 标签名
fn component_label(ctx: &DetectionContext, id: usize, el: &ElementNode, role: ComponentRole) -> String {
    let candidate = el
        .attr("aria-label")
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            (role == Button || el.tag == "a")
                .then(|| ctx.document().text_content(id))
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            (role == Input || role == Search)
                .then(|| el.attr("placeholder").or_else(|| el.attr("name")))
                .flatten()
                .map(str::to_string)
        })
        .or_else(|| el.id().map(str::to_string))
        .or_else(|| el.classes().next().map(str::to_string))
        .unwrap_or_else(|| el.tag.clone());

    let label = normalize_label(&candidate, MAX_LABEL_CHARS);
    if label.is_empty() {
        el.tag.clone()
    } else {
        label
    }
}

fn selector_hint(el: &ElementNode) -> String {
    let mut hint = el.tag.clone();
    if let Some(id) = el.id() {
        hint.push('#');
        hint.push_str(id);
    }
    for class in el.classes().take(2) {
        hint.push('.');
        hint.push_str(class);
    }
    hint
}

pub struct ComponentClassifier;

impl Detector for ComponentClassifier {
    fn name(&self) -> &'static str {
        "component-classifier"
    }

    fn section(&self) -> Section {
        Section::Components
    }

    fn run(&self, ctx: &DetectionContext) -> Result<SectionData, DetectorFailure> {
        let cap = ctx.config().max_components;
        let mut section = ComponentsSection::default();
        // (role, label) → items 下标
        let mut index: FxHashMap<(ComponentRole, String), usize> = FxHashMap::default();

        for (id, el) in ctx.document().elements().iter().enumerate() {
            if id > 0 && id % CHECKPOINT_INTERVAL == 0 {
                ctx.commit(SectionData::Components(section.clone()));
                ctx.checkpoint()?;
            }

            let Some(role) = classify(el) else {
                continue;
            };
            let label = component_label(ctx, id, el, role);

            if let Some(&pos) = index.get(&(role, label.clone())) {
                section.items[pos].count += 1;
                continue;
            }
            if section.items.len() >= cap {
                section.truncated = true;
                continue;
            }
            index.insert((role, label.clone()), section.items.len());
            section.items.push(ComponentEntry {
                role,
                tag: el.tag.clone(),
                label,
                hint: selector_hint(el),
                count: 1,
            });
        }

        log::debug!(
            "[Detect] Components classified | Entries: {} | Truncated: {}",
            section.items.len(),
            section.truncated
        );
        Ok(SectionData::Components(section))
    }
}
