//! 只读文档模型
//! 解析结果拷贝进自有的元素数组（文档顺序），构建完成后不可变，可跨线程共享

use std::ops::Range;

use serde::Serialize;

/// 元素节点
/// 数组下标即节点ID；子树为连续区间 `[id, subtree_end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub parent: Option<usize>,
    pub depth: usize,
    pub subtree_end: usize,
    /// 直接文本子节点（不含后代）
    pub own_text: String,
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// 图片引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub src: Option<String>,
    pub alt: Option<String>,
}

/// `<link>` 引用（rel 小写）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub rel: String,
    pub href: String,
}

/// `<meta>` 标签；name 取 name / property / http-equiv 之一，小写
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// 外链样式表原文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedStylesheet {
    pub url: String,
    pub text: String,
}

/// 解析后的只读文档
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub(crate) base_url: String,
    pub(crate) elements: Vec<ElementNode>,
    pub(crate) title: Option<String>,
    pub(crate) lang: Option<String>,
    pub(crate) canonical: Option<String>,
    pub(crate) meta: Vec<MetaTag>,
    pub(crate) scripts: Vec<String>,
    pub(crate) inline_scripts: Vec<String>,
    pub(crate) links: Vec<LinkRef>,
    pub(crate) images: Vec<ImageRef>,
    pub(crate) style_blocks: Vec<String>,
    pub(crate) inline_styles: Vec<String>,
    pub(crate) linked_styles: Vec<LinkedStylesheet>,
    pub(crate) headings: Vec<Heading>,
    pub(crate) markup: String,
}

impl ParsedDocument {
    /// 挂载外链样式表文本（冻结前调用）
    pub fn with_linked_styles(mut self, sheets: Vec<LinkedStylesheet>) -> Self {
        self.linked_styles = sheets;
        self
    }

    // ===================== 元素查询 =====================

    pub fn elements(&self) -> &[ElementNode] {
        &self.elements
    }

    pub fn element(&self, id: usize) -> Option<&ElementNode> {
        self.elements.get(id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = (usize, &'a ElementNode)> + 'a {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, el)| el.tag.eq_ignore_ascii_case(tag))
    }

    pub fn with_attr<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (usize, &'a ElementNode)> + 'a {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, el)| el.has_attr(name))
    }

    pub fn with_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = (usize, &'a ElementNode)> + 'a {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, el)| el.has_class(class))
    }

    /// 子树节点区间（含自身）
    pub fn subtree(&self, id: usize) -> Range<usize> {
        match self.elements.get(id) {
            Some(el) => id..el.subtree_end,
            None => 0..0,
        }
    }

    /// 元素及其后代的文本，空白折叠
    pub fn text_content(&self, id: usize) -> String {
        let mut out = String::new();
        for el in &self.elements[self.subtree(id)] {
            for word in el.own_text.split_whitespace() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(word);
            }
        }
        out
    }

    /// 祖先链（由近及远）
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &ElementNode> {
        let mut next = self.elements.get(id).and_then(|el| el.parent);
        std::iter::from_fn(move || {
            let current = next?;
            let el = self.elements.get(current)?;
            next = el.parent;
            Some(el)
        })
    }

    // ===================== 头部元数据 =====================

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn canonical(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    pub fn meta_tags(&self) -> &[MetaTag] {
        &self.meta
    }

    /// 按名称取第一个 meta 内容（名称大小写不敏感）
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| m.content.as_str())
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    // ===================== 资源引用 =====================

    /// `<script src>` 绝对地址（文档顺序）
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn inline_scripts(&self) -> &[String] {
        &self.inline_scripts
    }

    pub fn links(&self) -> &[LinkRef] {
        &self.links
    }

    /// `rel~=stylesheet` 的外链地址
    pub fn stylesheet_hrefs(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.rel.split_ascii_whitespace().any(|r| r == "stylesheet"))
            .map(|l| l.href.clone())
            .collect()
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    // ===================== 样式 =====================

    pub fn style_blocks(&self) -> &[String] {
        &self.style_blocks
    }

    pub fn inline_styles(&self) -> &[String] {
        &self.inline_styles
    }

    pub fn linked_styles(&self) -> &[LinkedStylesheet] {
        &self.linked_styles
    }

    /// 全部样式表文本：`<style>` 块在前，外链样式表在后
    pub fn stylesheet_texts(&self) -> impl Iterator<Item = &str> {
        self.style_blocks
            .iter()
            .map(String::as_str)
            .chain(self.linked_styles.iter().map(|s| s.text.as_str()))
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// 文档体积（字节）
    pub fn byte_len(&self) -> usize {
        self.markup.len()
    }
}
