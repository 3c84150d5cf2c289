//! 容错标记解析器
//! 基于 scraper（html5ever 容错树构建器）解析，再一次性遍历拷贝为只读的 ParsedDocument
//! 未闭合标签 / 缺失结束标签 / 非法编码均降级为尽力而为的树，不返回错误

use scraper::{ElementRef, Html, Node};
use url::Url;

use super::document::{ElementNode, Heading, ImageRef, LinkRef, MetaTag, ParsedDocument};
use super::input_guard::InputGuard;
use crate::utils::preview::preview_compact;

/// 遍历栈帧
enum Frame<'a> {
    Enter {
        element: ElementRef<'a>,
        parent: Option<usize>,
        depth: usize,
    },
    Exit(usize),
}

pub struct MarkupParser;

impl MarkupParser {
    /// 解析原始字节
    /// - raw：响应体
    /// - base_url：相对地址的解析基准（最终URL）
    /// - max_bytes：输入上限，超出部分截断
    pub fn parse(raw: &[u8], base_url: &Url, max_bytes: usize) -> ParsedDocument {
        let markup = InputGuard::decode(raw, max_bytes);
        if !InputGuard::has_content(&markup) {
            log::debug!("[Parse] Empty markup for {}, producing empty document", base_url);
        } else {
            log::debug!(
                "[Parse] Parsing {} bytes | Preview: {}",
                markup.len(),
                preview_compact(&markup, 80)
            );
        }

        let html = Html::parse_document(&markup);
        if !html.errors.is_empty() {
            log::debug!(
                "[Parse] Recovered from {} markup error(s) for {}",
                html.errors.len(),
                base_url
            );
        }

        let mut builder = DocumentBuilder::new(base_url.clone());
        builder.walk(html.root_element());
        builder.finish(markup)
    }
}

/// 一次遍历收集元素数组与头部元数据
struct DocumentBuilder {
    base: Url,
    doc: ParsedDocument,
    heading_ids: Vec<(u8, usize)>,
}

impl DocumentBuilder {
    fn new(base: Url) -> Self {
        Self {
            doc: ParsedDocument {
                base_url: base.to_string(),
                ..ParsedDocument::default()
            },
            base,
            heading_ids: Vec::new(),
        }
    }

    /// 显式栈的先序遍历，深层嵌套的恶意文档不会耗尽调用栈
    fn walk(&mut self, root: ElementRef<'_>) {
        let mut stack = vec![Frame::Enter {
            element: root,
            parent: None,
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter {
                    element,
                    parent,
                    depth,
                } => {
                    let id = self.doc.elements.len();
                    let mut own_text = String::new();
                    let mut children = Vec::new();
                    for child in element.children() {
                        match child.value() {
                            Node::Text(text) => own_text.push_str(text),
                            Node::Element(_) => {
                                if let Some(child_el) = ElementRef::wrap(child) {
                                    children.push(child_el);
                                }
                            }
                            _ => {}
                        }
                    }

                    let value = element.value();
                    let node = ElementNode {
                        tag: value.name().to_ascii_lowercase(),
                        attrs: value
                            .attrs()
                            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                            .collect(),
                        parent,
                        depth,
                        subtree_end: id + 1,
                        own_text,
                    };
                    self.collect(id, &node);
                    self.doc.elements.push(node);

                    stack.push(Frame::Exit(id));
                    for child in children.into_iter().rev() {
                        stack.push(Frame::Enter {
                            element: child,
                            parent: Some(id),
                            depth: depth + 1,
                        });
                    }
                }
                Frame::Exit(id) => {
                    let end = self.doc.elements.len();
                    if let Some(node) = self.doc.elements.get_mut(id) {
                        node.subtree_end = end;
                    }
                }
            }
        }
    }

    /// 按标签收集资源与元数据
    fn collect(&mut self, id: usize, node: &ElementNode) {
        if let Some(style) = node.attr("style") {
            if !style.trim().is_empty() {
                self.doc.inline_styles.push(style.to_string());
            }
        }

        match node.tag.as_str() {
            "html" => {
                if self.doc.lang.is_none() {
                    self.doc.lang = non_empty(node.attr("lang"));
                }
            }
            "base" => {
                if let Some(base) = node.attr("href").and_then(|h| self.base.join(h.trim()).ok()) {
                    self.base = base;
                }
            }
            "title" => {
                if self.doc.title.is_none() {
                    self.doc.title = non_empty(Some(node.own_text.as_str()))
                        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "));
                }
            }
            "meta" => {
                let name = node
                    .attr("name")
                    .or_else(|| node.attr("property"))
                    .or_else(|| node.attr("http-equiv"));
                if let (Some(name), Some(content)) = (name, node.attr("content")) {
                    self.doc.meta.push(MetaTag {
                        name: name.trim().to_ascii_lowercase(),
                        content: content.trim().to_string(),
                    });
                }
            }
            "script" => match node.attr("src").and_then(|src| self.resolve(src)) {
                Some(src) => self.doc.scripts.push(src),
                None => {
                    if !node.own_text.trim().is_empty() {
                        self.doc.inline_scripts.push(node.own_text.clone());
                    }
                }
            },
            "link" => {
                let rel = node.attr("rel").unwrap_or("").trim().to_ascii_lowercase();
                if let Some(href) = node.attr("href").and_then(|h| self.resolve(h)) {
                    if rel.split_ascii_whitespace().any(|r| r == "canonical") && self.doc.canonical.is_none() {
                        self.doc.canonical = Some(href.clone());
                    }
                    self.doc.links.push(LinkRef { rel, href });
                }
            }
            "style" => {
                if !node.own_text.trim().is_empty() {
                    self.doc.style_blocks.push(node.own_text.clone());
                }
            }
            "img" => {
                let src = node.attr("src").and_then(|s| self.resolve(s));
                let alt = node.attr("alt").map(|a| a.trim().to_string());
                self.doc.images.push(ImageRef { src, alt });
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = node.tag.as_bytes()[1] - b'0';
                self.heading_ids.push((level, id));
            }
            _ => {}
        }
    }

    /// 相对地址转绝对地址；data: / javascript: 等非网络地址丢弃
    fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let url = self.base.join(raw).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    fn finish(mut self, markup: String) -> ParsedDocument {
        // 标题文本需要完整子树，遍历结束后再计算
        let headings: Vec<Heading> = self
            .heading_ids
            .iter()
            .map(|&(level, id)| Heading {
                level,
                text: self.doc.text_content(id),
            })
            .collect();
        self.doc.headings = headings;
        self.doc.markup = markup;

        log::debug!(
            "[Parse] Document built | Elements: {} | Scripts: {} | Stylesheets: {} | Images: {}",
            self.doc.elements.len(),
            self.doc.scripts.len(),
            self.doc.stylesheet_hrefs().len(),
            self.doc.images.len()
        );
        self.doc
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::LinkedStylesheet;

    fn parse(html: &str) -> ParsedDocument {
        let base = Url::parse("https://example.com/blog/post").unwrap();
        MarkupParser::parse(html.as_bytes(), &base, 1 << 20)
    }

    #[test]
    fn test_resources_resolve_to_absolute_urls() {
        let doc = parse(
            r#"<html lang="en"><head>
                <title>  Hello
                   World </title>
                <meta name="Description" content="A page">
                <meta property="og:title" content="Hello">
                <link rel="stylesheet" href="/css/site.css">
                <link rel="canonical" href="https://example.com/blog/post">
                <script src="../js/app.js"></script>
                <script>window.__APP__ = 1;</script>
                <script src="javascript:void(0)"></script>
            </head><body><img src="a.png"><img src="b.png" alt="B"></body></html>"#,
        );

        assert_eq!(doc.title(), Some("Hello World"));
        assert_eq!(doc.lang(), Some("en"));
        assert_eq!(doc.meta("description"), Some("A page"));
        assert_eq!(doc.meta("og:title"), Some("Hello"));
        assert_eq!(doc.scripts(), &["https://example.com/js/app.js".to_string()]);
        assert_eq!(doc.inline_scripts().len(), 1);
        assert_eq!(
            doc.stylesheet_hrefs(),
            vec!["https://example.com/css/site.css".to_string()]
        );
        assert_eq!(doc.canonical(), Some("https://example.com/blog/post"));
        assert_eq!(doc.images().len(), 2);
        assert_eq!(doc.images()[0].alt, None);
        assert_eq!(doc.images()[1].alt.as_deref(), Some("B"));
    }

    #[test]
    fn test_malformed_markup_degrades_gracefully() {
        let doc = parse("<div class='card'><p>unclosed <b>bold<div><span>deep");
        assert!(doc.by_tag("div").count() >= 2);
        assert_eq!(doc.with_class("card").count(), 1);
        assert!(doc.text_content(0).contains("deep"));

        let empty = parse("");
        assert!(empty.element_count() >= 1);
        assert!(empty.title().is_none());

        let binary = MarkupParser::parse(
            &[0xff, 0xfe, 0x00, 0x3c],
            &Url::parse("https://example.com").unwrap(),
            1024,
        );
        assert!(binary.element_count() >= 1);
    }

    #[test]
    fn test_subtree_ranges_and_headings() {
        let doc = parse("<body><section><h1>Top <em>level</em></h1><h3>Skip</h3></section><footer></footer></body>");
        let (section_id, _) = doc.by_tag("section").next().unwrap();
        let range = doc.subtree(section_id);
        let tags: Vec<&str> = doc.elements()[range].iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["section", "h1", "em", "h3"]);

        let (em_id, _) = doc.by_tag("em").next().unwrap();
        let chain: Vec<&str> = doc.ancestors(em_id).map(|e| e.tag.as_str()).collect();
        assert_eq!(chain, vec!["h1", "section", "body", "html"]);

        let levels: Vec<(u8, &str)> = doc.headings().iter().map(|h| (h.level, h.text.as_str())).collect();
        assert_eq!(levels, vec![(1, "Top level"), (3, "Skip")]);
    }

    #[test]
    fn test_style_sources_collected() {
        let doc = parse(
            r#"<style>body { color: #fff; }</style><p style="margin: 4px">x</p>"#,
        )
        .with_linked_styles(vec![LinkedStylesheet {
            url: "https://example.com/a.css".into(),
            text: "a { color: red; }".into(),
        }]);
        let texts: Vec<&str> = doc.stylesheet_texts().collect();
        assert_eq!(texts, vec!["body { color: #fff; }", "a { color: red; }"]);
        assert_eq!(doc.inline_styles(), &["margin: 4px".to_string()]);
    }
}
