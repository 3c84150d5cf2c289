//! 解析模块：输入守卫、容错解析、只读文档模型
pub mod document;
pub mod input_guard;
pub mod markup_parser;

pub use self::document::{
    ElementNode, Heading, ImageRef, LinkRef, LinkedStylesheet, MetaTag, ParsedDocument,
};
pub use self::input_guard::InputGuard;
pub use self::markup_parser::MarkupParser;
