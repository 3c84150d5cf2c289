//! 版本提取工具模块
//! 根据签名中的版本模板，从正则捕获结果里拼出技术版本号
//! 支持 \1/\2 与 $1/$2 两种分组引用格式

use regex::Captures;

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 从捕获结果中提取版本号
    ///
    /// # 返回值
    /// - `Some(String)`: 至少一个分组被替换且结果非空
    /// - `None`: 模板为空 / 无分组命中 / 残留未替换的占位符
    pub fn extract(template: Option<&str>, captures: &Captures) -> Option<String> {
        let template = template.filter(|t| !t.trim().is_empty())?;
        let mut version = template.to_string();
        let mut replaced = false;

        // 0 是整体匹配，不参与版本拼接
        for group_index in 1..captures.len() {
            let matched = captures
                .get(group_index)
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            if !matched.is_empty() {
                replaced = true;
            }
            version = version
                .replace(&format!("\\{}", group_index), matched)
                .replace(&format!("${}", group_index), matched);
        }

        let version = version.trim().trim_matches(|c| c == '.' || c == '-').to_string();
        if !replaced || version.is_empty() || version.contains('\\') || version.contains('$') {
            return None;
        }
        Some(version)
    }
}
