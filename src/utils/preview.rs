use std::fmt::{self, Write};

// ======================== 日志预览工具函数 ========================
/// 空白折叠 + 截断的日志预览
/// 连续空白折叠为单个空格，达到最大长度立即停止，全程不分配堆内存
#[inline(always)]
pub fn preview_compact(s: &str, max_len: usize) -> impl fmt::Display + '_ {
    struct CompactView<'a> {
        source: &'a str,
        max_length: usize,
    }

    impl fmt::Display for CompactView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut written = 0;
            let mut last_was_whitespace = false;

            for ch in self.source.trim().chars() {
                if written >= self.max_length {
                    f.write_str("…")?;
                    break;
                }
                if ch.is_whitespace() {
                    if last_was_whitespace {
                        continue;
                    }
                    f.write_char(' ')?;
                    last_was_whitespace = true;
                } else {
                    f.write_char(ch)?;
                    last_was_whitespace = false;
                }
                written += 1;
            }
            Ok(())
        }
    }

    CompactView {
        source: s,
        max_length: max_len,
    }
}

/// 折叠空白为单个空格并转小写，用于组件标签等需要稳定比较的文本
pub fn normalize_label(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars * 2));
    let mut count = 0;
    for word in s.split_whitespace() {
        if count >= max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
            count += 1;
        }
        for ch in word.chars().flat_map(char::to_lowercase) {
            if count >= max_chars {
                break;
            }
            out.push(ch);
            count += 1;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_collapses_and_truncates() {
        let text = "  <html>\n\n   <head>   <title>x</title>";
        assert_eq!(preview_compact(text, 100).to_string(), "<html> <head> <title>x</title>");
        assert_eq!(preview_compact(text, 6).to_string(), "<html>…");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Sign \n  UP   Now ", 40), "sign up now");
        assert_eq!(normalize_label("Subscribe to newsletter", 9), "subscribe");
    }
}
