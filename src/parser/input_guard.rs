/// 标记输入守卫：负责在进入解析前
/// 保证输入是合法 UTF-8 且「不会拖垮解析器」
pub struct InputGuard;

impl InputGuard {
    /// 字节解码为字符串：非法 UTF-8 有损替换，超长部分在字符边界截断
    pub fn decode(raw: &[u8], max_len: usize) -> String {
        // 先按字节截断，避免对超大输入做整体有损解码
        let window = &raw[..raw.len().min(max_len)];
        let mut text = String::from_utf8_lossy(window).into_owned();
        Self::truncate(&mut text, max_len);
        text
    }

    /// 在UTF-8字符边界处截断
    #[inline]
    pub fn truncate(text: &mut String, max_len: usize) {
        if text.len() <= max_len {
            return;
        }
        let mut cut = max_len;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }

    /// 是否值得解析：去除首尾 ASCII 空白 / 控制字符后仍有内容
    #[inline]
    pub fn has_content(text: &str) -> bool {
        text.bytes()
            .any(|b| !b.is_ascii_whitespace() && !b.is_ascii_control())
    }
}
