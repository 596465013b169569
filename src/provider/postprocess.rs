use regex::Regex;
use std::sync::LazyLock;

/// 模型输出中的 logo 占位符
pub const LOGO_PLACEHOLDER: &str = "%%PROJECT_LOGO_PATH%%";

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// 删除成对的 <think>...</think>（含内容），再删掉落单的标签
pub fn strip_reasoning_tags(text: &str) -> String {
    THINK_BLOCK_RE
        .replace_all(text, "")
        .replace("<think>", "")
        .replace("</think>", "")
}

pub fn substitute_logo_placeholder(text: &str, logo_path: &str) -> String {
    text.replace(LOGO_PLACEHOLDER, logo_path)
}

/// 把未转义的 & 转成 \&
///
/// 前面紧邻奇数个反斜杠才算已转义，`\\&` 是换行后跟一个裸 &。
pub fn escape_ampersands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut backslashes = 0usize;
    for c in text.chars() {
        if c == '&' && backslashes % 2 == 0 {
            out.push('\\');
        }
        out.push(c);
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
    out
}
