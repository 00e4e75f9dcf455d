use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ArtifactKind, ExtractedArtifactSet};

// 首个匹配的代码块生效，块体懒惰匹配到下一个 ``` 为止。
static HTML_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```html\s*([\s\S]*?)```").expect("valid html block regex"));

static CSS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```css\s*([\s\S]*?)```").expect("valid css block regex"));

static JS_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```(?:javascript|js)\s*([\s\S]*?)```").expect("valid js block regex")
});

fn pattern(kind: ArtifactKind) -> &'static Regex {
    match kind {
        ArtifactKind::Markup => &HTML_BLOCK,
        ArtifactKind::Style => &CSS_BLOCK,
        ArtifactKind::Script => &JS_BLOCK,
    }
}

/**
 * \brief 取出回复中第一个指定类型的代码块，去除首尾空白；空块视为缺失。
 */
pub fn extract_block(reply: &str, kind: ArtifactKind) -> Option<String> {
    let caps = pattern(kind).captures(reply)?;
    let body = caps.get(1)?.as_str().trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/**
 * \brief 解析模型回复中的 HTML/CSS/JS 代码块。
 * \details 永不失败；各类型相互独立，未匹配的字段为 None。
 */
pub fn extract(reply: &str) -> ExtractedArtifactSet {
    ExtractedArtifactSet {
        markup: extract_block(reply, ArtifactKind::Markup),
        style: extract_block(reply, ArtifactKind::Style),
        script: extract_block(reply, ArtifactKind::Script),
    }
}
