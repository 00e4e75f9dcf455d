use std::path::Path;

use crate::error::{GenerateError, Result};
use crate::models::{ArtifactBundle, ArtifactKind};

/** \brief HTML 模板中的标题占位符，可能出现多次。 */
pub const TITLE_PLACEHOLDER: &str = "{title}";

/**
 * \brief 内置游戏模板：HTML 含标题占位符，CSS 与 JS 为纯文本。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateDefinition {
    pub key: &'static str,
    /** \brief 未指定标题时使用的默认标题 */
    pub title: &'static str,
    pub markup: &'static str,
    pub style: &'static str,
    pub script: &'static str,
}

macro_rules! template {
    ($key:literal, $title:literal) => {
        TemplateDefinition {
            key: $key,
            title: $title,
            markup: include_str!(concat!("../templates/", $key, "/index.html")),
            style: include_str!(concat!("../templates/", $key, "/style.css")),
            script: include_str!(concat!("../templates/", $key, "/game.js")),
        }
    };
}

static CATALOG: [TemplateDefinition; 6] = [
    template!("snake", "贪吃蛇"),
    template!("tetris", "俄罗斯方块"),
    template!("breakout", "打砖块"),
    template!("pong", "乒乓球"),
    template!("flappy", "跳跃小鸟"),
    template!("memory", "记忆翻牌"),
];

/**
 * \brief 全部模板键，顺序固定，供 CLI 校验与帮助信息使用。
 */
pub fn template_keys() -> Vec<&'static str> {
    CATALOG.iter().map(|t| t.key).collect()
}

pub fn templates() -> &'static [TemplateDefinition] {
    &CATALOG
}

/**
 * \brief 按键查找模板，返回值拷贝。
 */
pub fn lookup(key: &str) -> Result<TemplateDefinition> {
    CATALOG
        .iter()
        .find(|t| t.key == key)
        .copied()
        .ok_or_else(|| GenerateError::UnknownTemplate {
            key: key.to_string(),
        })
}

/**
 * \brief 渲染模板为产物包：替换 HTML 中的标题，CSS/JS 原样输出。
 * \param title 覆盖标题；为空时使用模板默认标题
 */
pub fn render(template: &TemplateDefinition, title: Option<&str>, dir: &Path) -> ArtifactBundle {
    let title = resolve_title(template, title);
    let mut bundle = ArtifactBundle::new(dir);
    bundle.push(
        ArtifactKind::Markup,
        template.markup.replace(TITLE_PLACEHOLDER, title),
    );
    bundle.push(ArtifactKind::Style, template.style);
    bundle.push(ArtifactKind::Script, template.script);
    bundle
}

pub fn resolve_title<'a>(template: &'a TemplateDefinition, title: Option<&'a str>) -> &'a str {
    match title {
        Some(t) if !t.is_empty() => t,
        _ => template.title,
    }
}
