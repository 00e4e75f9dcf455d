use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/**
 * \brief 消息结构，与 OpenAI Chat 消息格式对齐。
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /** \brief 角色：system/user/assistant */
    pub role: String,
    /** \brief 内容 */
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/**
 * \brief 不透明的 API 密钥，Debug 输出时隐藏明文。
 */
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /** \brief 取出明文，仅在组装请求头时使用。 */
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/**
 * \brief 一次生成请求，按模式区分。
 */
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /** \brief 调用大模型根据自然语言描述生成。 */
    Ai {
        prompt: String,
        model: String,
        /** \brief 显式传入的密钥，优先于环境变量。 */
        credential: Option<Credential>,
    },
    /** \brief 使用内置模板生成。 */
    Template {
        key: String,
        title: Option<String>,
    },
}

impl GenerationRequest {
    pub fn ai(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Ai {
            prompt: prompt.into(),
            model: model.into(),
            credential: None,
        }
    }

    pub fn template(key: impl Into<String>, title: Option<String>) -> Self {
        Self::Template {
            key: key.into(),
            title,
        }
    }

    /** \brief 附加显式密钥；对模板请求无效果。 */
    pub fn with_credential(self, credential: Credential) -> Self {
        match self {
            Self::Ai { prompt, model, .. } => Self::Ai {
                prompt,
                model,
                credential: Some(credential),
            },
            other => other,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Ai { .. } => "ai",
            Self::Template { .. } => "template",
        }
    }
}

/**
 * \brief 产物类型，每种对应一个固定文件名。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Markup,
    Style,
    Script,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Markup, Self::Style, Self::Script];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Markup => "index.html",
            Self::Style => "style.css",
            Self::Script => "game.js",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/** \brief 解析失败时保存原始回复的文件名。 */
pub const DIAGNOSTIC_FILE_NAME: &str = "ai_response.txt";

/**
 * \brief 从模型回复中解析出的三段代码，缺失的段为 None。
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArtifactSet {
    pub markup: Option<String>,
    pub style: Option<String>,
    pub script: Option<String>,
}

impl ExtractedArtifactSet {
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Markup => self.markup.as_deref(),
            ArtifactKind::Style => self.style.as_deref(),
            ArtifactKind::Script => self.script.as_deref(),
        }
    }

    /** \brief 未解析出 HTML 即视为整体失败。 */
    pub fn has_markup(&self) -> bool {
        self.markup.is_some()
    }

    pub fn missing(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }

    /**
     * \brief 把已解析的段落装入待写入的产物包。
     */
    pub fn into_bundle(self, dir: impl Into<PathBuf>) -> ArtifactBundle {
        let mut bundle = ArtifactBundle::new(dir);
        let parts = [
            (ArtifactKind::Markup, self.markup),
            (ArtifactKind::Style, self.style),
            (ArtifactKind::Script, self.script),
        ];
        for (kind, content) in parts {
            if let Some(content) = content {
                bundle.push(kind, content);
            }
        }
        bundle
    }
}

/**
 * \brief 单个待写入的产物。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub content: String,
}

/**
 * \brief 目标目录加至多三个产物；写入一次后即丢弃。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    pub dir: PathBuf,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactBundle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            artifacts: Vec::with_capacity(3),
        }
    }

    /** \brief 同类产物只保留第一次放入的内容。 */
    pub fn push(&mut self, kind: ArtifactKind, content: impl Into<String>) {
        if self.get(kind).is_none() {
            self.artifacts.push(Artifact {
                kind,
                content: content.into(),
            });
        }
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.artifacts
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.content.as_str())
    }
}

/**
 * \brief 写入成功的单个文件。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}
