use std::path::PathBuf;

use reqwest::{header::InvalidHeaderValue, StatusCode};

/**
 * \brief 单次 Provider 调用的失败原因，均不重试。
 */
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /** \brief 网络层失败，包括超时。 */
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} request failed: {status} -> {body}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("invalid credential header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

/**
 * \brief 生成流程的终止性错误；解析失败不在此列，见 `GenerationOutcome`。
 */
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("{provider} needs an API key: set {}", .env_vars.join(" / "))]
    MissingCredential {
        provider: &'static str,
        env_vars: &'static [&'static str],
    },

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("unknown template '{key}', available: {}", crate::catalog::template_keys().join(", "))]
    UnknownTemplate { key: String },

    #[error("failed to write {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    /** \brief 遥测分类用的短名。 */
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::EmptyPrompt => "empty_prompt",
            Self::Provider(_) => "provider",
            Self::UnknownTemplate { .. } => "unknown_template",
            Self::Filesystem { .. } => "filesystem",
        }
    }
}

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
