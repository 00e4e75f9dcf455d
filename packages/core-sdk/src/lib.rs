pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod llm;
pub mod models;
pub mod telemetry;
pub mod writer;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::catalog;
    pub use crate::config::GeneratorConfig;
    pub use crate::error::{GenerateError, ProviderError};
    pub use crate::generate::{GenerationOutcome, Generator};
    pub use crate::llm::{self, ChatBackend, HttpBackend, DEFAULT_MODEL};
    pub use crate::models::{ArtifactKind, Credential, GenerationRequest};
    pub use crate::telemetry;
}
