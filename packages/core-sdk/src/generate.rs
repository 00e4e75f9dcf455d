use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::{GenerateError, ProviderError, Result};
use crate::llm::{self, ChatBackend, EnvLookup, HttpBackend};
use crate::models::{ArtifactKind, Credential, GenerationRequest, WrittenArtifact};
use crate::{catalog, extract, telemetry, writer};

/**
 * \brief 一次生成的结果；硬失败通过 `GenerateError` 返回。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /** \brief 三个文件全部写入。 */
    Complete { written: Vec<WrittenArtifact> },
    /** \brief HTML 已写入，但 CSS 或 JS 缺失。 */
    Partial {
        written: Vec<WrittenArtifact>,
        missing: Vec<ArtifactKind>,
    },
    /** \brief 未解析出 HTML，原始回复已保存。 */
    ExtractionFailed { diagnostic: PathBuf },
}

impl GenerationOutcome {
    pub fn written(&self) -> &[WrittenArtifact] {
        match self {
            Self::Complete { written } | Self::Partial { written, .. } => written,
            Self::ExtractionFailed { .. } => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::ExtractionFailed { .. })
    }
}

/**
 * \brief 生成入口：无跨请求状态，可并发调用。
 */
#[derive(Debug, Clone)]
pub struct Generator<B = HttpBackend> {
    backend: B,
    env: EnvLookup,
}

impl<B: ChatBackend> Generator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_env(backend, llm::process_env)
    }

    pub fn with_env(backend: B, env: EnvLookup) -> Self {
        Self { backend, env }
    }

    /**
     * \brief 按请求模式生成并写入 `dir`。
     */
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        dir: &Path,
    ) -> Result<GenerationOutcome> {
        self.generate_until(request, dir, &CancellationToken::new())
            .await
    }

    /**
     * \brief 同 `generate`，`cancel` 触发时中止进行中的 Provider 请求。
     */
    pub async fn generate_until(
        &self,
        request: &GenerationRequest,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        match request {
            GenerationRequest::Template { key, title } => {
                generate_from_template(key, title.as_deref(), dir)
            }
            GenerationRequest::Ai {
                prompt,
                model,
                credential,
            } => {
                self.generate_with_ai(prompt, model, credential.as_ref(), dir, cancel)
                    .await
            }
        }
    }

    async fn generate_with_ai(
        &self,
        prompt: &str,
        model: &str,
        credential: Option<&Credential>,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        if prompt.trim().is_empty() {
            return Err(GenerateError::EmptyPrompt);
        }
        let selection = llm::select_provider(model);
        let credential = llm::resolve_credential(selection, credential, self.env)
            .inspect_err(|e| telemetry::log_error("generate.ai", &e.to_string()))?;

        telemetry::log_event(
            "generate.ai",
            &format!(
                "provider={} model={} prompt_len={}",
                selection.label(),
                model,
                prompt.len()
            ),
        );

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            reply = self.backend.invoke(prompt, model, &credential) => reply,
        };
        let reply = reply.inspect_err(|e| telemetry::log_error("generate.ai", &e.to_string()))?;

        let extracted = extract::extract(&reply);
        if !extracted.has_markup() {
            let diagnostic = writer::write_diagnostic(dir, &reply)?;
            telemetry::log_error(
                "generate.ai",
                &format!("no html block in reply, reply_len={}", reply.len()),
            );
            return Ok(GenerationOutcome::ExtractionFailed { diagnostic });
        }

        let missing = extracted.missing();
        let written = writer::write_bundle(&extracted.into_bundle(dir))
            .inspect_err(|e| telemetry::log_error("generate.ai", &e.to_string()))?;
        if missing.is_empty() {
            Ok(GenerationOutcome::Complete { written })
        } else {
            Ok(GenerationOutcome::Partial { written, missing })
        }
    }
}

/**
 * \brief 模板模式：查表、渲染、写入，全程同步。
 */
pub fn generate_from_template(
    key: &str,
    title: Option<&str>,
    dir: &Path,
) -> Result<GenerationOutcome> {
    let template = catalog::lookup(key)
        .inspect_err(|e| telemetry::log_error("generate.template", &e.to_string()))?;
    telemetry::log_event(
        "generate.template",
        &format!(
            "key={} title={}",
            template.key,
            catalog::resolve_title(&template, title)
        ),
    );
    let bundle = catalog::render(&template, title, dir);
    let written = writer::write_bundle(&bundle)
        .inspect_err(|e| telemetry::log_error("generate.template", &e.to_string()))?;
    Ok(GenerationOutcome::Complete { written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone)]
    struct FakeBackend {
        reply: Result<String, u16>,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChatBackend for FakeBackend {
        async fn invoke(
            &self,
            _prompt: &str,
            _model: &str,
            _credential: &Credential,
        ) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(code) => Err(ProviderError::Status {
                    provider: "fake",
                    status: reqwest::StatusCode::from_u16(*code).expect("status code"),
                    body: "denied".to_string(),
                }),
            }
        }
    }

    fn any_key(_: &str) -> Option<String> {
        Some("sk-test".to_string())
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn ai_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::ai(prompt, "gpt-4o")
    }

    #[tokio::test]
    async fn test_template_snake_writes_three_files() {
        let tmp = TempDir::new().expect("tempdir");
        let backend = FakeBackend::replying("");
        let generator = Generator::with_env(backend.clone(), no_env);
        let outcome = generator
            .generate(&GenerationRequest::template("snake", None), tmp.path())
            .await
            .expect("generate");

        assert_eq!(outcome.written().len(), 3);
        assert!(matches!(outcome, GenerationOutcome::Complete { .. }));
        let html = fs::read_to_string(tmp.path().join("index.html")).expect("read html");
        assert!(html.contains("<title>贪吃蛇</title>"));
        let snake = catalog::lookup("snake").expect("snake");
        assert_eq!(
            fs::read_to_string(tmp.path().join("game.js")).expect("read js"),
            snake.script
        );
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_template_title_override() {
        let tmp = TempDir::new().expect("tempdir");
        generate_from_template("pong", Some("Table Tennis"), tmp.path()).expect("generate");
        let html = fs::read_to_string(tmp.path().join("index.html")).expect("read html");
        assert!(html.contains("<title>Table Tennis</title>"));
        assert!(!html.contains("{title}"));
    }

    #[test]
    fn test_unknown_template_writes_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("out");
        let err = generate_from_template("unknown-key", None, &dir).unwrap_err();
        assert!(matches!(err, GenerateError::UnknownTemplate { .. }));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_missing_credential_never_calls_backend() {
        for model in ["claude-3-5-sonnet", "deepseek-chat", "glm-4", "gpt-4o"] {
            let tmp = TempDir::new().expect("tempdir");
            let backend = FakeBackend::replying("```html\n<p/>\n```");
            let generator = Generator::with_env(backend.clone(), no_env);
            let err = generator
                .generate(&GenerationRequest::ai("a game", model), tmp.path())
                .await
                .unwrap_err();
            assert!(
                matches!(err, GenerateError::MissingCredential { .. }),
                "{model}: {err}"
            );
            assert_eq!(backend.calls(), 0, "{model}");
            assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);
        }
    }

    #[tokio::test]
    async fn test_explicit_credential_skips_env() {
        let tmp = TempDir::new().expect("tempdir");
        let backend = FakeBackend::replying("```html\n<p/>\n```");
        let generator = Generator::with_env(backend.clone(), no_env);
        let request = ai_request("a game").with_credential(Credential::new("sk-flag"));
        generator
            .generate(&request, tmp.path())
            .await
            .expect("generate");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_partial_reply_writes_markup_and_style_only() {
        let tmp = TempDir::new().expect("tempdir");
        let backend = FakeBackend::replying("```html\n<p>hi</p>\n``` ```css\nbody{}\n```");
        let generator = Generator::with_env(backend.clone(), any_key);
        let outcome = generator
            .generate(&ai_request("hi page"), tmp.path())
            .await
            .expect("generate");

        match &outcome {
            GenerationOutcome::Partial { written, missing } => {
                assert_eq!(written.len(), 2);
                assert_eq!(missing, &vec![ArtifactKind::Script]);
            }
            other => panic!("expected partial, got {:?}", other),
        }
        assert_eq!(
            fs::read_to_string(tmp.path().join("index.html")).expect("read html"),
            "<p>hi</p>"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("style.css")).expect("read css"),
            "body{}"
        );
        assert!(!tmp.path().join("game.js").exists());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_full_reply_is_complete() {
        let tmp = TempDir::new().expect("tempdir");
        let reply = "```html\n<p/>\n```\n```css\np{}\n```\n```javascript\nstart();\n```";
        let generator = Generator::with_env(FakeBackend::replying(reply), any_key);
        let outcome = generator
            .generate(&ai_request("game"), tmp.path())
            .await
            .expect("generate");
        assert!(matches!(outcome, GenerationOutcome::Complete { ref written } if written.len() == 3));
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_reply_without_html_dumps_diagnostic() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("game");
        let reply = "I made this:\n```css\nbody{}\n```\n```js\nx();\n```";
        let generator = Generator::with_env(FakeBackend::replying(reply), any_key);
        let outcome = generator
            .generate(&ai_request("game"), &dir)
            .await
            .expect("generate");

        assert_eq!(
            outcome,
            GenerationOutcome::ExtractionFailed {
                diagnostic: dir.join("ai_response.txt")
            }
        );
        assert!(!outcome.is_success());
        assert_eq!(
            fs::read_to_string(dir.join("ai_response.txt")).expect("read dump"),
            reply
        );
        for kind in ArtifactKind::ALL {
            assert!(!dir.join(kind.file_name()).exists(), "{kind}");
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let tmp = TempDir::new().expect("tempdir");
        let backend = FakeBackend::failing(401);
        let generator = Generator::with_env(backend.clone(), any_key);
        let err = generator
            .generate(&ai_request("game"), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Provider(ProviderError::Status { .. })
        ));
        assert_eq!(backend.calls(), 1);
        assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_before_network() {
        let tmp = TempDir::new().expect("tempdir");
        let backend = FakeBackend::replying("");
        let generator = Generator::with_env(backend.clone(), any_key);
        let err = generator
            .generate(&ai_request("   "), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::EmptyPrompt));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_inflight_call() {
        let tmp = TempDir::new().expect("tempdir");
        let mut backend = FakeBackend::replying("```html\n<p/>\n```");
        backend.delay = Some(Duration::from_secs(30));
        let generator = Generator::with_env(backend, any_key);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = generator
            .generate_until(&ai_request("game"), tmp.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Provider(ProviderError::Cancelled)
        ));
        assert!(!tmp.path().join("index.html").exists());
    }
}
