use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::error::{GenerateError, ProviderError};
use crate::models::{Credential, Message};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE: &str = "https://api.deepseek.com/v1";
const ZHIPU_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";

pub const DEFAULT_MODEL: &str = "gpt-4o";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 8000;

pub const SYSTEM_PROMPT: &str = r#"你是一个专业的HTML5游戏开发者。用户会给你游戏需求，你需要生成完整可运行的游戏代码。

输出格式要求：
1. 必须输出三个代码块，分别是 index.html, style.css, game.js
2. 使用 ```html, ```css, ```javascript 标记代码块
3. index.html 必须引用 style.css 和 game.js
4. 游戏必须是完整可运行的，打开index.html即可游玩
5. 使用现代CSS和原生JavaScript，不要使用任何外部库
6. 添加适当的响应式设计，支持移动端
7. 包含游戏说明和控制方式提示"#;

/**
 * \brief 环境变量读取函数，测试中可替换。
 */
pub type EnvLookup = fn(&str) -> Option<String>;

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/**
 * \brief 请求使用的线路协议。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    OpenAICompatible { api_base: &'static str },
}

/**
 * \brief 按模型名选出的供应商；每次请求重新计算。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelection {
    Anthropic,
    DeepSeek,
    Zhipu,
    OpenAI,
}

impl ProviderSelection {
    pub fn kind(self) -> ProviderKind {
        match self {
            Self::Anthropic => ProviderKind::Claude,
            Self::DeepSeek => ProviderKind::OpenAICompatible {
                api_base: DEEPSEEK_BASE,
            },
            Self::Zhipu => ProviderKind::OpenAICompatible {
                api_base: ZHIPU_BASE,
            },
            Self::OpenAI => ProviderKind::OpenAICompatible {
                api_base: OPENAI_BASE,
            },
        }
    }

    /** \brief 接受的环境变量名，按优先级排列。 */
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::DeepSeek => &["DEEPSEEK_API_KEY"],
            Self::Zhipu => &["ZHIPU_API_KEY", "GLM_API_KEY"],
            Self::OpenAI => &["OPENAI_API_KEY"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Anthropic => "Claude",
            Self::DeepSeek => "DeepSeek",
            Self::Zhipu => "Zhipu GLM",
            Self::OpenAI => "OpenAI",
        }
    }
}

/**
 * \brief 根据模型名（不区分大小写）选择供应商。
 * \details 依次检查 claude、deepseek、glm，先命中者优先；都不含时回落到 OpenAI。
 */
pub fn select_provider(model: &str) -> ProviderSelection {
    let model = model.to_ascii_lowercase();
    if model.contains("claude") {
        ProviderSelection::Anthropic
    } else if model.contains("deepseek") {
        ProviderSelection::DeepSeek
    } else if model.contains("glm") {
        ProviderSelection::Zhipu
    } else {
        ProviderSelection::OpenAI
    }
}

/**
 * \brief 解析密钥：显式传入 > 环境变量；空字符串视为未设置。
 */
pub fn resolve_credential(
    selection: ProviderSelection,
    explicit: Option<&Credential>,
    env: EnvLookup,
) -> Result<Credential, GenerateError> {
    if let Some(cred) = explicit.filter(|c| !c.expose().is_empty()) {
        return Ok(cred.clone());
    }
    selection
        .env_vars()
        .iter()
        .find_map(|name| env(name).filter(|v| !v.is_empty()))
        .map(Credential::new)
        .ok_or(GenerateError::MissingCredential {
            provider: selection.label(),
            env_vars: selection.env_vars(),
        })
}

/**
 * \brief 固定的 system + user 消息对。
 */
pub fn game_messages(prompt: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("请创建以下游戏：\n{}", prompt)),
    ]
}

/**
 * \brief 统一的"文本进、文本出"调用接口。
 */
pub trait ChatBackend {
    fn invoke(
        &self,
        prompt: &str,
        model: &str,
        credential: &Credential,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/**
 * \brief 各供应商的 API 基地址，默认指向官方服务。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /** \brief Anthropic 基地址，不含 /v1 */
    pub anthropic: String,
    pub openai: String,
    pub deepseek: String,
    pub zhipu: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            anthropic: ANTHROPIC_BASE.to_string(),
            openai: OPENAI_BASE.to_string(),
            deepseek: DEEPSEEK_BASE.to_string(),
            zhipu: ZHIPU_BASE.to_string(),
        }
    }
}

impl Endpoints {
    pub fn base(&self, selection: ProviderSelection) -> &str {
        match selection {
            ProviderSelection::Anthropic => &self.anthropic,
            ProviderSelection::DeepSeek => &self.deepseek,
            ProviderSelection::Zhipu => &self.zhipu,
            ProviderSelection::OpenAI => &self.openai,
        }
    }
}

/**
 * \brief 基于 reqwest 的真实后端，单次请求、不重试。
 */
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoints(timeout, Endpoints::default())
    }

    pub fn with_endpoints(timeout: Duration, endpoints: Endpoints) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoints })
    }
}

impl ChatBackend for HttpBackend {
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        credential: &Credential,
    ) -> Result<String, ProviderError> {
        let messages = game_messages(prompt);
        let selection = select_provider(model);
        let api_base = self.endpoints.base(selection);
        match selection.kind() {
            ProviderKind::Claude => {
                chat_once_claude(&self.http, api_base, model, credential, &messages).await
            }
            ProviderKind::OpenAICompatible { .. } => {
                chat_once_openai(&self.http, api_base, model, credential, &messages).await
            }
        }
    }
}

async fn chat_once_openai(
    client: &reqwest::Client,
    api_base: &str,
    model: &str,
    credential: &Credential,
    messages: &[Message],
) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    let body = openai_body(model, messages);

    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: "openai-compatible",
            status,
            body: text,
        });
    }
    let v: Value = resp.json().await?;
    Ok(extract_openai_content(&v))
}

async fn chat_once_claude(
    client: &reqwest::Client,
    api_base: &str,
    model: &str,
    credential: &Credential,
    messages: &[Message],
) -> Result<String, ProviderError> {
    let url = format!("{}/v1/messages", api_base.trim_end_matches('/'));
    let body = claude_body(model, messages);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("x-api-key", HeaderValue::from_str(credential.expose())?);
    headers.insert(
        "anthropic-version",
        HeaderValue::from_static(ANTHROPIC_VERSION),
    );

    let resp = client.post(url).headers(headers).json(&body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: "claude",
            status,
            body: text,
        });
    }
    let v: Value = resp.json().await?;
    Ok(extract_anthropic_content(&v))
}

fn openai_body(model: &str, messages: &[Message]) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
    })
}

fn claude_body(model: &str, messages: &[Message]) -> Value {
    let (system_prompt, payload_messages) = anthropic_payload(messages);
    let mut body = json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": payload_messages,
    });
    if let Some(sys) = system_prompt {
        body["system"] = json!(sys);
    }
    body
}

fn extract_openai_content(v: &Value) -> String {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_anthropic_content(v: &Value) -> String {
    v.get("content")
        .and_then(|arr| arr.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

fn anthropic_payload(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut items = Vec::new();
    for msg in messages {
        match msg.role.as_str() {
            "system" => system_parts.push(msg.content.clone()),
            "assistant" => items.push(json!({
                "role": "assistant",
                "content": [{"type": "text", "text": msg.content}]
            })),
            _ => items.push(json!({
                "role": "user",
                "content": [{"type": "text", "text": msg.content}]
            })),
        }
    }
    let system_prompt = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system_prompt, items)
}
