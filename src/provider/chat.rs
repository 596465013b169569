//! OpenAI 风格 chat/completions 的请求与响应结构

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::{GenError, GenResult};

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
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

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// 取 choices[0].message.content
pub fn parse_chat_content(provider: &str, body: &str) -> GenResult<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenError::provider(provider, format!("响应 JSON 解析失败: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenError::provider(provider, "响应中缺少 choices[0].message.content"))
}

/// 单次 POST，不重试；非 2xx 视为失败
pub async fn post_chat(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: &str,
    extra_headers: &[(&str, &str)],
    request: &ChatRequest,
) -> GenResult<String> {
    debug!("POST {} (model {})", url, request.model);

    let mut builder = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json");
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    let response = builder
        .json(request)
        .send()
        .await
        .map_err(|e| GenError::provider(provider, format!("发送请求失败: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GenError::provider(provider, format!("读取响应失败: {e}")))?;

    if !status.is_success() {
        return Err(GenError::provider(
            provider,
            format!("API 返回错误 {}: {}", status, body),
        ));
    }

    parse_chat_content(provider, &body)
}
