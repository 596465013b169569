use tracing::info;

use super::chat::{post_chat, ChatMessage, ChatRequest};
use super::postprocess::substitute_logo_placeholder;
use super::prompt;
use super::{ContentProvider, GenerationRequest, ProviderConfig};
use crate::utils::GenResult;

/// OpenRouter 固定端点，带 HTTP-Referer / X-Title 署名头
pub struct OpenRouterProvider {
    client: reqwest::Client,
    logo_path: String,
    referer: String,
    title: String,
}

impl OpenRouterProvider {
    pub fn new(client: reqwest::Client, logo_path: String, referer: String, title: String) -> Self {
        Self {
            client,
            logo_path,
            referer,
            title,
        }
    }

    fn settings(cfg: &ProviderConfig) -> GenResult<(&str, &str, &str)> {
        Ok((
            ProviderConfig::require(&cfg.api_key, "OPENROUTER_API_KEY")?,
            ProviderConfig::require(&cfg.model_name, "OPENROUTER_MODEL")?,
            ProviderConfig::require(&cfg.base_url, "OPENROUTER_API_URL")?,
        ))
    }

    fn attribution_headers(&self) -> [(&str, &str); 2] {
        [
            ("HTTP-Referer", self.referer.as_str()),
            ("X-Title", self.title.as_str()),
        ]
    }

    fn finish(&self, raw: &str) -> String {
        substitute_logo_placeholder(raw, &self.logo_path)
    }
}

impl ContentProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    fn preflight(&self, request: &GenerationRequest) -> GenResult<()> {
        Self::settings(&request.config).map(|_| ())
    }

    async fn generate(&self, request: &GenerationRequest) -> GenResult<String> {
        let (api_key, model, url) = Self::settings(&request.config)?;

        info!("调用 OpenRouter，模型 {}", model);

        let chat = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt::full_document_prompt(
                &request.topic,
                &request.instructions,
                &request.student,
            ))],
            temperature: 0.7,
        };

        let headers = self.attribution_headers();
        let raw = post_chat(&self.client, self.name(), url, api_key, &headers, &chat).await?;

        Ok(self.finish(&raw))
    }
}
