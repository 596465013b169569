use tracing::info;

use super::chat::{post_chat, ChatMessage, ChatRequest};
use super::postprocess::{strip_reasoning_tags, substitute_logo_placeholder};
use super::prompt;
use super::{ContentProvider, GenerationRequest, ProviderConfig};
use crate::utils::GenResult;

/// 任意 OpenAI 兼容端点（key、base_url、model 均可按次覆盖）
pub struct OpenAiProvider {
    client: reqwest::Client,
    logo_path: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, logo_path: String) -> Self {
        Self { client, logo_path }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn settings(cfg: &ProviderConfig) -> GenResult<(&str, &str, &str)> {
        Ok((
            ProviderConfig::require(&cfg.api_key, "OPENAI_API_KEY")?,
            ProviderConfig::require(&cfg.base_url, "OPENAI_BASE_URL")?,
            ProviderConfig::require(&cfg.model_name, "OPENAI_MODEL")?,
        ))
    }

    pub(crate) fn finish(&self, raw: String, reasoning_filter: bool) -> String {
        let text = if reasoning_filter {
            info!("过滤推理段 (<think> 标签)...");
            strip_reasoning_tags(&raw)
        } else {
            raw
        };
        substitute_logo_placeholder(&text, &self.logo_path)
    }
}

impl ContentProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn preflight(&self, request: &GenerationRequest) -> GenResult<()> {
        Self::settings(&request.config).map(|_| ())
    }

    async fn generate(&self, request: &GenerationRequest) -> GenResult<String> {
        let cfg = &request.config;
        let (api_key, base_url, model) = Self::settings(cfg)?;

        info!("连接 OpenAI 兼容接口 {}，模型 {}", base_url, model);

        let chat = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(prompt::system_prompt()),
                ChatMessage::user(prompt::full_document_prompt(
                    &request.topic,
                    &request.instructions,
                    &request.student,
                )),
            ],
            temperature: 0.7,
        };

        let raw = post_chat(
            &self.client,
            self.name(),
            &Self::endpoint(base_url),
            api_key,
            &[],
            &chat,
        )
        .await?;

        Ok(self.finish(raw, cfg.reasoning_filter_enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{sample_request, ProviderKind};
    use crate::utils::GenError;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(reqwest::Client::new(), "../logos/UAH.png".to_string())
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            OpenAiProvider::endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn finish_applies_filter_and_logo() {
        let raw = "<think>razonando</think>\\includegraphics{%%PROJECT_LOGO_PATH%%}".to_string();
        assert_eq!(
            provider().finish(raw.clone(), true),
            "\\includegraphics{../logos/UAH.png}"
        );
        assert!(provider().finish(raw, false).starts_with("<think>razonando</think>"));
    }

    #[tokio::test]
    async fn missing_model_is_configuration_error() {
        let cfg = ProviderConfig {
            api_key: "sk".into(),
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let err = provider()
            .generate(&sample_request(ProviderKind::Openai, cfg))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Configuration { ref key } if key == "OPENAI_MODEL"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_provider_error() {
        let cfg = ProviderConfig {
            api_key: "sk".into(),
            base_url: "http://127.0.0.1:9".into(),
            model_name: "m".into(),
            reasoning_filter_enabled: false,
        };
        let err = provider()
            .generate(&sample_request(ProviderKind::Openai, cfg))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Provider { .. }));
    }
}
