use serde::{Deserialize, Serialize};
use tracing::info;

use super::postprocess::{escape_ampersands, substitute_logo_placeholder};
use super::prompt;
use super::{ContentProvider, GenerationRequest, ProviderConfig};
use crate::student::StudentRecord;
use crate::utils::{GenError, GenResult};

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Google Gemini generateContent 接口，只生成正文，再套用完整模板
pub struct GeminiProvider {
    client: reqwest::Client,
    logo_path: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, logo_path: String) -> Self {
        Self { client, logo_path }
    }

    fn settings(cfg: &ProviderConfig) -> GenResult<(&str, &str)> {
        Ok((
            ProviderConfig::require(&cfg.api_key, "GOOGLE_GEMINI_API_KEY")?,
            ProviderConfig::require(&cfg.model_name, "GOOGLE_GEMINI_MODEL")?,
        ))
    }

    fn parse_text(body: &str) -> GenResult<String> {
        let response: GenerateResponse = serde_json::from_str(body)
            .map_err(|e| GenError::provider("Gemini", format!("响应 JSON 解析失败: {e}")))?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| GenError::provider("Gemini", "响应中没有 candidates"))?;

        Ok(content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    /// 正文转义 & 后套进模板，最后替换 logo 占位符
    fn finish(&self, student: &StudentRecord, generated: &str) -> String {
        let document = prompt::render_template(student, &escape_ampersands(generated));
        substitute_logo_placeholder(&document, &self.logo_path)
    }
}

impl ContentProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn preflight(&self, request: &GenerationRequest) -> GenResult<()> {
        Self::settings(&request.config).map(|_| ())
    }

    async fn generate(&self, request: &GenerationRequest) -> GenResult<String> {
        let cfg = &request.config;
        let (api_key, model) = Self::settings(cfg)?;

        let url = format!(
            "{}/models/{}:generateContent",
            cfg.base_url.trim_end_matches('/'),
            model
        );
        info!("调用 Gemini，模型 {}", model);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt::body_only_prompt(&request.topic, &request.instructions),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenError::provider(self.name(), format!("发送请求失败: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenError::provider(self.name(), format!("读取响应失败: {e}")))?;
        if !status.is_success() {
            return Err(GenError::provider(
                self.name(),
                format!("API 返回错误 {}: {}", status, text),
            ));
        }

        let generated = Self::parse_text(&text)?;
        Ok(self.finish(&request.student, &generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{sample_request, ProviderKind};

    #[test]
    fn joins_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"\\section*{A}\n"},{"text":"B"}]}}]}"#;
        assert_eq!(GeminiProvider::parse_text(body).unwrap(), "\\section*{A}\nB");
    }

    #[test]
    fn no_candidates_is_error() {
        assert!(GeminiProvider::parse_text(r#"{"candidates":[]}"#).is_err());
        assert!(GeminiProvider::parse_text("not json").is_err());
    }

    #[test]
    fn body_is_escaped_wrapped_and_logo_resolved() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "../logos/UAH.png".into());
        let request = sample_request(ProviderKind::Gemini, ProviderConfig::default());
        let doc = provider.finish(
            &request.student,
            "TCP & UDP \\& más\n\\includegraphics{%%PROJECT_LOGO_PATH%%}",
        );

        assert!(doc.starts_with("\\documentclass"));
        assert!(doc.contains("\\title{Redes}"));
        assert!(doc.contains("TCP \\& UDP \\& más"));
        assert!(doc.contains("\\includegraphics{../logos/UAH.png}"));
        assert!(!doc.contains("%%PROJECT_LOGO_PATH%%"));
        assert!(doc.trim_end().ends_with("\\end{document}"));
    }

    #[tokio::test]
    async fn missing_key_named_in_error() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "../logos/UAH.png".into());
        let err = provider
            .generate(&sample_request(ProviderKind::Gemini, ProviderConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Configuration { ref key } if key == "GOOGLE_GEMINI_API_KEY"));
    }
}
