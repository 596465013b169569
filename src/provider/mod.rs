pub mod chat;
pub mod gemini;
pub mod openai;
pub mod openrouter;
pub mod postprocess;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::student::StudentRecord;
use crate::utils::{GenError, GenResult};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;

/// 可选的内容生成后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Openrouter,
    Openai,
}

/// 单次调用的凭据与端点，空字符串表示未配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub reasoning_filter_enabled: bool,
}

impl ProviderConfig {
    pub fn for_kind(kind: ProviderKind, config: &AppConfig) -> Self {
        match kind {
            ProviderKind::Gemini => Self {
                api_key: config.gemini.api_key.clone(),
                base_url: config.gemini.api_url.clone(),
                model_name: config.gemini.model.clone(),
                reasoning_filter_enabled: false,
            },
            ProviderKind::Openrouter => Self {
                api_key: config.openrouter.api_key.clone(),
                base_url: config.openrouter.api_url.clone(),
                model_name: config.openrouter.model.clone(),
                reasoning_filter_enabled: false,
            },
            ProviderKind::Openai => Self {
                api_key: config.openai.api_key.clone(),
                base_url: config.openai.base_url.clone(),
                model_name: config.openai.model.clone(),
                reasoning_filter_enabled: config.openai.reasoning_filter,
            },
        }
    }

    /// 网络调用前检查必填项
    pub(crate) fn require<'a>(value: &'a str, key: &str) -> GenResult<&'a str> {
        if value.trim().is_empty() {
            Err(GenError::missing(key))
        } else {
            Ok(value)
        }
    }
}

/// 一次生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub instructions: String,
    pub student: StudentRecord,
    pub selection: ProviderKind,
    pub config: ProviderConfig,
}

/// 根据主题、要求和学生信息生成 LaTeX 文档正文
///
/// 实现负责替换 logo 占位符后再返回。
#[allow(async_fn_in_trait)]
pub trait ContentProvider {
    fn name(&self) -> &'static str;

    /// 不发请求，只检查凭据是否齐全
    fn preflight(&self, _request: &GenerationRequest) -> GenResult<()> {
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest) -> GenResult<String>;
}

/// 按配置选择的具体后端
pub enum Provider {
    Gemini(GeminiProvider),
    OpenRouter(OpenRouterProvider),
    OpenAi(OpenAiProvider),
}

impl Provider {
    pub fn new(kind: ProviderKind, config: &AppConfig) -> GenResult<Self> {
        let client = build_client(kind)?;
        let logo_path = config
            .institution
            .logo_relative_path(&config.paths.logo_dir);

        info!("选择内容生成后端: {:?}", kind);

        Ok(match kind {
            ProviderKind::Gemini => Provider::Gemini(GeminiProvider::new(client, logo_path)),
            ProviderKind::Openrouter => Provider::OpenRouter(OpenRouterProvider::new(
                client,
                logo_path,
                config.openrouter.referer.clone(),
                config.openrouter.title.clone(),
            )),
            ProviderKind::Openai => Provider::OpenAi(OpenAiProvider::new(client, logo_path)),
        })
    }
}

impl ContentProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::Gemini(p) => p.name(),
            Provider::OpenRouter(p) => p.name(),
            Provider::OpenAi(p) => p.name(),
        }
    }

    fn preflight(&self, request: &GenerationRequest) -> GenResult<()> {
        match self {
            Provider::Gemini(p) => p.preflight(request),
            Provider::OpenRouter(p) => p.preflight(request),
            Provider::OpenAi(p) => p.preflight(request),
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> GenResult<String> {
        let content = match self {
            Provider::Gemini(p) => p.generate(request).await?,
            Provider::OpenRouter(p) => p.generate(request).await?,
            Provider::OpenAi(p) => p.generate(request).await?,
        };
        info!("{} 生成完成，长度: {} 字符", self.name(), content.chars().count());
        Ok(content)
    }
}

fn build_client(kind: ProviderKind) -> GenResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(180))
        .build()
        .map_err(|e| GenError::provider(&format!("{kind:?}"), format!("创建 HTTP 客户端失败: {e}")))
}

#[cfg(test)]
pub(crate) fn sample_request(kind: ProviderKind, config: ProviderConfig) -> GenerationRequest {
    GenerationRequest {
        topic: "Modelo OSI".to_string(),
        instructions: "Explicar las capas".to_string(),
        student: StudentRecord {
            name: "Ana Pérez".into(),
            id_number: "V-12345678".into(),
            subject: "Redes".into(),
            section_code: "DCM0101".into(),
            institution: "Universidad Alejandro de Humboldt".into(),
            program: "Ing. En Informática".into(),
            evaluation_number: "2".into(),
            cut_number: "1".into(),
            date: "01/02/2026".into(),
            topic: "Modelo OSI".into(),
        },
        selection: kind,
        config,
    }
}
