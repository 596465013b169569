pub mod institution;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use institution::InstitutionConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

/// 进程级配置，启动时加载一次，之后只读传递
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub openrouter: OpenRouterConfig,
    pub openai: OpenAiConfig,
    pub institution: InstitutionConfig,
    pub paths: PathsConfig,
    pub enrichment: EnrichmentConfig,
    pub compiler: CompilerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub referer: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// 是否过滤 <think>...</think> 推理段
    pub reasoning_filter: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub image_dir: PathBuf,
    pub logo_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub limit: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub search_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub binary: String,
    pub timeout_secs: u64,
    pub source_ext: String,
    pub output_ext: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// 默认值 < settings.toml < TAREAGEN__* 环境变量 < 旧版扁平环境变量
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = toml::to_string(&AppConfig::default())?;
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Toml));

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TAREAGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 兼容原有 .env 里的变量名
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GOOGLE_GEMINI_API_KEY") {
            self.gemini.api_key = v;
        }
        if let Some(v) = get("GOOGLE_GEMINI_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.openrouter.api_key = v;
        }
        if let Some(v) = get("OPENROUTER_MODEL") {
            self.openrouter.model = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai.model = v;
        }
        if let Some(v) = get("REASONING_FILTER") {
            self.openai.reasoning_filter = parse_truthy(&v);
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn parse_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "t" | "yes"
    )
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            referer: "https://github.com/user/proyecto_tareas".to_string(),
            title: "Generador de Tareas Universitarias".to_string(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            reasoning_filter: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_docs"),
            image_dir: PathBuf::from("temp_images"),
            logo_dir: "logos".to_string(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 3,
            timeout_secs: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            search_url: "https://www.google.com/search".to_string(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            binary: "pdflatex".to_string(),
            timeout_secs: 120,
            source_ext: "tex".to_string(),
            output_ext: "pdf".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn truthy_values() {
        for v in ["true", "TRUE", "1", "t", "Yes"] {
            assert!(parse_truthy(v), "{v}");
        }
        for v in ["false", "0", "no", ""] {
            assert!(!parse_truthy(v), "{v}");
        }
    }

    #[test]
    fn legacy_env_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "deepseek-r1"),
            ("REASONING_FILTER", "yes"),
            ("OPENROUTER_MODEL", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.model, "deepseek-r1");
        assert!(config.openai.reasoning_filter);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        // 空白值不覆盖
        assert!(config.openrouter.model.is_empty());
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[compiler]\nbinary = \"xelatex\"\ntimeout_secs = 30\n\n[enrichment]\nlimit = 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.compiler.binary, "xelatex");
        assert_eq!(config.compiler.timeout_secs, 30);
        assert_eq!(config.compiler.output_ext, "pdf");
        assert_eq!(config.enrichment.limit, 5);
        assert_eq!(config.institution.short_name, "UAH");
    }
}
