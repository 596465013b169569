//! 表单 -> 学生信息 -> 内容生成(+配图) -> 组装 -> 编译 -> 重命名

use std::path::PathBuf;
use tracing::info;

use crate::compiler::CompilationDriver;
use crate::config::AppConfig;
use crate::document;
use crate::enrichment::{self, ImageAsset};
use crate::provider::{ContentProvider, GenerationRequest, ProviderConfig, ProviderKind};
use crate::student::{build_student_record, FormValues};
use crate::utils::{GenError, GenResult};

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub source_path: PathBuf,
    pub artifact_path: PathBuf,
    pub images: Vec<ImageAsset>,
}

pub struct Pipeline<'a, P: ContentProvider> {
    config: &'a AppConfig,
    provider: P,
}

impl<'a, P: ContentProvider> Pipeline<'a, P> {
    pub fn new(config: &'a AppConfig, provider: P) -> Self {
        Self { config, provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn run(
        &self,
        form: &FormValues,
        selection: ProviderKind,
        with_images: bool,
    ) -> GenResult<PipelineOutcome> {
        let student = build_student_record(form, &self.config.institution)?;
        info!(
            "生成任务: {} / {} / {}",
            student.name, student.section_code, student.topic
        );

        let request = GenerationRequest {
            topic: form.topic.trim().to_string(),
            instructions: form.instructions.trim().to_string(),
            student,
            selection,
            config: ProviderConfig::for_kind(selection, self.config),
        };
        self.provider.preflight(&request)?;

        let query = enrichment::build_search_query(&form.topic, &form.subject);
        let images_future = async {
            if with_images {
                enrichment::enrich(&self.config.enrichment, &self.config.paths.image_dir, &query)
                    .await
            } else {
                Vec::new()
            }
        };

        // 配图与内容生成互不依赖，并发进行
        let (content, images) = tokio::join!(self.provider.generate(&request), images_future);
        let content = content?;
        if content.trim().is_empty() {
            return Err(GenError::EmptyContent {
                provider: self.provider.name().to_string(),
            });
        }

        let document = document::assemble(&content, &images, &self.config.paths.output_dir);

        let driver = CompilationDriver::new(&self.config.compiler, &self.config.paths.output_dir);
        let compiled = driver
            .run(&document, &request.student, &self.config.institution.short_name)
            .await?;

        info!("✅ 任务完成: {}", compiled.artifact_path.display());
        Ok(PipelineOutcome {
            source_path: compiled.source_path,
            artifact_path: compiled.artifact_path,
            images,
        })
    }
}
