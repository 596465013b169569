use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::Path;
use tracing::{error, info};

use tareagen::config::{AppConfig, DEFAULT_CONFIG_PATH};
use tareagen::provider::{Provider, ProviderKind};
use tareagen::student::{self, FormValues, Shift};
use tareagen::utils::logger;
use tareagen::Pipeline;

#[derive(Parser)]
#[command(name = "tareagen")]
#[command(about = "根据主题自动生成并编译 LaTeX 作业文档", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化目录和默认配置
    Init,
    /// 生成文档并编译为 PDF
    Generate {
        #[command(flatten)]
        form: FormArgs,
        /// 内容生成后端
        #[arg(long, value_enum, default_value = "openrouter")]
        provider: ProviderKind,
        /// 搜索并插入配图
        #[arg(long)]
        images: bool,
    },
    /// 只校验表单字段
    Validate {
        #[command(flatten)]
        form: FormArgs,
    },
}

#[derive(Args)]
struct FormArgs {
    /// 学生姓名
    #[arg(long)]
    name: String,
    /// 身份证号（8位数字，不含前缀）
    #[arg(long)]
    id: String,
    /// 身份证前缀 V 或 E
    #[arg(long, default_value = "V")]
    id_prefix: String,
    /// 科目
    #[arg(long, default_value = "")]
    subject: String,
    /// 晚班 (DCN)，默认早班 (DCM)
    #[arg(long)]
    night: bool,
    /// 学期 01-13
    #[arg(long)]
    trimester: String,
    /// 小节 01-04
    #[arg(long)]
    section: String,
    /// 评估编号
    #[arg(long, default_value = "1")]
    eval_num: String,
    /// 阶段 (corte)
    #[arg(long, default_value = "1")]
    cut: String,
    /// 主题
    #[arg(long, default_value = "")]
    topic: String,
    /// 具体要求
    #[arg(long, default_value = "")]
    instructions: String,
}

impl From<FormArgs> for FormValues {
    fn from(args: FormArgs) -> Self {
        FormValues {
            name: args.name,
            id_digits: args.id,
            id_prefix: args.id_prefix,
            subject: args.subject,
            shift: if args.night { Shift::Night } else { Shift::Morning },
            trimester: args.trimester,
            subsection: args.section,
            eval_num: args.eval_num,
            cut_num: args.cut,
            topic: args.topic,
            instructions: args.instructions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("tareagen 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Generate {
            form,
            provider,
            images,
        } => {
            generate_command(form.into(), provider, images).await?;
        }
        Commands::Validate { form } => {
            validate_command(form.into())?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化系统...");

    let config = AppConfig::load()?;
    tokio::fs::create_dir_all(&config.paths.output_dir).await?;
    tokio::fs::create_dir_all(&config.paths.image_dir).await?;
    tokio::fs::create_dir_all(&config.paths.logo_dir).await?;
    tokio::fs::create_dir_all("config").await?;

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("配置文件已存在，跳过: {}", DEFAULT_CONFIG_PATH);
    } else {
        AppConfig::default().save(DEFAULT_CONFIG_PATH)?;
        info!("已生成默认配置: {}", DEFAULT_CONFIG_PATH);
    }

    info!("✅ 初始化完成！");
    info!("下一步:");
    info!("  1. 在 config/settings.toml 或环境变量中配置 API 密钥");
    info!(
        "  2. 把院校 logo 放到 {}/{}",
        config.paths.logo_dir, config.institution.logo_file
    );
    info!("  3. 运行 'tareagen generate --help' 查看参数");

    Ok(())
}

async fn generate_command(form: FormValues, kind: ProviderKind, images: bool) -> Result<()> {
    let mut config = AppConfig::load()?;
    if images {
        config.enrichment.enabled = true;
    }

    let provider = Provider::new(kind, &config)?;
    let pipeline = Pipeline::new(&config, provider);

    match pipeline
        .run(&form, kind, config.enrichment.enabled)
        .await
    {
        Ok(outcome) => {
            info!("配图数量: {}", outcome.images.len());
            println!("Tarea generada exitosamente!\nPDF: {}", outcome.artifact_path.display());
            Ok(())
        }
        Err(e) => {
            error!("生成失败: {}", e);
            Err(e.into())
        }
    }
}

fn validate_command(form: FormValues) -> Result<()> {
    student::validate_form(&form)?;
    info!(
        "✅ 校验通过: {} / {}",
        form.id_number(),
        form.section_code()
    );
    Ok(())
}
