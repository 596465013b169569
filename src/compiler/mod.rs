//! 写入 .tex、调用 pdflatex、重命名生成的 PDF
//!
//! 状态流转: Built -> Persisted -> Compiling -> Succeeded | Failed

use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::CompilerConfig;
use crate::student::StudentRecord;
use crate::utils::{GenError, GenResult};

/// 失败信息只保留末尾这么多字符
const DIAGNOSTIC_TAIL_CHARS: usize = 300;
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileState {
    Built,
    Persisted(PathBuf),
    Compiling,
    Succeeded(PathBuf),
    Failed,
}

impl fmt::Display for CompileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileState::Built => write!(f, "built"),
            CompileState::Persisted(p) => write!(f, "persisted({})", p.display()),
            CompileState::Compiling => write!(f, "compiling"),
            CompileState::Succeeded(p) => write!(f, "succeeded({})", p.display()),
            CompileState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub source_path: PathBuf,
    pub artifact_path: PathBuf,
}

pub struct CompilationDriver {
    output_dir: PathBuf,
    binary: String,
    source_ext: String,
    output_ext: String,
    timeout: Duration,
}

/// 把常见西语重音字母折叠成 ASCII
fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        other => other,
    }
}

/// 只保留 [A-Za-z0-9 -._]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '.' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// 最终文件名。id 本身已带 "V-" 前缀，这里仍按原格式再加一个 "V"
pub fn artifact_name(record: &StudentRecord, institution_suffix: &str, ext: &str) -> String {
    let raw = format!(
        "{} - V{} - {} - {} - Ev. {} Corte {} - {}.{}",
        record.name,
        record.id_number,
        record.subject,
        record.section_code,
        record.evaluation_number,
        record.cut_number,
        institution_suffix,
        ext,
    );
    sanitize_filename(&raw)
}

/// 取末尾 n 个字符（按字符边界）
pub fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

impl CompilationDriver {
    pub fn new(config: &CompilerConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            binary: config.binary.clone(),
            source_ext: config.source_ext.clone(),
            output_ext: config.output_ext.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入 <section>_<时间戳>.tex；同一秒内重名时追加 _1、_2 ...
    pub fn persist(&self, document: &str, section_code: &str) -> GenResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| GenError::fs(&self.output_dir, e))?;

        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let base = format!("{}_{}", section_code, stamp);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}.{}", base, self.source_ext)
            } else {
                format!("{}_{}.{}", base, attempt, self.source_ext)
            };
            let path = self.output_dir.join(file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(document.as_bytes())
                        .map_err(|e| GenError::fs(&path, e))?;
                    info!("LaTeX 源文件已写入: {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("文件已存在，改用新文件名: {}", path.display());
                }
                Err(e) => return Err(GenError::fs(&path, e)),
            }
        }
        let path = self.output_dir.join(format!("{}.{}", base, self.source_ext));
        Err(GenError::fs(path, ErrorKind::AlreadyExists.into()))
    }

    /// 阻塞等待编译器退出；超时则终止子进程
    pub async fn compile(&self, source: &Path) -> GenResult<PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| GenError::fs(source, ErrorKind::InvalidInput.into()))?;

        info!(
            "执行编译命令: {} -halt-on-error {} (cwd: {})",
            self.binary,
            file_name.to_string_lossy(),
            self.output_dir.display()
        );

        let child = Command::new(&self.binary)
            .arg("-halt-on-error")
            .arg(file_name)
            .current_dir(&self.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenError::Compilation {
                code: None,
                stderr_tail: format!("无法启动 {}: {}", self.binary, e),
            })?;

        // 超时后 wait 的 future 被丢弃，kill_on_drop 负责杀掉子进程
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| GenError::Compilation {
                code: None,
                stderr_tail: format!("等待编译进程失败: {}", e),
            })?,
            Err(_) => {
                error!("编译超时 ({}s)，进程已终止", self.timeout.as_secs());
                return Err(GenError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            error!("LaTeX 输出 (stderr): {}", stderr);
            // pdflatex 的错误通常写在 stdout
            let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(GenError::Compilation {
                code: output.status.code(),
                stderr_tail: tail_chars(&diagnostic, DIAGNOSTIC_TAIL_CHARS),
            });
        }

        let artifact = source.with_extension(&self.output_ext);
        if !artifact.exists() {
            return Err(GenError::fs(&artifact, ErrorKind::NotFound.into()));
        }
        Ok(artifact)
    }

    /// 在同一目录内重命名，目标已存在时报错而不是覆盖
    pub fn finalize(
        &self,
        artifact: &Path,
        record: &StudentRecord,
        institution_suffix: &str,
    ) -> GenResult<PathBuf> {
        let dir = artifact.parent().unwrap_or(&self.output_dir);
        let target = dir.join(artifact_name(record, institution_suffix, &self.output_ext));

        if target.exists() {
            return Err(GenError::fs(&target, ErrorKind::AlreadyExists.into()));
        }
        std::fs::rename(artifact, &target).map_err(|e| GenError::fs(&target, e))?;
        info!("PDF 已重命名: {}", target.display());
        Ok(target)
    }

    pub async fn run(
        &self,
        document: &str,
        record: &StudentRecord,
        institution_suffix: &str,
    ) -> GenResult<CompiledArtifact> {
        let mut state = CompileState::Built;
        info!("编译状态: {}", state);

        let source = self.persist(document, &record.section_code)?;
        state = CompileState::Persisted(source.clone());
        info!("编译状态: {}", state);

        state = CompileState::Compiling;
        info!("编译状态: {}", state);
        let artifact = match self.compile(&source).await {
            Ok(a) => a,
            Err(e) => {
                state = CompileState::Failed;
                error!("编译状态: {}，源文件保留在 {}", state, source.display());
                return Err(e);
            }
        };

        let artifact_path = self.finalize(&artifact, record, institution_suffix)?;
        state = CompileState::Succeeded(artifact_path.clone());
        info!("编译状态: {}", state);

        Ok(CompiledArtifact {
            source_path: source,
            artifact_path,
        })
    }
}
