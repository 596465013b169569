pub mod logger;

use std::path::PathBuf;
use thiserror::Error;

/// 生成流程的错误分类
#[derive(Error, Debug)]
pub enum GenError {
    /// 表单校验失败，聚合所有违规项
    #[error("表单校验失败:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("配置错误: 缺少 {key}")]
    Configuration { key: String },

    #[error("{provider} 调用失败: {detail}")]
    Provider { provider: String, detail: String },

    #[error("{provider} 未返回任何内容")]
    EmptyContent { provider: String },

    #[error("LaTeX 编译失败 (退出码 {code:?}): {stderr_tail}")]
    Compilation { code: Option<i32>, stderr_tail: String },

    #[error("编译超时 ({secs}s)，已终止编译进程")]
    Timeout { secs: u64 },

    #[error("文件操作失败 {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    pub fn provider(provider: &str, detail: impl ToString) -> Self {
        GenError::Provider {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn missing(key: &str) -> Self {
        GenError::Configuration {
            key: key.to_string(),
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_violation() {
        let err = GenError::Validation(vec!["缺少主题".into(), "缺少要求".into()]);
        let msg = err.to_string();
        assert!(msg.contains("缺少主题"));
        assert!(msg.contains("缺少要求"));
    }

    #[test]
    fn configuration_error_names_key() {
        let err = GenError::missing("OPENAI_API_KEY");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
