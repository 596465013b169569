//! 把模型输出整理成可直接编译的 LaTeX 文本，不做任何 I/O

use std::path::{Component, Path, PathBuf};

use crate::enrichment::ImageAsset;

const FENCE_OPEN: &str = "```latex";
const FENCE_CLOSE: &str = "```";
const END_DOCUMENT: &str = "\\end{document}";

/// 去掉所有 ```latex 和 ``` 标记（幂等）
pub fn strip_code_fences(body: &str) -> String {
    body.replace(FENCE_OPEN, "").replace(FENCE_CLOSE, "")
}

/// 编译在 output_dir 中进行，图片路径要换成从那里出发能找到的形式
///
/// 绝对路径原样保留；相对路径按 output_dir 的层数补 "../"。
pub fn relative_to_output_dir(path: &Path, output_dir: &Path) -> String {
    let resolved: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else if output_dir.is_absolute() {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    } else {
        let depth = output_dir
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count();
        let mut up = PathBuf::new();
        for _ in 0..depth {
            up.push("..");
        }
        up.join(path.strip_prefix(".").unwrap_or(path))
    };
    resolved.to_string_lossy().replace('\\', "/")
}

/// 为每张图片生成 figure 块，标题编号从 1 开始
pub fn build_attachments_section(assets: &[ImageAsset], output_dir: &Path) -> String {
    let mut section = String::from("\n\n\\section*{Anexos Gráficos}\n");

    for (i, asset) in assets.iter().enumerate() {
        section.push_str("\\begin{figure}[h!]\n\\centering\n");
        section.push_str(&format!(
            "\\includegraphics[width=0.75\\textwidth]{{{}}}\n",
            relative_to_output_dir(&asset.local_path, output_dir)
        ));
        section.push_str(&format!("\\caption{{Imagen ilustrativa {}}}\n", i + 1));
        section.push_str("\\end{figure}\n\\clearpage\n");
    }

    section
}

/// 附图插入到 \end{document} 之前，没有结束标记则追加到末尾
pub fn inject_images(content: &str, assets: &[ImageAsset], output_dir: &Path) -> String {
    if assets.is_empty() {
        return content.to_string();
    }

    let section = build_attachments_section(assets, output_dir);
    match content.rfind(END_DOCUMENT) {
        Some(pos) => {
            let mut out = String::with_capacity(content.len() + section.len());
            out.push_str(&content[..pos]);
            out.push_str(&section);
            out.push_str(&content[pos..]);
            out
        }
        None => format!("{}{}", content, section),
    }
}

pub fn assemble(provider_output: &str, assets: &[ImageAsset], output_dir: &Path) -> String {
    inject_images(&strip_code_fences(provider_output), assets, output_dir)
}
