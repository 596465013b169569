//! 尽力而为的配图下载：任何失败都只记录日志，结果退化为空列表

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EnrichmentConfig;

const MIN_DIMENSION: u32 = 50;
const THUMBNAIL_HOST: &str = "gstatic.com";
const LOGO_PATH_MARKER: &str = "/images/branding/";

/// 下载并转码后的本地图片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub local_path: PathBuf,
    pub ordinal: usize,
}

pub struct ImageScraper {
    client: Client,
    search_url: String,
    image_dir: PathBuf,
}

/// 主题 + 科目（非空时）作为搜索词
pub fn build_search_query(topic: &str, subject: &str) -> String {
    let topic = topic.trim();
    let subject = subject.trim();
    if subject.is_empty() {
        topic.to_string()
    } else {
        format!("{} {}", topic, subject)
    }
}

/// 只保留 ASCII 字母数字，其余替换为下划线，最长 40 个字符
pub fn sanitize_stem(query: &str) -> String {
    query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(40)
        .collect()
}

/// 过滤规则：绝对 http(s) 地址、缩略图 CDN 主机、不是搜索引擎自己的 logo
pub fn is_candidate(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let host_ok = parsed
        .host_str()
        .map(|h| h.ends_with(THUMBNAIL_HOST))
        .unwrap_or(false);
    host_ok && !parsed.path().contains(LOGO_PATH_MARKER)
}

/// 按出现顺序提取 <img> 的 src；src 不合格时再看懒加载的 data-src
pub fn extract_candidates(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").unwrap();

    document
        .select(&selector)
        .filter_map(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .filter(|s| is_candidate(s))
                .or_else(|| attrs.attr("data-src").filter(|s| is_candidate(s)))
                .map(str::to_string)
        })
        .collect()
}

/// 解码、检查尺寸、去掉调色板/透明通道后以 JPEG 保存
pub fn normalize_and_save(bytes: &[u8], path: &Path) -> Result<()> {
    let img = image::load_from_memory(bytes).context("无法解码图片")?;
    if img.width() < MIN_DIMENSION || img.height() < MIN_DIMENSION {
        anyhow::bail!("图片过小: {}x{}", img.width(), img.height());
    }

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.save_with_format(path, ImageFormat::Jpeg)
        .with_context(|| format!("保存失败: {}", path.display()))?;
    Ok(())
}

impl ImageScraper {
    pub fn new(config: &EnrichmentConfig, image_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            image_dir,
        })
    }

    /// 返回最多 limit 张图片，任何错误都吞掉
    pub async fn download_images(&self, query: &str, limit: usize) -> Vec<ImageAsset> {
        match self.try_download(query, limit).await {
            Ok(assets) => {
                info!("配图下载完成: {} 张", assets.len());
                assets
            }
            Err(e) => {
                warn!("配图下载失败，跳过: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn try_download(&self, query: &str, limit: usize) -> Result<Vec<ImageAsset>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .with_context(|| format!("无法创建目录 {}", self.image_dir.display()))?;

        info!("搜索配图: {}", query);
        let html = self.fetch_search_page(query).await?;
        let candidates = extract_candidates(&html);
        debug!("候选图片 {} 个", candidates.len());

        if candidates.is_empty() {
            // 搜索页结构变化时这里会是空的，属于正常结果
            info!("没有找到可用的候选图片");
        }

        let stem = sanitize_stem(query);
        let mut assets = Vec::new();
        for url in candidates {
            if assets.len() >= limit {
                break;
            }
            let ordinal = assets.len();
            let path = self.image_dir.join(format!("img_{}_{}.jpg", stem, ordinal));
            match self.fetch_image(&url, &path).await {
                Ok(()) => {
                    debug!("已保存 {}", path.display());
                    assets.push(ImageAsset {
                        local_path: path,
                        ordinal,
                    });
                }
                Err(e) => debug!("跳过候选 {}: {:#}", url, e),
            }
        }

        Ok(assets)
    }

    async fn fetch_search_page(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("tbm", "isch")])
            .send()
            .await
            .context("搜索请求失败")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("搜索页返回 {}", status);
        }
        Ok(response.text().await?)
    }

    async fn fetch_image(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("下载返回 {}", response.status());
        }
        let bytes = response.bytes().await?;
        normalize_and_save(&bytes, path)
    }
}

/// 构建抓取器并下载；构建失败同样返回空列表
pub async fn enrich(config: &EnrichmentConfig, image_dir: &Path, query: &str) -> Vec<ImageAsset> {
    match ImageScraper::new(config, image_dir.to_path_buf()) {
        Ok(scraper) => scraper.download_images(query, config.limit).await,
        Err(e) => {
            warn!("配图功能不可用: {:#}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(w, h, Rgba([200u8, 10, 10, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn search_query_combines_subject() {
        assert_eq!(build_search_query("Modelo OSI", "Redes"), "Modelo OSI Redes");
        assert_eq!(build_search_query("Modelo OSI", " "), "Modelo OSI");
    }

    #[test]
    fn stem_is_filesystem_safe() {
        assert_eq!(sanitize_stem("Modelo OSI/Redes?"), "Modelo_OSI_Redes_");
        assert_eq!(sanitize_stem(&"a".repeat(100)).len(), 40);
    }

    #[test]
    fn candidate_filter() {
        assert!(is_candidate("https://encrypted-tbn0.gstatic.com/images?q=tbn:abc"));
        assert!(!is_candidate("https://www.gstatic.com/images/branding/searchlogo/1x/g.png"));
        assert!(!is_candidate("/images/nav_logo.png"));
        assert!(!is_candidate("data:image/gif;base64,R0lGOD"));
        assert!(!is_candidate("https://example.com/cat.jpg"));
    }

    #[test]
    fn extracts_in_document_order_with_lazy_fallback() {
        let html = r#"
            <html><body>
              <img src="https://www.gstatic.com/images/branding/googlelogo.png">
              <img src="https://encrypted-tbn0.gstatic.com/images?q=1">
              <img src="data:image/gif;base64,AAAA" data-src="https://encrypted-tbn0.gstatic.com/images?q=2">
              <img src="https://example.com/x.png">
              <img alt="no source">
              <img src="https://encrypted-tbn0.gstatic.com/images?q=3">
            </body></html>"#;
        assert_eq!(
            extract_candidates(html),
            vec![
                "https://encrypted-tbn0.gstatic.com/images?q=1",
                "https://encrypted-tbn0.gstatic.com/images?q=2",
                "https://encrypted-tbn0.gstatic.com/images?q=3",
            ]
        );
    }

    #[test]
    fn rejected_http_src_falls_back_to_data_src() {
        let html = r#"
            <img src="https://example.com/placeholder.png" data-src="https://encrypted-tbn0.gstatic.com/images?q=7">
            <img src="https://www.gstatic.com/images/branding/logo.png" data-src="https://example.com/y.png">
            <img src="https://encrypted-tbn0.gstatic.com/images?q=8" data-src="https://encrypted-tbn0.gstatic.com/images?q=9">"#;
        assert_eq!(
            extract_candidates(html),
            vec![
                "https://encrypted-tbn0.gstatic.com/images?q=7",
                "https://encrypted-tbn0.gstatic.com/images?q=8",
            ]
        );
    }

    #[test]
    fn small_images_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.jpg");
        assert!(normalize_and_save(&png_bytes(49, 200), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn alpha_image_reencoded_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.jpg");
        normalize_and_save(&png_bytes(60, 50), &path).unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (60, 50));
        assert!(!saved.color().has_alpha());
        assert_eq!(image::guess_format(&std::fs::read(&path).unwrap()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn garbage_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(normalize_and_save(b"<html>not an image</html>", &dir.path().join("x.jpg")).is_err());
    }

    #[tokio::test]
    async fn network_failure_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = EnrichmentConfig {
            search_url: "http://127.0.0.1:9/search".to_string(),
            timeout_secs: 1,
            ..EnrichmentConfig::default()
        };
        let assets = enrich(&config, &dir.path().join("imgs"), "Modelo OSI").await;
        assert!(assets.is_empty());
    }
}
