use serde::{Deserialize, Serialize};

/// 封面和最终文件名里使用的院校信息
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstitutionConfig {
    pub name: String,
    pub program: String,
    /// 文件名末尾的简称，例如 "UAH"
    pub short_name: String,
    pub logo_file: String,
}

impl InstitutionConfig {
    /// 从编译目录（输出目录）出发指向 logo 的相对路径
    pub fn logo_relative_path(&self, logo_dir: &str) -> String {
        format!("../{}/{}", logo_dir.trim_matches('/'), self.logo_file)
    }
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            name: "Universidad Alejandro de Humboldt".to_string(),
            program: "Ing. En Informática".to_string(),
            short_name: "UAH".to_string(),
            logo_file: "UAH.png".to_string(),
        }
    }
}
