use regex::Regex;
use std::sync::LazyLock;

static ID_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[VE]-\d{8}$").unwrap());

static SECTION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(DCM|DCN)0[1-4]0[1-4]$").unwrap());

/// 身份证号格式: V-XXXXXXXX 或 E-XXXXXXXX
pub fn validate_id_number(id: &str) -> bool {
    ID_NUMBER_RE.is_match(id)
}

/// 班级代码格式: DCM/DCN + 0[1-4] + 0[1-4]
pub fn validate_section_code(section: &str) -> bool {
    SECTION_CODE_RE.is_match(section)
}
