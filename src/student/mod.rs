pub mod validators;

use serde::{Deserialize, Serialize};

use crate::config::InstitutionConfig;
use crate::utils::{GenError, GenResult};

pub use validators::{validate_id_number, validate_section_code};

/// 上课时段：上午 DCM / 晚上 DCN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    Morning,
    Night,
}

impl Shift {
    pub fn code(self) -> &'static str {
        match self {
            Shift::Morning => "DCM",
            Shift::Night => "DCN",
        }
    }
}

/// 表单原始输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormValues {
    pub name: String,
    /// 不带前缀的8位数字
    pub id_digits: String,
    /// "V" 或 "E"
    pub id_prefix: String,
    pub subject: String,
    pub shift: Shift,
    pub trimester: String,
    pub subsection: String,
    pub eval_num: String,
    pub cut_num: String,
    pub topic: String,
    pub instructions: String,
}

/// 学生/课程信息快照，构建后只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub id_number: String,
    pub subject: String,
    pub section_code: String,
    pub institution: String,
    pub program: String,
    pub evaluation_number: String,
    pub cut_number: String,
    pub date: String,
    pub topic: String,
}

/// 时段 + 两位学期 + 两位小节
pub fn build_section_code(shift: Shift, trimester: &str, subsection: &str) -> String {
    format!(
        "{}{}{}",
        shift.code(),
        two_digits(trimester),
        two_digits(subsection)
    )
}

// "5" -> "05"，非数字原样保留交给校验报错
fn two_digits(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<u8>() {
        Ok(n) if raw.len() < 2 => format!("{n:02}"),
        _ => raw.to_string(),
    }
}

pub fn build_id_number(prefix: &str, digits: &str) -> String {
    let prefix = match prefix.trim() {
        "" => "V",
        p => p,
    };
    format!("{}-{}", prefix.to_uppercase(), digits.trim())
}

impl FormValues {
    pub fn section_code(&self) -> String {
        build_section_code(self.shift, &self.trimester, &self.subsection)
    }

    pub fn id_number(&self) -> String {
        build_id_number(&self.id_prefix, &self.id_digits)
    }
}

/// 校验全部规则，一次性返回所有违规项
pub fn validate_form(form: &FormValues) -> GenResult<()> {
    let mut errors = Vec::new();

    if form.topic.trim().is_empty() {
        errors.push("Debe ingresar un tema principal".to_string());
    }
    if form.instructions.trim().is_empty() {
        errors.push("Debe ingresar indicaciones".to_string());
    }

    let id = form.id_number();
    if !validate_id_number(&id) {
        errors.push(format!("Cédula inválida: {id} (formato V-XXXXXXXX)"));
    }

    let section = form.section_code();
    if !validate_section_code(&section) {
        errors.push(format!("Código de sección inválido: {section}"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GenError::Validation(errors))
    }
}

/// 校验并构建 StudentRecord，日期取本地当天
pub fn build_student_record(
    form: &FormValues,
    institution: &InstitutionConfig,
) -> GenResult<StudentRecord> {
    let date = chrono::Local::now().format("%d/%m/%Y").to_string();
    build_student_record_on(form, institution, date)
}

pub fn build_student_record_on(
    form: &FormValues,
    institution: &InstitutionConfig,
    date: String,
) -> GenResult<StudentRecord> {
    validate_form(form)?;

    Ok(StudentRecord {
        name: form.name.trim().to_string(),
        id_number: form.id_number(),
        subject: form.subject.trim().to_string(),
        section_code: form.section_code(),
        institution: institution.name.clone(),
        program: institution.program.clone(),
        evaluation_number: form.eval_num.trim().to_string(),
        cut_number: form.cut_num.trim().to_string(),
        date,
        topic: form.topic.trim().to_string(),
    })
}

#[cfg(test)]
pub(crate) fn sample_form() -> FormValues {
    FormValues {
        name: "Ana Pérez".to_string(),
        id_digits: "12345678".to_string(),
        id_prefix: "V".to_string(),
        subject: "Redes".to_string(),
        shift: Shift::Morning,
        trimester: "01".to_string(),
        subsection: "01".to_string(),
        eval_num: "2".to_string(),
        cut_num: "1".to_string(),
        topic: "Modelo OSI".to_string(),
        instructions: "Explicar las 7 capas".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_code_derivation() {
        assert_eq!(build_section_code(Shift::Morning, "05", "02"), "DCM0502");
        assert_eq!(build_section_code(Shift::Night, "3", "4"), "DCN0304");
        assert_eq!(build_section_code(Shift::Morning, "13", "01"), "DCM1301");
    }

    #[test]
    fn id_number_defaults_to_v_prefix() {
        assert_eq!(build_id_number("", "12345678"), "V-12345678");
        assert_eq!(build_id_number("e", "87654321"), "E-87654321");
    }

    #[test]
    fn valid_form_builds_record() {
        let record = build_student_record_on(
            &sample_form(),
            &InstitutionConfig::default(),
            "01/02/2026".to_string(),
        )
        .unwrap();

        assert_eq!(record.id_number, "V-12345678");
        assert_eq!(record.section_code, "DCM0101");
        assert_eq!(record.institution, "Universidad Alejandro de Humboldt");
        assert_eq!(record.date, "01/02/2026");
        assert_eq!(record.topic, "Modelo OSI");
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut form = sample_form();
        form.topic = "  ".to_string();
        form.instructions = String::new();
        form.id_digits = "1234".to_string();
        form.trimester = "13".to_string();

        match validate_form(&form) {
            Err(GenError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "{errors:?}");
                assert!(errors[0].contains("tema"));
                assert!(errors[1].contains("indicaciones"));
                assert!(errors[2].contains("V-1234"));
                assert!(errors[3].contains("DCM1301"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
