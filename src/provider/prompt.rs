use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::student::StudentRecord;

const SYSTEM_PROMPT: &str =
    "You are a helpful academic assistant capable of generating high-quality compiled LaTeX code.";

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

fn student_block(s: &StudentRecord) -> String {
    format!(
        "Nombre: {}\nC.I.: {}\nMateria: {}\nSección: {}\nUniversidad: {}\nCarrera: {}\n\
         Evaluación: Evaluación N° {} - Corte {}\nFecha: {}\n",
        s.name,
        s.id_number,
        s.subject,
        s.section_code,
        s.institution,
        s.program,
        s.evaluation_number,
        s.cut_number,
        s.date,
    )
}

/// OpenAI 兼容接口使用的提示词，要求输出完整文档
pub fn full_document_prompt(topic: &str, instructions: &str, student: &StudentRecord) -> String {
    format!(
        "Actúa como un experto académico y diseñador de LaTeX. Tu tarea es generar el código fuente \
         LaTeX para un trabajo universitario.\n\
         REQUISITOS CRÍTICOS:\n\
         1. NO devuelvas bloques de código markdown (no uses ```latex). Devuelve SÓLO el código puro.\n\
         2. El documento debe compilar correctamente con 'pdflatex'.\n\
         3. Usa paquetes estándar y compatibles. Para el idioma español, usa \\usepackage[spanish]{{babel}}.\n\
         4. NO incluyas \\maketitle ni índices (\\tableofcontents).\n\
         5. NO numeres las secciones (usa \\section*{{}}).\n\
         6. El contenido debe ser EXTENSO, con introducciones, desarrollo detallado, ejemplos y conclusiones.\n\
         \n--- DATOS DEL ESTUDIANTE ---\n{student}\
         \n--- TEMA Y CONTENIDO ---\n\
         Tema Principal: {topic}\n\
         Instrucciones: {instructions}\n\
         \n--- ESTRUCTURA ---\n\
         1. Portada Personalizada: Usa el marcador {marker} para el logo (tamaño 4cm).\n\
         2. Introducción: Al menos 2 párrafos.\n\
         3. Desarrollo: Varias secciones (sin numerar). Usa negritas, listas y cursivas.\n\
         4. Si es relevante, incluye alguna tabla simple.\n\
         5. Conclusión.\n",
        student = student_block(student),
        topic = topic,
        instructions = instructions,
        marker = super::postprocess::LOGO_PLACEHOLDER,
    )
}

/// Gemini 只生成正文，外层由模板包裹
pub fn body_only_prompt(topic: &str, instructions: &str) -> String {
    format!(
        "Genera el contenido LaTeX en español, listo para ser compilado con pdflatex, sobre el tema: {topic}.\n\
         Instrucciones específicas: {instructions}\n\n\
         Instrucciones adicionales:\n\
         - Devuelve sólo el cuerpo del documento, sin preámbulo ni \\begin{{document}}.\n\
         - Estructura formal con introducción, desarrollo y conclusión.\n\
         - Referencias bibliográficas en formato APA.\n\
         - Ejemplos prácticos cuando sea aplicable.\n\
         - No incluyas ```latex o ``` codeblocks."
    )
}

const DOCUMENT_TEMPLATE: &str = r"\documentclass[12pt, spanish]{article}
\usepackage[utf8]{inputenc}
\usepackage[spanish]{babel}
\usepackage{amsmath}
\usepackage{amsfonts}
\usepackage{amssymb}
\usepackage{graphicx}
\usepackage{geometry}
\geometry{a4paper, margin=2.5cm}

\title{{subject}}
\author{Nombre: {name} \\
C.I.: {id} \\
Materia: {subject} \\
Sección: {section} \\
Universidad: {institution} \\
Carrera: {program} \\
Evaluación: Evaluación N\textdegree{} {evalNum} - Corte {cutNum} \\
Fecha: {date}}
\date{}

\begin{document}

\maketitle

{body}

\end{document}
";

static TEMPLATE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(name|id|subject|section|institution|program|evalNum|cutNum|date|body)\}")
        .unwrap()
});

/// 用学生信息和正文填充完整文档模板
///
/// 只扫描模板一次，替换进去的值不会再被当作占位符。
pub fn render_template(student: &StudentRecord, body: &str) -> String {
    TEMPLATE_TOKEN_RE
        .replace_all(DOCUMENT_TEMPLATE, |caps: &Captures| match &caps[1] {
            "name" => student.name.clone(),
            "id" => student.id_number.clone(),
            "subject" => student.subject.clone(),
            "section" => student.section_code.clone(),
            "institution" => student.institution.clone(),
            "program" => student.program.clone(),
            "evalNum" => student.evaluation_number.clone(),
            "cutNum" => student.cut_number.clone(),
            "date" => student.date.clone(),
            _ => body.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StudentRecord {
        StudentRecord {
            name: "Ana Pérez".into(),
            id_number: "V-12345678".into(),
            subject: "Redes".into(),
            section_code: "DCM0101".into(),
            institution: "Universidad Alejandro de Humboldt".into(),
            program: "Ing. En Informática".into(),
            evaluation_number: "2".into(),
            cut_number: "1".into(),
            date: "01/02/2026".into(),
            topic: "Modelo OSI".into(),
        }
    }

    #[test]
    fn template_fills_every_placeholder() {
        let doc = render_template(&record(), "\\section*{Intro} {name}");
        assert!(doc.contains("\\title{Redes}"));
        assert!(doc.contains("C.I.: V-12345678"));
        assert!(doc.contains("Sección: DCM0101"));
        assert!(doc.contains("N\\textdegree{} 2 - Corte 1"));
        assert!(doc.contains("Fecha: 01/02/2026}"));
        // 正文中的字面量不被替换
        assert!(doc.contains("\\section*{Intro} {name}"));
        assert!(doc.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn values_with_braces_are_inserted_literally() {
        let mut student = record();
        student.subject = "Redes {date}".into();
        student.name = "{body}".into();
        let doc = render_template(&student, "Texto {subject}");
        assert!(doc.contains("\\title{Redes {date}}"), "{doc}");
        assert!(doc.contains("Nombre: {body} \\\\"));
        assert!(doc.contains("\n\nTexto {subject}\n\n"));
        assert!(!doc.contains("Redes 01/02/2026"));
    }

    #[test]
    fn full_prompt_mentions_marker_and_student() {
        let prompt = full_document_prompt("Modelo OSI", "7 capas", &record());
        assert!(prompt.contains("%%PROJECT_LOGO_PATH%%"));
        assert!(prompt.contains("C.I.: V-12345678"));
        assert!(prompt.contains("Tema Principal: Modelo OSI"));
    }
}
