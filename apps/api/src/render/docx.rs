//! Minimal WordprocessingML writer: one document part, styles and a bullet list.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::models::cv::{non_blank, Cv};
use crate::render::html::escape_html;
use crate::render::letter::LetterLayout;
use crate::render::RenderError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault>
<w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/>
<w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr>
<w:rPr><w:b/><w:color w:val="1F4E79"/><w:sz w:val="26"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/>
<w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr><w:spacing w:after="40"/></w:pPr></w:style>
</w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/>
<w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/>
<w:pPr><w:ind w:left="360" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
</w:numbering>"#;

const TWIPS_PER_INCH: u32 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn as_xml(&self) -> Option<&'static str> {
        match self {
            Align::Left => None,
            Align::Center => Some("center"),
            Align::Right => Some("right"),
        }
    }
}

/// One run of text. Embedded newlines become line breaks.
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    /// Font size in points.
    pub size_pt: Option<u32>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }

    fn to_xml(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/>");
        }
        if let Some(size) = self.size_pt {
            props.push_str(&format!("<w:sz w:val=\"{}\"/>", size * 2));
        }
        let rpr = if props.is_empty() {
            String::new()
        } else {
            format!("<w:rPr>{props}</w:rPr>")
        };

        let content = self
            .text
            .split('\n')
            .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape_html(line)))
            .collect::<Vec<_>>()
            .join("<w:br/>");
        format!("<w:r>{rpr}{content}</w:r>")
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub const CV: Margins = Margins {
        top: 1.0,
        bottom: 1.0,
        left: 1.0,
        right: 1.0,
    };
    pub const LETTER: Margins = Margins {
        top: 0.7,
        bottom: 1.0,
        left: 1.0,
        right: 1.0,
    };

    fn to_xml(self) -> String {
        let twips = |inches: f32| (inches * TWIPS_PER_INCH as f32).round() as u32;
        // A4: 11906 x 16838 twips.
        format!(
            r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
            twips(self.top),
            twips(self.right),
            twips(self.bottom),
            twips(self.left)
        )
    }
}

#[derive(Debug, Default)]
pub struct DocxBuilder {
    body: String,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(&mut self, runs: &[Run], align: Align, space_after_pt: Option<u32>) -> &mut Self {
        self.push(None, runs, align, space_after_pt)
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.push(None, &[Run::plain(text)], Align::Left, None)
    }

    pub fn heading(&mut self, text: &str) -> &mut Self {
        self.push(Some("Heading2"), &[Run::plain(text)], Align::Left, None)
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.push(Some("ListBullet"), &[Run::plain(text)], Align::Left, None)
    }

    fn push(
        &mut self,
        style: Option<&str>,
        runs: &[Run],
        align: Align,
        space_after_pt: Option<u32>,
    ) -> &mut Self {
        let mut ppr = String::new();
        if let Some(style) = style {
            ppr.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if let Some(after) = space_after_pt {
            // Twentieths of a point.
            ppr.push_str(&format!(r#"<w:spacing w:after="{}"/>"#, after * 20));
        }
        if let Some(jc) = align.as_xml() {
            ppr.push_str(&format!(r#"<w:jc w:val="{jc}"/>"#));
        }

        self.body.push_str("<w:p>");
        if !ppr.is_empty() {
            self.body.push_str(&format!("<w:pPr>{ppr}</w:pPr>"));
        }
        for run in runs {
            self.body.push_str(&run.to_xml());
        }
        self.body.push_str("</w:p>");
        self
    }

    fn document_xml(&self, margins: Margins) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}{}</w:body></w:document>"#,
            self.body,
            margins.to_xml()
        )
    }

    /// Packages the document as a `.docx` archive.
    pub fn finish(&self, margins: Margins) -> Result<Vec<u8>, RenderError> {
        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
            ("word/document.xml", self.document_xml(margins)),
            ("word/styles.xml", STYLES.to_string()),
            ("word/numbering.xml", NUMBERING.to_string()),
        ];

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in parts {
            writer
                .start_file(name, options)
                .map_err(|e| RenderError::Docx(e.to_string()))?;
            writer.write_all(content.as_bytes())?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| RenderError::Docx(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

pub fn cv_docx(cv: &Cv) -> Result<Vec<u8>, RenderError> {
    let mut doc = DocxBuilder::new();

    let name = non_blank(Some(cv.full_name.as_str())).unwrap_or("Curriculum Vitae");
    doc.paragraph(
        &[Run {
            text: name.to_string(),
            bold: true,
            size_pt: Some(16),
        }],
        Align::Center,
        None,
    );
    if let Some(title) = non_blank(cv.title.as_deref()) {
        doc.paragraph(&[Run::plain(title)], Align::Center, None);
    }
    let contact = cv.contact_line();
    if !contact.is_empty() {
        doc.paragraph(&[Run::plain(contact)], Align::Center, Some(12));
    }

    if let Some(summary) = non_blank(cv.summary.as_deref()) {
        doc.heading("Profile").text(summary);
    }

    let skills: Vec<&str> = cv
        .skills
        .iter()
        .filter_map(|s| non_blank(Some(s.as_str())))
        .collect();
    if !skills.is_empty() {
        doc.heading("Skills").text(&skills.join(", "));
    }

    if !cv.experiences.is_empty() {
        doc.heading("Experience");
        for exp in &cv.experiences {
            let header = exp.header();
            if !header.is_empty() {
                doc.paragraph(&[Run::bold(header)], Align::Left, None);
            }
            let meta = exp.meta();
            if !meta.is_empty() {
                doc.text(&meta);
            }
            for line in exp.bullet_lines() {
                doc.bullet(&line);
            }
        }
    }

    if !cv.education.is_empty() {
        doc.heading("Education");
        for edu in &cv.education {
            let degree = non_blank(Some(edu.degree.as_str()))
                .map(|d| vec![Run::bold(d)])
                .unwrap_or_default();
            doc.paragraph(&degree, Align::Left, None);
            let meta = edu.meta();
            if !meta.is_empty() {
                doc.text(&meta);
            }
        }
    }

    if let Some(references) = non_blank(cv.references.as_deref()) {
        doc.heading("References");
        for line in references.lines().map(str::trim).filter(|l| !l.is_empty()) {
            doc.text(line);
        }
    }

    doc.finish(Margins::CV)
}

pub fn cover_letter_docx(layout: &LetterLayout) -> Result<Vec<u8>, RenderError> {
    let mut doc = DocxBuilder::new();

    let mut candidate = Vec::new();
    for (i, line) in layout.candidate_lines.iter().enumerate() {
        if i == 0 {
            candidate.push(Run::bold(format!("{line}\n")));
        } else {
            candidate.push(Run::plain(format!("{line}\n")));
        }
    }
    doc.paragraph(&candidate, Align::Right, Some(6));
    doc.paragraph(&[Run::plain(&layout.date)], Align::Left, Some(6));

    if !layout.employer_lines.is_empty() {
        doc.paragraph(
            &[Run::plain(layout.employer_lines.join("\n"))],
            Align::Left,
            Some(6),
        );
    }

    doc.paragraph(
        &[Run::plain(format!("Dear {},", layout.greeting))],
        Align::Left,
        Some(12),
    );
    for paragraph in &layout.paragraphs {
        doc.paragraph(&[Run::plain(paragraph)], Align::Left, Some(6));
    }
    doc.paragraph(&[Run::plain(&layout.sign_off)], Align::Left, Some(0));
    doc.text(&layout.full_name);

    doc.finish(Margins::LETTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::Experience;
    use crate::render::letter::CoverLetterInput;
    use chrono::NaiveDate;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_package_has_required_parts() {
        let bytes = DocxBuilder::new().text("Hello").finish(Margins::CV).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
    }

    #[test]
    fn test_cv_docx_layout() {
        let cv = Cv {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: Some("07700 900123".into()),
            skills: vec!["SQL".into(), "Excel".into()],
            experiences: vec![Experience {
                job_title: "Clerk".into(),
                company: Some("R&D Ltd".into()),
                description: Some("• Filed records\nAnswered calls".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let xml = read_part(&cv_docx(&cv).unwrap(), "word/document.xml");
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
        assert!(xml.contains("jane@example.com | 07700 900123"));
        assert!(xml.contains(">SQL, Excel<"));
        assert!(xml.contains("Clerk – R&amp;D Ltd"));
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/>"#));
        assert!(xml.contains(">Filed records<"));
        assert!(!xml.contains("• Filed"));
        assert!(!xml.contains(">Profile<"));
    }

    #[test]
    fn test_cover_letter_docx() {
        let input = CoverLetterInput {
            full_name: "Jane Doe".into(),
            greeting: "Ms Smith".into(),
            body: "Para one.\n\nPara two.".into(),
            ..Default::default()
        };
        let layout = input.layout(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let xml = read_part(&cover_letter_docx(&layout).unwrap(), "word/document.xml");
        assert!(xml.contains(r#"<w:jc w:val="right"/>"#));
        assert!(xml.contains("01 June 2025"));
        assert!(xml.contains("Dear Ms Smith,"));
        assert!(xml.contains(">Para two.<"));
        assert!(xml.contains("Kind regards,"));
    }
}
