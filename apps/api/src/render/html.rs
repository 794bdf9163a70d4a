//! Print-ready HTML for the CV templates and the cover letter.
//!
//! Every piece of user text goes through `escape_html` before it is written.

use std::fmt::Write;

use crate::models::cv::{non_blank, Cv};
use crate::render::letter::LetterLayout;
use crate::render::templates::{CvTemplate, Theme};

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped text with line breaks kept.
fn multiline(text: &str) -> String {
    text.trim()
        .lines()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn page_css(theme: &Theme) -> String {
    format!(
        r#"@page {{ size: A4; margin: 12mm; }}
* {{ box-sizing: border-box; }}
body {{ margin: 0; font-family: {font}; font-size: 10.5pt; line-height: 1.4; color: {text}; }}
h1 {{ margin: 0; font-size: 22pt; }}
h2 {{ font-size: 12pt; text-transform: uppercase; letter-spacing: 0.06em; color: {heading};
      border-bottom: 1px solid {rule}; padding-bottom: 2px; margin: 14px 0 6px; }}
.banner {{ background: {accent}; color: #ffffff; padding: 14px 16px; }}
.plain {{ border-bottom: 2px solid {accent}; padding-bottom: 8px; text-align: center; }}
.plain h1 {{ color: {accent}; }}
.title {{ font-size: 12pt; margin-top: 2px; }}
.contact {{ font-size: 9.5pt; margin-top: 6px; }}
.entry {{ margin-bottom: 8px; page-break-inside: avoid; }}
.entry-head {{ font-weight: bold; }}
.meta {{ font-size: 9.5pt; color: #555555; }}
ul {{ margin: 4px 0 0 18px; padding: 0; }}
.skills {{ display: flex; flex-wrap: wrap; gap: 4px 8px; list-style: none; margin: 0; }}
.skills li {{ border: 1px solid {rule}; border-radius: 3px; padding: 1px 6px; }}
"#,
        font = theme.font_family,
        text = theme.text,
        heading = theme.heading,
        rule = theme.rule,
        accent = theme.accent,
    )
}

fn header_html(cv: &Cv, theme: &Theme) -> String {
    let mut out = String::new();
    let class = if theme.banner { "banner" } else { "plain" };
    let _ = write!(out, r#"<header class="{class}"><h1>{}</h1>"#, escape_html(cv.full_name.trim()));
    if let Some(title) = non_blank(cv.title.as_deref()) {
        let _ = write!(out, r#"<div class="title">{}</div>"#, escape_html(title));
    }
    let contact = cv.contact_line();
    if !contact.is_empty() {
        let _ = write!(out, r#"<div class="contact">{}</div>"#, escape_html(&contact));
    }
    out.push_str("</header>");
    out
}

fn sections_html(cv: &Cv) -> String {
    let mut out = String::new();

    if let Some(summary) = non_blank(cv.summary.as_deref()) {
        let _ = write!(out, "<section><h2>Profile</h2><p>{}</p></section>", multiline(summary));
    }

    let skills: Vec<&str> = cv.skills.iter().filter_map(|s| non_blank(Some(s.as_str()))).collect();
    if !skills.is_empty() {
        out.push_str(r#"<section><h2>Skills</h2><ul class="skills">"#);
        for skill in skills {
            let _ = write!(out, "<li>{}</li>", escape_html(skill));
        }
        out.push_str("</ul></section>");
    }

    if !cv.experiences.is_empty() {
        out.push_str("<section><h2>Experience</h2>");
        for exp in &cv.experiences {
            out.push_str(r#"<div class="entry">"#);
            let header = exp.header();
            if !header.is_empty() {
                let _ = write!(out, r#"<div class="entry-head">{}</div>"#, escape_html(&header));
            }
            let meta = exp.meta();
            if !meta.is_empty() {
                let _ = write!(out, r#"<div class="meta">{}</div>"#, escape_html(&meta));
            }
            let bullets = exp.bullet_lines();
            if !bullets.is_empty() {
                out.push_str("<ul>");
                for line in bullets {
                    let _ = write!(out, "<li>{}</li>", escape_html(&line));
                }
                out.push_str("</ul>");
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if !cv.education.is_empty() {
        out.push_str("<section><h2>Education</h2>");
        for edu in &cv.education {
            out.push_str(r#"<div class="entry">"#);
            if let Some(degree) = non_blank(Some(edu.degree.as_str())) {
                let _ = write!(out, r#"<div class="entry-head">{}</div>"#, escape_html(degree));
            }
            let meta = edu.meta();
            if !meta.is_empty() {
                let _ = write!(out, r#"<div class="meta">{}</div>"#, escape_html(&meta));
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }

    if let Some(references) = non_blank(cv.references.as_deref()) {
        let _ = write!(out, "<section><h2>References</h2><p>{}</p></section>", multiline(references));
    }

    out
}

/// A complete HTML document for one CV in the chosen template.
pub fn cv_html(cv: &Cv, template: CvTemplate) -> String {
    let theme = template.theme();
    format!(
        r#"<!DOCTYPE html>
<html lang="en-GB"><head><meta charset="utf-8"><title>{title}</title>
<style>{css}</style></head>
<body class="template-{name}">{header}<main>{sections}</main></body></html>"#,
        title = escape_html(cv.full_name.trim()),
        css = page_css(&theme),
        name = template.as_str(),
        header = header_html(cv, &theme),
        sections = sections_html(cv),
    )
}

pub fn cover_letter_html(layout: &LetterLayout) -> String {
    let mut body = String::new();

    body.push_str(r#"<div class="candidate">"#);
    for (i, line) in layout.candidate_lines.iter().enumerate() {
        if i == 0 {
            let _ = write!(body, "<strong>{}</strong><br>", escape_html(line));
        } else {
            let _ = write!(body, "{}<br>", escape_html(line));
        }
    }
    body.push_str("</div>");

    let _ = write!(body, r#"<p class="date">{}</p>"#, escape_html(&layout.date));

    if !layout.employer_lines.is_empty() {
        let lines: Vec<String> = layout.employer_lines.iter().map(|l| escape_html(l)).collect();
        let _ = write!(body, r#"<p class="employer">{}</p>"#, lines.join("<br>"));
    }

    let _ = write!(body, "<p>Dear {},</p>", escape_html(&layout.greeting));
    for paragraph in &layout.paragraphs {
        let _ = write!(body, "<p>{}</p>", multiline(paragraph));
    }
    let _ = write!(
        body,
        r#"<p class="closing">{}<br>{}</p>"#,
        escape_html(&layout.sign_off),
        escape_html(&layout.full_name)
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en-GB"><head><meta charset="utf-8"><title>Cover letter</title>
<style>
@page {{ size: A4; margin: 12mm; }}
body {{ margin: 0; font-family: 'Liberation Sans', Arial, sans-serif; font-size: 11pt; line-height: 1.5; color: #222222; }}
.candidate {{ text-align: right; margin-bottom: 12px; }}
.date, .employer {{ margin: 0 0 12px; }}
p {{ margin: 0 0 10px; }}
.closing {{ margin-top: 18px; }}
</style></head>
<body>{body}</body></html>"#
    )
}
