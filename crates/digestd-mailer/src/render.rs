//! Deterministic email rendering. Sections and items keep summary order.

use std::fmt::Write as _;

use chrono::NaiveDate;
use digestd_core::{display_date, DigestSummary};

const EMAIL_CSS: &str = r"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.5; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
.header { text-align: center; margin-bottom: 30px; border-bottom: 1px solid #eee; padding-bottom: 20px; }
.header h1 { margin: 0; font-size: 24px; color: #111; }
.header p { margin: 10px 0 0; color: #666; font-size: 14px; }
.section { margin-bottom: 30px; }
.section-title { font-size: 18px; font-weight: 600; margin-bottom: 15px; color: #111; border-bottom: 1px solid #eee; padding-bottom: 10px; }
.item { margin-bottom: 20px; padding-bottom: 20px; border-bottom: 1px solid #f5f5f5; }
.item:last-child { border-bottom: none; }
.item-title { font-size: 16px; font-weight: 600; margin-bottom: 8px; color: #111; }
.item-summary { font-size: 14px; color: #444; margin-bottom: 8px; }
.item-meta { font-size: 12px; color: #666; }
.item-meta a { color: #0066cc; text-decoration: none; }
.footer { margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; text-align: center; font-size: 12px; color: #666; }
";

const EMPTY_NOTICE: &str = "Nothing new turned up for your sources this time.";

/// A fully rendered message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// `"{digest name} - {M/D/YYYY}"`.
#[must_use]
pub fn subject(digest_name: &str, sent_on: NaiveDate) -> String {
    format!("{digest_name} - {}", display_date(sent_on))
}

#[must_use]
pub fn render_email(digest_name: &str, summary: &DigestSummary, sent_on: NaiveDate) -> RenderedEmail {
    RenderedEmail {
        subject: subject(digest_name, sent_on),
        html: render_html(digest_name, summary),
        text: render_text(digest_name, summary),
    }
}

#[must_use]
pub fn render_html(digest_name: &str, summary: &DigestSummary) -> String {
    let name = html_escape(digest_name);
    let date = html_escape(&summary.date);
    let mut body = String::new();

    if summary.sections.is_empty() {
        let _ = write!(body, r#"<p class="item-summary">{EMPTY_NOTICE}</p>"#);
    }

    for section in &summary.sections {
        let _ = write!(
            body,
            r#"<div class="section"><h2 class="section-title">{}</h2>"#,
            html_escape(&section.title)
        );
        for item in &section.items {
            let _ = write!(
                body,
                r#"<div class="item"><h3 class="item-title">{}</h3><p class="item-summary">{}</p><div class="item-meta">Source: {} &bull; <a href="{}" target="_blank">Read more</a></div></div>"#,
                html_escape(&item.title),
                html_escape(&item.summary),
                html_escape(&item.source_term),
                html_escape(&item.url),
            );
        }
        body.push_str("</div>");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{name} - {date}</title>
<style>{EMAIL_CSS}</style>
</head>
<body>
<div class="header"><h1>{name}</h1><p>{date} &bull; {count} items</p></div>
{body}
<div class="footer"><p>This digest was generated automatically.</p><p>To update your preferences or unsubscribe, visit your dashboard.</p></div>
</body>
</html>
"#,
        count = summary.item_count(),
    )
}

#[must_use]
pub fn render_text(digest_name: &str, summary: &DigestSummary) -> String {
    let mut out = format!(
        "{digest_name}\n{} - {} items\n",
        summary.date,
        summary.item_count()
    );

    if summary.sections.is_empty() {
        let _ = writeln!(out, "\n{EMPTY_NOTICE}");
    }

    for section in &summary.sections {
        let _ = writeln!(out, "\n## {}\n", section.title);
        for item in &section.items {
            let _ = writeln!(
                out,
                "* {}\n  {}\n  Source: {} | {}",
                item.title, item.summary, item.source_term, item.url
            );
        }
    }

    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
