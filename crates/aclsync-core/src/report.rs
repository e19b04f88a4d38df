//! ACL diff reports: a small text template rendered around a comparison result.
//!
//! Two placeholders are understood, `{{ datetime }}` and `{{ diff }}`.
//! Whitespace inside the braces is optional.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "ACL DIFF REPORT {{ datetime }}\n{{ diff }}\n";

const DATETIME: &str = "datetime";
const DIFF: &str = "diff";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template placeholder '{name}'")]
    UnknownPlaceholder { name: String },

    #[error("unterminated '{{{{' in report template")]
    Unterminated,
}

/// Payload file name for a report produced at `now`.
pub fn report_name(now: DateTime<Utc>) -> String {
    format!("acl-{}.rpt", now.format("%Y-%m-%dT%H%M%S"))
}

/// A validated report template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    source: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl ReportTemplate {
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        for caps in PLACEHOLDER.captures_iter(&source) {
            let name = &caps[1];
            if name != DATETIME && name != DIFF {
                return Err(TemplateError::UnknownPlaceholder {
                    name: name.to_string(),
                });
            }
        }
        if PLACEHOLDER.replace_all(&source, "").contains("{{") {
            return Err(TemplateError::Unterminated);
        }
        Ok(Self { source })
    }

    /// Render in a single pass, so `{{` inside the diff text is left alone.
    pub fn render(&self, diff: &str, now: DateTime<Utc>) -> String {
        let datetime = now.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                if &caps[1] == DATETIME {
                    datetime.clone()
                } else {
                    diff.to_string()
                }
            })
            .into_owned()
    }
}

/// A rendered report ready to be signed and bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub name: String,
    pub text: String,
}

impl Report {
    pub fn render(template: &ReportTemplate, diff: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: report_name(now),
            text: template.render(diff, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_report_name() {
        assert_eq!(report_name(at()), "acl-2026-01-02T030405.rpt");
    }

    #[test]
    fn test_default_template_render() {
        let text = ReportTemplate::default().render("+ 2,Bob,102", at());
        assert_eq!(text, "ACL DIFF REPORT 2026-01-02 03:04:05 UTC\n+ 2,Bob,102\n");
    }

    #[test]
    fn test_diff_braces_not_expanded() {
        let t = ReportTemplate::new("{{diff}}").unwrap();
        assert_eq!(t.render("{{ datetime }}", at()), "{{ datetime }}");
    }

    #[test]
    fn test_template_validation() {
        assert_eq!(
            ReportTemplate::new("{{ user }}"),
            Err(TemplateError::UnknownPlaceholder {
                name: "user".to_string()
            })
        );
        assert_eq!(ReportTemplate::new("{{ diff"), Err(TemplateError::Unterminated));
    }
}
