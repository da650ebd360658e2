//! Composes the submission-ready report for a confirmed PoC.

use chrono::Local;

use crate::error::PocError;
use crate::metadata::{self, PocDocument};
use crate::runner::RunCapture;

/// Title and body ready for direct submission to an issue tracker. Values
/// are inserted verbatim; the body is plain text with light markup.
#[derive(Debug, Clone)]
pub struct ComposedReport {
    pub title: String,
    pub body: String,
}

/// Environment details shown in the Demonstration section.
#[derive(Debug, Clone)]
pub struct Demonstration {
    pub os_version: String,
    pub rustc_version: String,
}

pub fn compose(
    document: &PocDocument,
    demo: &Demonstration,
    capture: &RunCapture,
) -> Result<ComposedReport, PocError> {
    let metadata = &document.metadata;
    let target_crate = metadata.target_crate()?;
    let target_version = metadata.target_version()?;
    let title = metadata.report_title()?.to_string();
    let description = metadata.report_description()?;

    let mut body = String::new();
    for snippet in &metadata.report.code_snippets {
        body.push_str(snippet);
        body.push_str("\n\n");
    }
    body.push_str("# Description\n\n");
    body.push_str(description);
    body.push_str("\n\n# Demonstration\n\n");
    body.push_str(&format!("Crate: {target_crate}\n"));
    body.push_str(&format!("Version: {target_version}\n"));
    body.push_str(&format!("OS: {}\n", demo.os_version));
    body.push_str(&format!("Rust: {}\n", demo.rustc_version));
    body.push_str("\n```rust\n");
    body.push_str(&document.code);
    body.push_str("\n```\n\nOutput:\n```\n");
    body.push_str(&capture.output);
    body.push_str("\n```\n\n");
    body.push_str(&format!("Return Code: {}\n", capture.exit_code));

    Ok(ComposedReport { title, body })
}

/// Splice the reported-state markers into an existing record file. The
/// transition is one-way; the code body is left byte-identical.
pub fn mark_reported(source: &str, issue_url: &str) -> Result<String, PocError> {
    let mut metadata = PocDocument::parse(source)?.metadata;
    metadata.report.issue_url = Some(issue_url.to_string());
    metadata.report.issue_date = Some(Local::now().date_naive().format("%Y-%m-%d").to_string());
    metadata::splice(source, &metadata)
}

/// Only GitHub repositories qualify for automatic upstream reporting.
pub fn supports_automatic_reporting(repository_url: &str) -> bool {
    repository_url.starts_with("https://github.com/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PocMetadata, Report, Target, Test};

    fn sample_document() -> PocDocument {
        PocDocument {
            metadata: PocMetadata {
                target: Target {
                    krate: Some("stackvector".to_string()),
                    version: Some("1.0.6".to_string()),
                    peer: Vec::new(),
                },
                test: Test::default(),
                report: Report {
                    title: Some("stackvector: out-of-bounds write".to_string()),
                    description: Some("extend trusts size_hint".to_string()),
                    code_snippets: vec!["```rust\nimpl Extend for StackVec {}\n```".to_string()],
                    patched: None,
                    informational: Some("unsound".to_string()),
                    issue_url: None,
                    issue_date: None,
                },
            },
            code: "fn main() {\n    trigger();\n}".to_string(),
        }
    }

    #[test]
    fn compose_includes_exit_code_and_verbatim_output() {
        let document = sample_document();
        let demo = Demonstration {
            os_version: "Ubuntu 20.04.1 LTS".to_string(),
            rustc_version: "rustc 1.46.0".to_string(),
        };
        let capture = RunCapture {
            output: "panic: x".to_string(),
            exit_code: 101,
        };
        let report = compose(&document, &demo, &capture).expect("compose");

        assert_eq!(report.title, "stackvector: out-of-bounds write");
        assert!(report.body.contains("Return Code: 101"));
        assert!(report.body.contains("Output:\n```\npanic: x\n```"));
        assert!(report.body.contains("# Description\n\nextend trusts size_hint"));
        assert!(report.body.contains("Crate: stackvector\n"));
        assert!(report.body.contains("Version: 1.0.6\n"));
        assert!(report.body.contains("OS: Ubuntu 20.04.1 LTS\n"));
        assert!(report.body.contains("Rust: rustc 1.46.0\n"));
        assert!(report.body.contains("```rust\nfn main() {\n    trigger();\n}\n```"));
        // Snippets come first, each followed by a blank line.
        assert!(report.body.starts_with("```rust\nimpl Extend for StackVec {}\n```\n\n"));
    }

    #[test]
    fn mark_reported_sets_both_markers_and_keeps_code() {
        let source = sample_document().render().expect("render");
        let updated = mark_reported(&source, "https://github.com/x/y/issues/1").expect("mark");
        let document = PocDocument::parse(&updated).expect("reparse");
        assert!(document.metadata.is_reported());
        assert_eq!(
            document.metadata.report.issue_url.as_deref(),
            Some("https://github.com/x/y/issues/1")
        );
        assert_eq!(document.code, sample_document().code);
    }

    #[test]
    fn automatic_reporting_is_github_only() {
        assert!(supports_automatic_reporting("https://github.com/servo/rust-smallvec"));
        assert!(!supports_automatic_reporting("https://gitlab.com/x/y"));
    }
}
