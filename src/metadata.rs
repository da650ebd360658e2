//! Codec for the metadata block embedded in each PoC source file.
//!
//! A record file opens with an inner block doc comment whose first two lines
//! are [`DOC_OPEN`] and [`FENCE_OPEN`]. The TOML metadata sits between the
//! fence markers, the doc comment closes with [`DOC_CLOSE`], and the code
//! body is everything after that line, trimmed.
//!
//! The codec owns the marker literals and works on an explicit
//! [`PocDocument`] pair instead of re-scanning the file for marker positions
//! on every access.

use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::Chars;

use crate::error::PocError;

/// First line of every record file.
pub const DOC_OPEN: &str = "/*!";
/// Second line: opens the metadata fence with the tool-specific tag.
pub const FENCE_OPEN: &str = "```crux-poc";
/// Closes the metadata fence.
pub const FENCE_CLOSE: &str = "```";
/// Closes the doc comment; the code body starts on the next line.
pub const DOC_CLOSE: &str = "!*/";

/// Metadata for one PoC record.
///
/// All leaf fields are optional at the type level: the codec never rejects a
/// record for a missing key. Required fields are enforced by the accessors
/// at the point of use, which surface the full field path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PocMetadata {
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub test: Test,
    #[serde(default)]
    pub report: Report,
}

/// The crate under demonstration, pinned to an exact version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "crate", skip_serializing_if = "Option::is_none")]
    pub krate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Additional exact-version pins for cross-crate interaction bugs,
    /// kept in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peer: Vec<Peer>,
}

/// One additional pinned dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(rename = "crate")]
    pub krate: String,
    pub version: String,
}

/// How to build and run the PoC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Test {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cargo_toolchain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cargo_flags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzers: Option<Vec<String>>,
}

/// Submission material plus the reported-state markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub code_snippets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patched: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informational: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
}

impl PocMetadata {
    pub fn target_crate(&self) -> Result<&str, PocError> {
        self.target
            .krate
            .as_deref()
            .ok_or(PocError::MissingField("target.crate"))
    }

    pub fn target_version(&self) -> Result<&str, PocError> {
        self.target
            .version
            .as_deref()
            .ok_or(PocError::MissingField("target.version"))
    }

    pub fn report_title(&self) -> Result<&str, PocError> {
        self.report
            .title
            .as_deref()
            .ok_or(PocError::MissingField("report.title"))
    }

    pub fn report_description(&self) -> Result<&str, PocError> {
        self.report
            .description
            .as_deref()
            .ok_or(PocError::MissingField("report.description"))
    }

    /// A record is reported iff both markers are present. The transition is
    /// one-way; nothing in this tool clears the markers.
    pub fn is_reported(&self) -> bool {
        self.report.issue_url.is_some() && self.report.issue_date.is_some()
    }

    /// Render the metadata back to TOML, ending with a newline.
    ///
    /// String values always come out as single-line escaped strings: a
    /// multi-line rendering could put a raw line equal to [`FENCE_CLOSE`]
    /// inside the block and corrupt the delimiters.
    pub fn to_toml_string(&self) -> Result<String, PocError> {
        let mut text = flatten_multiline_strings(&toml::to_string(self)?);
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

/// A parsed record: the metadata block and the code body that follows the
/// doc comment, held separately so neither side needs re-scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct PocDocument {
    pub metadata: PocMetadata,
    pub code: String,
}

impl PocDocument {
    /// Split a record file into metadata and code body.
    pub fn parse(source: &str) -> Result<Self, PocError> {
        let lines = split_lines(source);
        check_markers(&lines)?;
        let fence_close = find_marker(&lines, 2, FENCE_CLOSE).ok_or_else(|| {
            PocError::MalformedRecord(format!("closing `{FENCE_CLOSE}` fence not found"))
        })?;
        let doc_close = find_marker(&lines, fence_close, DOC_CLOSE).ok_or_else(|| {
            PocError::MalformedRecord(format!("closing `{DOC_CLOSE}` marker not found"))
        })?;

        let metadata_text = lines[2..fence_close].concat();
        let metadata: PocMetadata = toml::from_str(&metadata_text)?;
        let code = lines[doc_close + 1..].concat().trim().to_string();
        Ok(PocDocument { metadata, code })
    }

    /// Reassemble a complete record file from markers, metadata, and code.
    pub fn render(&self) -> Result<String, PocError> {
        let mut out = String::new();
        out.push_str(DOC_OPEN);
        out.push('\n');
        out.push_str(FENCE_OPEN);
        out.push('\n');
        out.push_str(&self.metadata.to_toml_string()?);
        out.push_str(FENCE_CLOSE);
        out.push('\n');
        out.push_str(DOC_CLOSE);
        out.push('\n');
        out.push_str(&self.code);
        out.push('\n');
        Ok(out)
    }
}

/// Replace only the text strictly between the fence markers of an existing
/// record file, leaving the doc-comment structure and the code body
/// byte-identical (line endings included).
pub fn splice(source: &str, metadata: &PocMetadata) -> Result<String, PocError> {
    let lines = split_lines(source);
    check_markers(&lines)?;
    let fence_close = find_marker(&lines, 2, FENCE_CLOSE).ok_or_else(|| {
        PocError::MalformedRecord(format!("closing `{FENCE_CLOSE}` fence not found"))
    })?;

    let mut out = String::new();
    out.push_str(lines[0]);
    out.push_str(lines[1]);
    out.push_str(&metadata.to_toml_string()?);
    for line in &lines[fence_close..] {
        out.push_str(line);
    }
    Ok(out)
}

/// Split into lines that keep their own `\n` terminators, so reassembly
/// preserves the source byte-for-byte.
fn split_lines(source: &str) -> Vec<&str> {
    source.split_inclusive('\n').collect()
}

/// A line's content for marker comparison, without its `\n` or `\r\n`
/// terminator. CRLF records parse and splice without being rewritten to LF.
fn line_content(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn check_markers(lines: &[&str]) -> Result<(), PocError> {
    if lines.first().map(|line| line_content(line)) != Some(DOC_OPEN)
        || lines.get(1).map(|line| line_content(line)) != Some(FENCE_OPEN)
    {
        return Err(PocError::MalformedRecord(format!(
            "expected `{DOC_OPEN}` and `{FENCE_OPEN}` on the first two lines"
        )));
    }
    Ok(())
}

fn find_marker(lines: &[&str], from: usize, marker: &str) -> Option<usize> {
    lines[from..]
        .iter()
        .position(|line| line_content(line) == marker)
        .map(|offset| offset + from)
}

/// Re-emit TOML multi-line strings as single-line escaped basic strings.
///
/// The fence scan treats any line equal to the closing marker as the end of
/// the metadata block, so no serialized value may span lines. Mirrors what
/// the TOML parser would do with the multi-line form: the newline right
/// after an opening delimiter is dropped, a line-ending backslash swallows
/// the following whitespace, and everything else is escaped in place.
fn flatten_multiline_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if chars.peek() == Some(&'"') => {
                chars.next();
                if chars.peek() == Some(&'"') {
                    chars.next();
                    flatten_multiline_basic(&mut chars, &mut out);
                } else {
                    out.push_str("\"\"");
                }
            }
            '"' => {
                out.push('"');
                copy_basic_string(&mut chars, &mut out);
            }
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    flatten_multiline_literal(&mut chars, &mut out);
                } else {
                    out.push_str("''");
                }
            }
            '\'' => {
                out.push('\'');
                copy_literal_string(&mut chars, &mut out);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn copy_basic_string(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(ch) = chars.next() {
        out.push(ch);
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' => return,
            _ => {}
        }
    }
}

fn copy_literal_string(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    for ch in chars.by_ref() {
        out.push(ch);
        if ch == '\'' {
            return;
        }
    }
}

fn skip_trimmed_newline(chars: &mut Peekable<Chars<'_>>) {
    if chars.peek() == Some(&'\r') {
        chars.next();
    }
    if chars.peek() == Some(&'\n') {
        chars.next();
    }
}

fn flatten_multiline_basic(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    out.push('"');
    skip_trimmed_newline(chars);
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) if next.is_whitespace() => {
                    // Line-ending backslash: the parser drops it together
                    // with all whitespace up to the next content.
                    while chars.peek().is_some_and(|c| c.is_whitespace()) {
                        chars.next();
                    }
                }
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => break,
            },
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '"' => {
                let mut count = 1;
                while chars.peek() == Some(&'"') {
                    chars.next();
                    count += 1;
                }
                if count >= 3 {
                    for _ in 0..count - 3 {
                        out.push_str("\\\"");
                    }
                    out.push('"');
                    return;
                }
                for _ in 0..count {
                    out.push_str("\\\"");
                }
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
}

fn flatten_multiline_literal(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    out.push('"');
    skip_trimmed_newline(chars);
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => {
                let mut count = 1;
                while chars.peek() == Some(&'\'') {
                    chars.next();
                    count += 1;
                }
                if count >= 3 {
                    for _ in 0..count - 3 {
                        out.push('\'');
                    }
                    out.push('"');
                    return;
                }
                for _ in 0..count {
                    out.push('\'');
                }
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
}
