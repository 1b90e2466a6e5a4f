//! Source locations for IDE-style diagnostics
//!
//! Every `SchemaNode` carries one of these, computed once during
//! `SchemaDoc::load` and never touched again (§3 "Lifecycle").

use std::path::{Path, PathBuf};

/// A resource location: either a schema file on disk or an in-memory string
/// (used by tests and by callers who already have schema text in hand).
#[derive(Debug, Clone)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// In-memory XSD text, tagged with a synthetic name for diagnostics
    String(String),
}

impl Location {
    /// Render as a string for diagnostics and cache keys
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Build a file: URI from this location (§6 "Location format")
    pub fn to_uri(&self) -> String {
        match self {
            Location::Path(p) => path_to_file_uri(p),
            Location::String(s) => format!("string:{s}"),
        }
    }
}

/// Minimal `file://` URI construction without pulling in the `url` crate
/// for a single conversion this crate never parses back.
fn path_to_file_uri(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{display}")
    } else {
        format!("file:///{display}")
    }
}

/// One source location on a `SchemaNode`: the start tag's position and
/// extent in the originating file (§3, §6 "Location format").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// `file://` URI (or `string:` URI for in-memory schema text)
    pub uri: String,
    /// 1-based line number of the start tag
    pub line: u32,
    /// 1-based column of the start tag's opening `<`
    pub column: u32,
    /// Length, in characters, of the start tag as written
    /// (`<name attr="v">` or `<name attr="v"/>`)
    pub length_of_start_tag: u32,
}

/// Find the 1-based (line, column) of `byte_offset` within `text`.
///
/// Lines are delimited by CR, LF, or CRLF (§6), matching the way the
/// reference implementation counts "newline-delimited records".
pub fn line_column_at(text: &str, byte_offset: usize) -> (u32, u32) {
    let mut line: u32 = 1;
    let mut line_start: usize = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if idx >= byte_offset {
            break;
        }
        match ch {
            '\n' => {
                line += 1;
                line_start = idx + 1;
            }
            '\r' => {
                // Treat CRLF as a single break; a bare CR also breaks.
                if let Some(&(_, '\n')) = chars.peek() {
                    chars.next();
                    line += 1;
                    line_start = idx + 2;
                } else {
                    line += 1;
                    line_start = idx + 1;
                }
            }
            _ => {}
        }
    }

    let column = text[line_start..byte_offset].chars().count() as u32 + 1;
    (line, column)
}

/// Scan the raw source line containing `start_offset` for the length (in
/// characters) of the start tag beginning there: up to and including the
/// first unquoted `>` (§4.1 "computed by scanning the raw line for `<…>`").
pub fn scan_start_tag_length(text: &str, start_offset: usize) -> u32 {
    let rest = &text[start_offset..];
    let mut in_quotes: Option<char> = None;
    let mut len: usize = 0;

    for ch in rest.chars() {
        len += 1;
        match in_quotes {
            Some(q) => {
                if ch == q {
                    in_quotes = None;
                }
            }
            None => match ch {
                '"' | '\'' => in_quotes = Some(ch),
                '>' => break,
                '\n' | '\r' => break,
                _ => {}
            },
        }
    }

    len as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_as_str_path() {
        let loc = Location::Path(PathBuf::from("/tmp/schema.xsd"));
        assert_eq!(loc.as_str(), "/tmp/schema.xsd");
    }

    #[test]
    fn test_location_to_uri() {
        let loc = Location::Path(PathBuf::from("/tmp/schema.xsd"));
        assert_eq!(loc.to_uri(), "file:///tmp/schema.xsd");
    }

    #[test]
    fn test_line_column_first_line() {
        let text = "abc";
        assert_eq!(line_column_at(text, 0), (1, 1));
        assert_eq!(line_column_at(text, 2), (1, 3));
    }

    #[test]
    fn test_line_column_lf() {
        let text = "line1\nline2\nline3";
        let offset = text.find("line3").unwrap();
        assert_eq!(line_column_at(text, offset), (3, 1));
    }

    #[test]
    fn test_line_column_crlf() {
        let text = "line1\r\nline2\r\nline3";
        let offset = text.find("line3").unwrap();
        assert_eq!(line_column_at(text, offset), (3, 1));
    }

    #[test]
    fn test_line_column_cr_only() {
        let text = "line1\rline2\rline3";
        let offset = text.find("line3").unwrap();
        assert_eq!(line_column_at(text, offset), (3, 1));
    }

    #[test]
    fn test_scan_start_tag_length_self_closing() {
        let text = r#"<xs:element name="foo"/>"#;
        assert_eq!(scan_start_tag_length(text, 0), text.len() as u32);
    }

    #[test]
    fn test_scan_start_tag_length_with_body() {
        let text = "<xs:element name=\"foo\">\n  <xs:annotation/>\n</xs:element>";
        let tag_end = text.find('>').unwrap() + 1;
        assert_eq!(scan_start_tag_length(text, 0), tag_end as u32);
    }

    #[test]
    fn test_scan_start_tag_length_quoted_gt() {
        let text = r#"<xs:pattern value="a>b"/>"#;
        assert_eq!(scan_start_tag_length(text, 0), text.len() as u32);
    }
}
