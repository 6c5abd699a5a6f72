//! Note file header: `# title`, `id: <id>`, optional `labels:` line.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::Note;
use crate::sync::file::write_lines;
use crate::sync::SyncResult;

/// Number of lines read when only the header is needed.
const HEADER_PROBE_LINES: usize = 5;

/// A label is either double-quoted (may contain commas) or a bare run.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|([^,"]+)"#).expect("valid label regex"));

/// Identity fields parsed from the top of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Title from the `#` line; `Some("")` for a bare `#`.
    pub title: Option<String>,
    /// Id from the `id:` line. An empty id counts as absent.
    pub id: Option<String>,
}

/// Header plus labels and the index where the body starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    pub header: Header,
    pub labels: Vec<String>,
    pub body_start: usize,
}

/// Parse the `#` and `id:` lines. Returns the header and the index of the
/// first line after them.
#[must_use]
pub fn parse_meta<S: AsRef<str>>(lines: &[S]) -> (Header, usize) {
    let mut header = Header::default();
    let mut i = 0;

    if let Some(title) = lines.first().and_then(|line| line.as_ref().strip_prefix('#')) {
        header.title = Some(title.trim().to_string());
        i += 1;
    }
    if let Some(id) = lines.get(i).and_then(|line| line.as_ref().strip_prefix("id:")) {
        let id = id.trim();
        if !id.is_empty() {
            header.id = Some(id.to_string());
        }
        i += 1;
    }

    (header, i)
}

/// Parse the full header, including labels and the separating blank line.
#[must_use]
pub fn parse_header<S: AsRef<str>>(lines: &[S]) -> ParsedHeader {
    let (header, mut i) = parse_meta(lines);

    let mut labels = Vec::new();
    if let Some(rest) = lines.get(i).and_then(|line| line.as_ref().strip_prefix("labels:")) {
        labels = parse_labels(rest);
        i += 1;
    }
    if lines.get(i).is_some_and(|line| line.as_ref().trim().is_empty()) {
        i += 1;
    }

    ParsedHeader {
        header,
        labels,
        body_start: i,
    }
}

/// Split a label list on commas, honouring double quotes.
#[must_use]
pub fn parse_labels(s: &str) -> Vec<String> {
    LABEL_RE
        .captures_iter(s)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

/// Render a label list, quoting names that contain a comma.
#[must_use]
pub fn format_labels(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| {
            if label.contains(',') {
                format!("\"{label}\"")
            } else {
                label.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Header lines for a note, including the trailing blank line.
#[must_use]
pub fn format_header(note: &Note) -> Vec<String> {
    let mut lines = vec![format!("# {}", note.title().trim()), format!("id: {}", note.id())];
    if !note.labels().is_empty() {
        lines.push(format!("labels: {}", format_labels(note.labels())));
    }
    lines.push(String::new());
    lines
}

/// Read only the identity header of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_header(path: &Path) -> std::io::Result<Header> {
    let lines = super::read_lines_limit(path, HEADER_PROBE_LINES)?;
    Ok(parse_meta(&lines).0)
}

/// Insert or replace the `#` and `id:` lines of a file in place.
///
/// # Errors
///
/// Returns an error if the file cannot be read or rewritten.
pub fn write_file_header(path: &Path, id: &str, title: &str) -> SyncResult<()> {
    let mut lines = super::read_lines(path)?;
    let (header, _) = parse_meta(&lines);
    set_meta(&mut lines, &header, id, title);
    write_lines(path, &lines)
}

fn set_meta(lines: &mut Vec<String>, header: &Header, id: &str, title: &str) {
    match header.title.as_deref() {
        None => lines.insert(0, format!("# {title}")),
        Some(current) if current != title => lines[0] = format!("# {title}"),
        Some(_) => {}
    }
    // A present-but-empty id line still occupies index 1.
    let has_id_line = lines.get(1).is_some_and(|line| line.starts_with("id:"));
    match header.id.as_deref() {
        Some(current) if current == id => {}
        _ if has_id_line => lines[1] = format!("id: {id}"),
        _ => lines.insert(1, format!("id: {id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_meta_full() {
        let (header, i) = parse_meta(&["# Title", "id: abc", "body"]);
        assert_eq!(header.title.as_deref(), Some("Title"));
        assert_eq!(header.id.as_deref(), Some("abc"));
        assert_eq!(i, 2);
    }

    #[test]
    fn test_parse_meta_missing_lines() {
        let (header, i) = parse_meta(&["body only"]);
        assert_eq!(header, Header::default());
        assert_eq!(i, 0);

        let (header, _) = parse_meta(&["#", "id:   "]);
        assert_eq!(header.title.as_deref(), Some(""));
        assert!(header.id.is_none());
    }

    #[test]
    fn test_parse_header_skips_one_blank() {
        let parsed = parse_header(&["# T", "id: x", "labels: a, b", "", "", "body"]);
        assert_eq!(parsed.labels, vec!["a", "b"]);
        assert_eq!(parsed.body_start, 4);
    }

    #[test]
    fn test_parse_labels_quoted() {
        let labels = parse_labels(r#" work, "a, b",  home ,, "#);
        assert_eq!(labels, vec!["work", "a, b", "home"]);
    }

    #[test]
    fn test_format_labels_quotes_commas() {
        let labels = vec!["work".to_string(), "a, b".to_string()];
        assert_eq!(format_labels(&labels), r#"work, "a, b""#);
        assert_eq!(parse_labels(&format_labels(&labels)), labels);
    }

    #[test]
    fn test_write_file_header_inserts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.note");
        fs::write(&path, "just text\n").unwrap();

        write_file_header(&path, "id1", "plain").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# plain\nid: id1\njust text\n");
    }

    #[test]
    fn test_write_file_header_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.note");
        fs::write(&path, "# Old\nid: old\n\nbody\n").unwrap();

        write_file_header(&path, "new", "New").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# New\nid: new\n\nbody\n");
    }

    #[test]
    fn test_write_file_header_keeps_title_adds_id() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.note");
        fs::write(&path, "# Same\nbody\n").unwrap();

        write_file_header(&path, "id9", "Same").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# Same\nid: id9\nbody\n");
    }
}
