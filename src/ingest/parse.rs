//! Upload decoding and CSV parsing.

use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Delimiters considered when sniffing an upload.
const DELIMITER_CANDIDATES: &[u8] = &[b'\t', b';', b',', b'|'];

/// Lines sampled when sniffing.
const SNIFF_LINES: usize = 10;

/// One data record, as (column, raw value) pairs in header order.
///
/// `None` marks a cell that was missing from a short record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    fields: Vec<(String, Option<String>)>,
}

impl ParsedRecord {
    /// Pair values with header names. Missing trailing values become
    /// `None`; values beyond the last header are dropped.
    pub fn from_fields<I>(headers: &[String], values: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut values = values.into_iter();
        let fields = headers
            .iter()
            .map(|h| (h.clone(), values.next().flatten()))
            .collect();
        Self { fields }
    }

    /// Raw value of a column; `None` if the column is absent or the cell
    /// was missing.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }
}

/// A decoded upload: header row plus data records.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub records: Vec<ParsedRecord>,
}

impl ParsedTable {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

/// Decode raw upload bytes.
///
/// UTF-8 first (dropping a leading BOM); invalid UTF-8 falls back to
/// Windows-1252, the usual encoding of spreadsheet exports.
#[must_use]
pub fn decode_upload(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            warn!("Upload is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate, count fields per line. The delimiter producing the
/// most consistent field count (>1 field) wins; more columns break ties.
fn sniff_delimiter(content: &str) -> u8 {
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(std::result::Result::ok)
                    .map_or(1, |r| r.len())
            })
            .collect();

        let Some(&target) = counts.first() else {
            continue;
        };
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Suffix repeated header names (`Name`, `Name_2`, `Name_3`) so every
/// column keeps its own value in a snapshot.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{header}_{n}");
            n += 1;
        }
        if name != header {
            warn!(header = %header, renamed = %name, "Duplicate header renamed");
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

/// Parse an upload into a header row and data records.
///
/// Every record the reader yields is kept, including ones whose cells are
/// all blank; only empty lines are skipped. Repeated header names are
/// renamed with a numeric suffix.
///
/// # Errors
///
/// Returns `InvalidFormat` for an empty body or a missing header row, and
/// `Csv` if the reader fails mid-file.
pub fn parse_upload(bytes: &[u8]) -> Result<ParsedTable> {
    let content = decode_upload(bytes);
    if content.trim().is_empty() {
        return Err(Error::InvalidFormat("empty upload".to_string()));
    }

    let delimiter = sniff_delimiter(&content);
    debug!(delimiter = %char::from(delimiter), "Sniffed delimiter");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(Error::InvalidFormat("missing header row".to_string()));
    }
    let headers = dedupe_headers(headers);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(ParsedRecord::from_fields(
            &headers,
            record.iter().map(|field| Some(field.to_string())),
        ));
    }

    Ok(ParsedTable { headers, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let table = parse_upload(b"Name,ID,Email\nA,1,a@x\nB,2,b@x\n").unwrap();
        assert_eq!(table.headers, vec!["Name", "ID", "Email"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.records[1].get("Email"), Some("b@x"));
    }

    #[test]
    fn test_empty_upload_is_invalid() {
        assert!(matches!(parse_upload(b""), Err(Error::InvalidFormat(_))));
        assert!(matches!(parse_upload(b"  \n\n"), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_blank_header_row_is_invalid() {
        let err = parse_upload(b" , ,\n1,2,3\n").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(msg) if msg.contains("header")));
    }

    #[test]
    fn test_header_only_upload() {
        let table = parse_upload(b"id,name\n").unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_short_records_yield_missing_cells() {
        let table = parse_upload(b"a,b,c\n1,2\n4,5,6,7\n").unwrap();
        assert_eq!(table.records[0].get("c"), None);
        assert_eq!(table.records[1].get("c"), Some("6"));
        assert_eq!(table.records[1].columns().count(), 3);
    }

    #[test]
    fn test_semicolon_and_tab_delimiters() {
        let table = parse_upload(b"id;name\n1;x\n2;y\n").unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);

        let table = parse_upload(b"id\tname\n1\tx\n").unwrap();
        assert_eq!(table.records[0].get("name"), Some("x"));
    }

    #[test]
    fn test_bom_and_latin1() {
        let table = parse_upload("\u{feff}id,name\n1,x\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0], "id");

        // "café" in Windows-1252
        let table = parse_upload(b"id,name\n1,caf\xe9\n").unwrap();
        assert_eq!(table.records[0].get("name"), Some("café"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let table = parse_upload(b"id,name\n1,x\n\n2,y\n").unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_all_blank_record_is_kept() {
        let table = parse_upload(b"ID,Name\n,\n2,b\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.records[0].get("ID"), Some(""));
    }

    #[test]
    fn test_repeated_headers_are_suffixed() {
        let table = parse_upload(b"ID,Name,Name,Name_2\n1,a,b,c\n").unwrap();
        assert_eq!(table.headers, vec!["ID", "Name", "Name_2", "Name_2_2"]);
        assert_eq!(table.records[0].get("Name"), Some("a"));
        assert_eq!(table.records[0].get("Name_2"), Some("b"));
        assert_eq!(table.records[0].get("Name_2_2"), Some("c"));
    }

    #[test]
    fn test_empty_key_row_is_counted() {
        let table = parse_upload(b"ID,Name\n,x\n").unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.records[0].get("ID"), Some(""));
    }
}
