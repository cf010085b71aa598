use serde::{Deserialize, Serialize};

use crate::Record;

/// How `"` is interpreted while splitting a line into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteMode {
    /// `"` opens and closes a quoted section; `""` inside it is one literal quote.
    #[default]
    Rfc4180,
    /// Every `"` flips the in-quotes flag and is dropped. Literal quotes are lost.
    LegacyToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

/// Decode a document with the default [`QuoteMode`].
pub fn decode(text: &str) -> Vec<Record> {
    decode_with(text, QuoteMode::default())
}

/// Decode a document: first line is the header, every following line a row.
///
/// Rows shorter than the header are padded with `""`; extra fields are dropped.
/// A leading byte order mark is ignored.
pub fn decode_with(text: &str, mode: QuoteMode) -> Vec<Record> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = text.split('\n');
    let header = match lines.next() {
        Some(line) => decode_line_with(line, mode),
        None => return Vec::new(),
    };

    lines
        .map(|line| {
            let mut values = decode_line_with(line, mode).into_iter();
            header
                .iter()
                .map(|column| (column.clone(), values.next().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Split one line into trimmed fields with the default [`QuoteMode`].
pub fn decode_line(line: &str) -> Vec<String> {
    decode_line_with(line, QuoteMode::default())
}

pub fn decode_line_with(line: &str, mode: QuoteMode) -> Vec<String> {
    match mode {
        QuoteMode::Rfc4180 => split_quoted(line),
        QuoteMode::LegacyToggle => split_toggle(line),
    }
}

fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Unquoted;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (state, ch) {
            (ScanState::Unquoted, '"') => state = ScanState::Quoted,
            (ScanState::Unquoted, ',') => fields.push(take_field(&mut current)),
            (ScanState::Quoted, '"') => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    state = ScanState::Unquoted;
                }
            }
            (_, ch) => current.push(ch),
        }
    }

    fields.push(take_field(&mut current));
    fields
}

fn split_toggle(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(take_field(&mut current)),
            ch => current.push(ch),
        }
    }

    fields.push(take_field(&mut current));
    fields
}

fn take_field(current: &mut String) -> String {
    let field = current.trim().to_string();
    current.clear();
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_and_whitespace() {
        assert!(decode("").is_empty());
        assert!(decode("   \n\t \n").is_empty());
    }

    #[test]
    fn test_header_only_yields_no_records() {
        assert!(decode("Date,Description").is_empty());
    }

    #[test]
    fn test_decode_basic_document() {
        let records = decode("Date,Description\n2024-01-01,Lunch\n2024-01-02,Coffee\n");
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            Record::from([("Date", "2024-01-01"), ("Description", "Lunch")])
        );
        assert_eq!(records[1].value("Description"), "Coffee");
    }

    #[test]
    fn test_short_row_pads_missing_columns() {
        let records = decode("a,b,c\n1");
        assert_eq!(records[0], Record::from([("a", "1"), ("b", ""), ("c", "")]));
    }

    #[test]
    fn test_long_row_drops_extra_fields() {
        let records = decode("a,b\n1,2,3,4");
        assert_eq!(records[0], Record::from([("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_fields_are_trimmed() {
        assert_eq!(decode_line("  a , b  ,c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_crlf_is_absorbed_by_trim() {
        let records = decode("a,b\r\n1,2\r\n");
        assert_eq!(records[0], Record::from([("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_leading_byte_order_mark_is_ignored() {
        let records = decode("\u{feff}Date,Description\n2024-01-01,Lunch");
        assert_eq!(
            records[0],
            Record::from([("Date", "2024-01-01"), ("Description", "Lunch")])
        );
        assert!(decode("\u{feff}").is_empty());
    }

    #[test]
    fn test_interior_blank_line_is_an_empty_record() {
        let records = decode("a,b\n1,2\n\n3,4");
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], Record::from([("a", ""), ("b", "")]));
    }

    #[test]
    fn test_quoted_comma_stays_in_field() {
        assert_eq!(decode_line(r#"x,"a,b",y"#), vec!["x", "a,b", "y"]);
    }

    #[test]
    fn test_doubled_quote_is_unescaped() {
        assert_eq!(
            decode_line(r#""He said ""hi""",next"#),
            vec![r#"He said "hi""#, "next"]
        );
    }

    #[test]
    fn test_legacy_toggle_drops_quotes() {
        assert_eq!(
            decode_line_with(r#""He said ""hi""",next"#, QuoteMode::LegacyToggle),
            vec!["He said hi", "next"]
        );
        assert_eq!(
            decode_line_with(r#"x,"a,b",y"#, QuoteMode::LegacyToggle),
            vec!["x", "a,b", "y"]
        );
    }

    #[test]
    fn test_trailing_comma_emits_empty_field() {
        assert_eq!(decode_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_line() {
        assert_eq!(decode_line(r#"a,"b,c"#), vec!["a", "b,c"]);
    }

    #[test]
    fn test_duplicate_header_keeps_last_value() {
        let records = decode("a,a\n1,2");
        assert_eq!(records[0], Record::from([("a", "2")]));
    }

    #[test]
    fn test_quote_mode_serde_names() {
        let mode: QuoteMode = serde_json::from_str(r#""legacy_toggle""#).unwrap();
        assert_eq!(mode, QuoteMode::LegacyToggle);
        assert_eq!(QuoteMode::default(), QuoteMode::Rfc4180);
    }
}
