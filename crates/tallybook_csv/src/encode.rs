use std::borrow::Cow;

use crate::Record;

/// Encode records as CSV text.
///
/// The header is the first record's columns in order. Every record is
/// projected onto that header, so columns the first record lacks are dropped
/// and columns a later record lacks are written as `""`.
pub fn encode(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let header: Vec<&str> = first.columns().collect();
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(join_fields(header.iter().copied()));

    for record in records {
        lines.push(join_fields(header.iter().map(|column| record.value(column))));
    }

    lines.join("\n")
}

/// Quote `value` if it contains a delimiter or a quote.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(',') || value.contains('"') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn join_fields<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(escape_field).collect::<Vec<_>>().join(",")
}
