//! Output helpers: JSON serialization and delimited (CSV-like) records.

use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any extraction result to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Join fields with `delimiter`.
///
/// Fields containing the delimiter, a quote or a line break are quoted,
/// with quotes doubled.
pub fn write_record(fields: &[&str], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains(delimiter) || f.contains('"') || f.contains('\n') || f.contains('\r') {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// Split one line written by [`write_record`] (or a spreadsheet) into fields.
pub fn parse_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            '"' if field.is_empty() => quoted = true,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&vec![Rect::new(0.0, 1.0, 2.0, 3.0)], JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"x1\": 2.0"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&Rect::new(0.0, 0.0, 1.0, 1.0), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
    }

    #[test]
    fn test_records() {
        let line = write_record(&["1", "a;b", "say \"hi\"", ""], ';');
        assert_eq!(line, "1;\"a;b\";\"say \"\"hi\"\"\";");
        assert_eq!(parse_record(&line, ';'), ["1", "a;b", "say \"hi\"", ""]);
        assert_eq!(parse_record("x,y", ';'), ["x,y"]);
        assert_eq!(parse_record("", ';'), [""]);
    }
}
