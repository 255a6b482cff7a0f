// ── Minimal CSV reader/writer ──
//
// Enough of RFC 4180 for spreadsheet exports: comma separated, fields
// optionally double-quoted, `""` inside quotes is a literal quote, LF or
// CRLF line ends. Blank lines are skipped.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct CsvError {
    pub line: usize,
    pub reason: &'static str,
}

/// Split `text` into records.
pub(crate) fn parse(text: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.trim().is_empty() && !quoted => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                return Err(CsvError {
                    line,
                    reason: "unexpected quote inside an unquoted field",
                });
            }
            ',' => {
                record.push(finish(&mut field, quoted));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                end_record(&mut records, &mut record, &mut field, quoted);
                quoted = false;
                line += 1;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(CsvError {
            line,
            reason: "unterminated quoted field",
        });
    }
    end_record(&mut records, &mut record, &mut field, quoted);
    Ok(records)
}

fn finish(field: &mut String, quoted: bool) -> String {
    let value = std::mem::take(field);
    if quoted { value } else { value.trim().to_owned() }
}

fn end_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    quoted: bool,
) {
    let last = finish(field, quoted);
    if record.is_empty() && last.is_empty() && !quoted {
        return;
    }
    record.push(last);
    records.push(std::mem::take(record));
}

/// Quote a field, doubling embedded quotes.
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let rows = parse("a,\"b, c\",\"say \"\"hi\"\"\"\r\n1,2,3\n").unwrap();
        assert_eq!(rows[0], ["a", "b, c", "say \"hi\""]);
        assert_eq!(rows[1], ["1", "2", "3"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = parse("h1,h2\n\n x , y \n\n").unwrap();
        assert_eq!(rows, vec![vec!["h1", "h2"], vec!["x", "y"]]);
    }

    #[test]
    fn unterminated_quote_reports_line() {
        let err = parse("a,b\n\"open,c\n").unwrap_err();
        assert_eq!(err.reason, "unterminated quoted field");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(quote("12\" dish"), "\"12\"\" dish\"");
    }
}
