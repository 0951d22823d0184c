//! Line-oriented parser for pipe-delimited record files.
//!
//! Every non-blank line becomes a [`LineOutcome`]: either a [`Record`] or a
//! structural error message. A bad line never stops the parse; only a failure
//! to read the input at all does.

use std::io::Read;

use crate::error::ParseError;
use crate::models::{LineOutcome, Record, DELIMITER, FIELD_COUNT};

/// Message for lines that do not split into exactly [`FIELD_COUNT`] fields.
pub const WRONG_FIELD_COUNT: &str = "Incorrect number of fields, expected 7";

/// Message for lines whose speed fields are not floating point numbers.
pub const INVALID_NUMBER: &str = "Invalid number format in avg_speed or top_speed";

/// Decode raw upload bytes as UTF-8.
///
/// A leading byte order mark is dropped and malformed sequences are replaced
/// with U+FFFD, so decoding itself never fails.
pub fn decode_content(bytes: &[u8]) -> String {
    let (content, _had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    content.into_owned()
}

/// Parse every line of a reader.
///
/// The reader is drained before any line is parsed: an IO error yields
/// [`ParseError::Io`] and no outcomes at all.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Vec<LineOutcome>, ParseError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(parse_bytes(&bytes))
}

/// Parse raw upload bytes.
pub fn parse_bytes(bytes: &[u8]) -> Vec<LineOutcome> {
    parse_str(&decode_content(bytes))
}

/// Parse already-decoded content.
///
/// # Example
/// ```ignore
/// use ingestgate::parser::parse_str;
///
/// let outcomes = parse_str("x|y\n\n550e8400-e29b-41d4-a716-446655440000|1|Bob|Tea|Bike|12|30");
/// assert_eq!(outcomes.len(), 2);
/// assert_eq!(outcomes[1].line_number, 3);
/// ```
pub fn parse_str(content: &str) -> Vec<LineOutcome> {
    Lines { rest: content }
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_line(idx + 1, line))
        .collect()
}

/// Parse one non-blank line.
///
/// Trailing empty fields are dropped before counting, so `a|b|c|d|e|1|2|`
/// still holds seven fields.
pub fn parse_line(line_number: usize, line: &str) -> LineOutcome {
    let mut fields: Vec<&str> = line.split(DELIMITER).collect();
    while fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }

    if fields.len() != FIELD_COUNT {
        return LineOutcome::error(line_number, line, WRONG_FIELD_COUNT);
    }

    let fields: Vec<&str> = fields.into_iter().map(str::trim).collect();

    let (avg_speed, top_speed) = match (fields[5].parse::<f64>(), fields[6].parse::<f64>()) {
        (Ok(avg), Ok(top)) => (avg, top),
        _ => return LineOutcome::error(line_number, line, INVALID_NUMBER),
    };

    let record = Record {
        uuid: fields[0].to_string(),
        id: fields[1].to_string(),
        name: fields[2].to_string(),
        likes: fields[3].to_string(),
        transport: fields[4].to_string(),
        avg_speed,
        top_speed,
    };

    LineOutcome::record(line_number, line, record)
}

/// Lines terminated by `\n`, `\r\n` or a lone `\r`.
struct Lines<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }

        match self.rest.find(|c: char| c == '\r' || c == '\n') {
            Some(end) => {
                let line = &self.rest[..end];
                let terminator = if self.rest[end..].starts_with("\r\n") { 2 } else { 1 };
                self.rest = &self.rest[end + terminator..];
                Some(line)
            }
            None => Some(std::mem::take(&mut self.rest)),
        }
    }
}
