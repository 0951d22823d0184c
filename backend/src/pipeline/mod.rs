//! Parse, validate and merge pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use ingestgate::pipeline::{process_bytes, ProcessOptions};
//!
//! let result = process_bytes(upload, ProcessOptions { validate: true });
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! println!("{} valid records", result.valid_records.len());
//! ```

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use crate::error::ParseError;
use crate::models::{FieldError, LineOutcome, OutcomeEntry, ParsedLine, Record};
use crate::parser::{parse_bytes, parse_reader};
use crate::validation::validate_record;

/// Options for a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Apply field constraints to structurally valid records.
    pub validate: bool,
}

/// Merged outcome of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Records whose line has no error of any kind, in input order.
    pub valid_records: Vec<Record>,

    /// Parse errors first, then validation errors.
    pub errors: Vec<FieldError>,

    /// Number of non-blank lines seen.
    pub lines_read: usize,
}

impl PipelineResult {
    /// True when no line produced an error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Distinct line numbers carrying at least one error.
    pub fn error_lines(&self) -> BTreeSet<usize> {
        self.errors.iter().map(|e| e.line_number).collect()
    }

    /// Outcome entries for every valid record.
    pub fn outcome(&self) -> Vec<OutcomeEntry> {
        self.valid_records.iter().map(Record::outcome).collect()
    }
}

/// Run the pipeline over a reader.
///
/// Fails only when the reader itself fails.
pub fn process<R: Read>(reader: R, options: ProcessOptions) -> Result<PipelineResult, ParseError> {
    let outcomes = parse_reader(reader)?;
    Ok(merge(outcomes, options, validate_record))
}

/// Run the pipeline over a file on disk.
pub fn process_file<P: AsRef<Path>>(
    path: P,
    options: ProcessOptions,
) -> Result<PipelineResult, ParseError> {
    let file = std::fs::File::open(path.as_ref())?;
    process(file, options)
}

/// Run the pipeline over an in-memory upload.
pub fn process_bytes(bytes: &[u8], options: ProcessOptions) -> PipelineResult {
    merge(parse_bytes(bytes), options, validate_record)
}

/// Reconcile line outcomes with validation results.
///
/// `validator` is called once per structurally valid record, and only when
/// `options.validate` is set.
pub fn merge<F>(
    outcomes: Vec<LineOutcome>,
    options: ProcessOptions,
    mut validator: F,
) -> PipelineResult
where
    F: FnMut(&Record) -> Vec<String>,
{
    let lines_read = outcomes.len();
    let mut errors = Vec::new();
    let mut parsed = Vec::new();

    for outcome in outcomes {
        match outcome.parsed {
            ParsedLine::Error(message) => {
                errors.push(FieldError::new(outcome.line_number, outcome.raw_line, message));
            }
            ParsedLine::Record(record) => {
                parsed.push((outcome.line_number, outcome.raw_line, record));
            }
        }
    }

    if !options.validate {
        return PipelineResult {
            valid_records: parsed.into_iter().map(|(_, _, record)| record).collect(),
            errors,
            lines_read,
        };
    }

    for (line_number, raw_line, record) in &parsed {
        for message in validator(record) {
            errors.push(FieldError::new(*line_number, raw_line.as_str(), message));
        }
    }

    let blocked: BTreeSet<usize> = errors.iter().map(|e| e.line_number).collect();

    let valid_records = parsed
        .into_iter()
        .filter(|(line_number, _, _)| !blocked.contains(line_number))
        .map(|(_, _, record)| record)
        .collect();

    PipelineResult {
        valid_records,
        errors,
        lines_read,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_str, WRONG_FIELD_COUNT};
    use std::io::Write;

    const ALICE: &str = "550e8400-e29b-41d4-a716-446655440000|123|Alice|Coffee|Car|45.5|120.0";
    const BOB: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e|456|Bob|Tea|Bike|12.0|30.0";

    const VALIDATE: ProcessOptions = ProcessOptions { validate: true };
    const NO_VALIDATE: ProcessOptions = ProcessOptions { validate: false };

    fn run(content: &str, options: ProcessOptions) -> PipelineResult {
        process_bytes(content.as_bytes(), options)
    }

    #[test]
    fn test_single_valid_line_without_validation() {
        let result = run(ALICE, NO_VALIDATE);

        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.valid_records[0].name, "Alice");
        assert!(result.errors.is_empty());
        assert!(result.is_clean());
    }

    #[test]
    fn test_wrong_field_count_line() {
        let result = run("x|y", VALIDATE);

        assert!(result.valid_records.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line_number, 1);
        assert_eq!(result.errors[0].line_content, "x|y");
        assert_eq!(result.errors[0].message, WRONG_FIELD_COUNT);
    }

    #[test]
    fn test_malformed_uuid_with_validation() {
        let line = "not-a-uuid|123|Alice|Coffee|Car|45.5|120.0";
        let result = run(line, VALIDATE);

        assert!(result.valid_records.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("uuid"));
        assert!(result.errors[0].message.contains("Invalid UUID format"));
        assert_eq!(result.errors[0].line_content, line);
    }

    #[test]
    fn test_malformed_uuid_without_validation_is_kept() {
        let result = run("not-a-uuid|123|Alice|Coffee|Car|45.5|120.0", NO_VALIDATE);
        assert_eq!(result.valid_records.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validation_disabled_never_calls_validator() {
        let content = format!("{}\nx|y\n{}", ALICE, BOB);
        let mut calls = 0;
        let result = merge(parse_str(&content), NO_VALIDATE, |_| {
            calls += 1;
            vec!["boom".to_string()]
        });

        assert_eq!(calls, 0);
        assert_eq!(result.valid_records.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, WRONG_FIELD_COUNT);
    }

    #[test]
    fn test_validator_called_once_per_parsed_record() {
        let content = format!("{}\nx|y\n{}", ALICE, BOB);
        let mut calls = 0;
        merge(parse_str(&content), VALIDATE, |_| {
            calls += 1;
            Vec::new()
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_multiple_violations_share_a_line() {
        let line = "bad|123||Coffee|Car|-1|120.0";
        let content = format!("{}\n{}", ALICE, line);
        let result = run(&content, VALIDATE);

        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.valid_records[0].name, "Alice");
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().all(|e| e.line_number == 2));
        assert_eq!(result.error_lines().into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_parse_errors_come_before_validation_errors() {
        let content = format!("not-a-uuid|1|A|B|C|1|2\nx|y\n{}", ALICE);
        let result = run(&content, VALIDATE);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].line_number, 2);
        assert_eq!(result.errors[0].message, WRONG_FIELD_COUNT);
        assert_eq!(result.errors[1].line_number, 1);
        assert_eq!(result.valid_records.len(), 1);
    }

    #[test]
    fn test_line_numbers_count_blank_lines() {
        let content = format!("{}\n\n\nx|y", ALICE);
        let result = run(&content, VALIDATE);

        assert_eq!(result.errors[0].line_number, 4);
        assert_eq!(result.lines_read, 2);
    }

    #[test]
    fn test_valid_and_error_lines_are_disjoint() {
        let content = format!(
            "{}\nx|y\nnot-a-uuid|1|A|B|C|1|2\n\n{}\nu|c|n|l|t|abc|1\n{}|z",
            ALICE, BOB, ALICE
        );
        for options in [VALIDATE, NO_VALIDATE] {
            let result = run(&content, options);
            let error_lines = result.error_lines();
            assert!(result.valid_records.len() + error_lines.len() <= result.lines_read);
        }

        let result = run(&content, VALIDATE);
        assert_eq!(result.valid_records.len(), 2);
        assert_eq!(result.error_lines().into_iter().collect::<Vec<_>>(), vec![2, 3, 6, 7]);
    }

    #[test]
    fn test_idempotent() {
        let content = format!("{}\nx|y\nnot-a-uuid|1|A|B|C|1|2\n{}", ALICE, BOB);
        assert_eq!(run(&content, VALIDATE), run(&content, VALIDATE));
        assert_eq!(run(&content, NO_VALIDATE), run(&content, NO_VALIDATE));
    }

    #[test]
    fn test_outcome_projection() {
        let result = run(&format!("{}\n{}", ALICE, BOB), VALIDATE);
        let outcome = result.outcome();

        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome[1].name, "Bob");
        assert_eq!(outcome[1].transport, "Bike");
        assert_eq!(outcome[1].top_speed, 30.0);
    }

    #[test]
    fn test_process_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", ALICE).unwrap();
        writeln!(file, "x|y").unwrap();

        let result = process_file(file.path(), VALIDATE).unwrap();
        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_file(dir.path().join("missing.txt"), VALIDATE);
        assert!(matches!(result, Err(ParseError::Io(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let result = run("x|y", VALIDATE);
        let json = serde_json::to_value(&result).unwrap();

        assert!(json["validRecords"].as_array().unwrap().is_empty());
        assert_eq!(json["errors"][0]["lineNumber"], 1);
        assert_eq!(json["linesRead"], 1);
    }
}
