//! Domain models for the ingestion pipeline.
//!
//! - [`Record`] - One well-formed line of an uploaded file
//! - [`LineOutcome`] - Result of parsing a single non-blank line
//! - [`FieldError`] - A line-scoped error, from parsing or validation
//! - [`OutcomeEntry`] - Projection of a valid record handed to downstream consumers

use serde::{Deserialize, Serialize};

/// Number of `|`-separated fields on every record line.
pub const FIELD_COUNT: usize = 7;

/// Field delimiter of the record layout.
pub const DELIMITER: char = '|';

// =============================================================================
// Record
// =============================================================================

/// A structurally well-formed record.
///
/// Fields are stored trimmed. A `Record` says nothing about semantic
/// validity; see [`crate::validation::validate_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// UUID-shaped identifier.
    pub uuid: String,
    /// Short code.
    pub id: String,
    pub name: String,
    /// Preference (what the person likes).
    pub likes: String,
    /// Means of transport.
    pub transport: String,
    pub avg_speed: f64,
    pub top_speed: f64,
}

impl Record {
    /// Downstream projection of this record.
    pub fn outcome(&self) -> OutcomeEntry {
        OutcomeEntry {
            name: self.name.clone(),
            transport: self.transport.clone(),
            top_speed: self.top_speed,
        }
    }
}

// =============================================================================
// Line Outcome
// =============================================================================

/// What a single line turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Record(Record),
    /// Structural error message.
    Error(String),
}

/// Parse result for one non-blank input line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOutcome {
    /// 1-based physical line number (blank lines are counted).
    pub line_number: usize,
    /// The line exactly as read, without its terminator.
    pub raw_line: String,
    pub parsed: ParsedLine,
}

impl LineOutcome {
    pub fn record(line_number: usize, raw_line: impl Into<String>, record: Record) -> Self {
        Self {
            line_number,
            raw_line: raw_line.into(),
            parsed: ParsedLine::Record(record),
        }
    }

    pub fn error(
        line_number: usize,
        raw_line: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            raw_line: raw_line.into(),
            parsed: ParsedLine::Error(message.into()),
        }
    }

    /// The parsed record, if the line was well-formed.
    pub fn as_record(&self) -> Option<&Record> {
        match &self.parsed {
            ParsedLine::Record(record) => Some(record),
            ParsedLine::Error(_) => None,
        }
    }
}

// =============================================================================
// Field Error
// =============================================================================

/// A line-scoped error with enough context to locate the source row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub line_number: usize,
    pub line_content: String,
    /// Parse-stage message, or `<field>: <description>` for violations.
    pub message: String,
}

impl FieldError {
    pub fn new(
        line_number: usize,
        line_content: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            line_content: line_content.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {} ({})", self.line_number, self.message, self.line_content)
    }
}

// =============================================================================
// Outcome Entry
// =============================================================================

/// Entry of the outcome file produced for a fully valid upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub name: String,
    pub transport: String,
    pub top_speed: f64,
}
