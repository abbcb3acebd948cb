use std::fmt;

use thiserror::Error;

use crate::schema::BillColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Number,
    Date,
    Email,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Number => "number",
            DataKind::Date => "date",
            DataKind::Email => "email",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single data row that could not be turned into a bill request.
///
/// `row` is the 1-based data row number; the header is not counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("{}", missing_field_message(.row, .record_id, .field, .expected))]
    MissingRequiredField {
        row: usize,
        record_id: Option<String>,
        field: BillColumn,
        expected: DataKind,
    },

    #[error("Check the record with ID={record_id}, the field '{field}' expects to receive a {expected}. Found '{value}': {reason}")]
    InvalidValue {
        row: usize,
        record_id: String,
        field: BillColumn,
        expected: DataKind,
        value: String,
        reason: String,
    },

    #[error("CSV row {row} could not be decoded: {message}")]
    MalformedRow { row: usize, message: String },
}

impl RecordError {
    pub fn row(&self) -> usize {
        match self {
            RecordError::MissingRequiredField { row, .. }
            | RecordError::InvalidValue { row, .. }
            | RecordError::MalformedRow { row, .. } => *row,
        }
    }

    pub fn field(&self) -> Option<BillColumn> {
        match self {
            RecordError::MissingRequiredField { field, .. }
            | RecordError::InvalidValue { field, .. } => Some(*field),
            RecordError::MalformedRow { .. } => None,
        }
    }

    pub fn expected(&self) -> Option<DataKind> {
        match self {
            RecordError::MissingRequiredField { expected, .. }
            | RecordError::InvalidValue { expected, .. } => Some(*expected),
            RecordError::MalformedRow { .. } => None,
        }
    }
}

// Without an ID the physical line is reported (header = line 1).
fn missing_field_message(
    row: &usize,
    record_id: &Option<String>,
    field: &BillColumn,
    expected: &DataKind,
) -> String {
    match record_id {
        Some(id) => format!(
            "Check the record with ID={id}, the field '{field}' expects to receive a {expected}."
        ),
        None => format!(
            "Check the record of line {}, the field '{field}' expects to receive a {expected}",
            row + 1
        ),
    }
}

/// Failures that abort reading the whole document.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to read CSV stream: {source}")]
    Io {
        #[source]
        source: csv::Error,
    },

    #[error("CSV header row invalid: {message}")]
    InvalidHeader { message: String },
}
