use std::fmt;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::RecordError;
use crate::schema::{BillColumn, HeaderMap};

/// One data row keyed by recognized column, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    row: usize,
    values: Vec<(BillColumn, String)>,
}

impl CsvRecord {
    pub fn new(row: usize, values: impl IntoIterator<Item = (BillColumn, String)>) -> Self {
        Self {
            row,
            values: values.into_iter().collect(),
        }
    }

    pub(crate) fn from_string_record(row: usize, header: &HeaderMap, record: &StringRecord) -> Self {
        let values = header
            .columns()
            .filter_map(|(column, idx)| record.get(idx).map(|value| (column, value.to_string())))
            .collect();
        Self { row, values }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// `None` when the column is absent from the header or the row is short.
    pub fn get(&self, column: BillColumn) -> Option<&str> {
        self.values
            .iter()
            .find(|(seen, _)| *seen == column)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for CsvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsvRecord[row={}", self.row)?;
        for (column, value) in &self.values {
            write!(f, ", {column}={value}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillCreationRequest {
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub user_email: String,
}

/// Result of reading and validating one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub row: usize,
    pub record_id: Option<String>,
    pub result: Result<BillCreationRequest, RecordError>,
}

impl ParsedRecord {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}
