//! Stateless checks that turn a [`CsvRecord`] into a [`BillCreationRequest`].

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::{DataKind, RecordError};
use crate::model::{BillCreationRequest, CsvRecord};
use crate::schema::BillColumn;

/// Validates one record.
///
/// Presence checks run first (ID, Payment Date, Amount, User Email), then
/// the typed parses (Due Date, Payment Date, Amount). The first failure wins.
pub fn validate_record(record: &CsvRecord) -> Result<BillCreationRequest, RecordError> {
    let row = record.row();

    let record_id = non_blank(record, BillColumn::Id)
        .ok_or(RecordError::MissingRequiredField {
            row,
            record_id: None,
            field: BillColumn::Id,
            expected: DataKind::Number,
        })?
        .to_string();

    let payment_date = required(record, BillColumn::PaymentDate, &record_id)?;
    let amount = required(record, BillColumn::Amount, &record_id)?;
    let user_email = required(record, BillColumn::UserEmail, &record_id)?;

    let due_date = parse_date(
        row,
        &record_id,
        BillColumn::DueDate,
        record.get(BillColumn::DueDate).unwrap_or(""),
    )?;
    let payment_date = parse_date(row, &record_id, BillColumn::PaymentDate, payment_date)?;
    let amount = parse_amount(row, &record_id, amount)?;

    let description = non_blank(record, BillColumn::Description)
        .unwrap_or("")
        .to_string();

    Ok(BillCreationRequest {
        due_date,
        payment_date,
        amount,
        description,
        user_email: user_email.to_string(),
    })
}

/// ISO `yyyy-MM-dd`.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

fn non_blank(record: &CsvRecord, column: BillColumn) -> Option<&str> {
    record
        .get(column)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required<'a>(
    record: &'a CsvRecord,
    column: BillColumn,
    record_id: &str,
) -> Result<&'a str, RecordError> {
    non_blank(record, column).ok_or_else(|| RecordError::MissingRequiredField {
        row: record.row(),
        record_id: Some(record_id.to_string()),
        field: column,
        expected: column.kind().unwrap_or(DataKind::Number),
    })
}

fn parse_date(
    row: usize,
    record_id: &str,
    column: BillColumn,
    raw: &str,
) -> Result<NaiveDate, RecordError> {
    parse_iso_date(raw).map_err(|err| RecordError::InvalidValue {
        row,
        record_id: record_id.to_string(),
        field: column,
        expected: DataKind::Date,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_amount(row: usize, record_id: &str, raw: &str) -> Result<Decimal, RecordError> {
    Decimal::from_str(raw.trim()).map_err(|err| RecordError::InvalidValue {
        row,
        record_id: record_id.to_string(),
        field: BillColumn::Amount,
        expected: DataKind::Number,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}
