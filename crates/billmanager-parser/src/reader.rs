use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::errors::{ParserError, RecordError};
use crate::model::{CsvRecord, ParsedRecord};
use crate::schema::{BillColumn, HeaderMap};
use crate::validation::validate_record;

/// Every data row of a document, decoded but not yet validated.
#[derive(Debug)]
pub struct RecordBatch {
    pub header: HeaderMap,
    pub records: Vec<Result<CsvRecord, RecordError>>,
}

/// Reads the header and all data rows.
///
/// Only stream failures are returned as `Err`; a row the reader cannot
/// decode becomes a [`RecordError::MalformedRow`] in the batch.
pub fn read_records<R: Read>(input: R) -> Result<RecordBatch, ParserError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let header = match reader.headers() {
        Ok(headers) => HeaderMap::resolve(headers),
        Err(err) if err.is_io_error() => return Err(ParserError::Io { source: err }),
        Err(err) => {
            return Err(ParserError::InvalidHeader {
                message: err.to_string(),
            })
        }
    };

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        match result {
            Ok(record) => records.push(Ok(CsvRecord::from_string_record(row, &header, &record))),
            Err(err) if err.is_io_error() => return Err(ParserError::Io { source: err }),
            Err(err) => records.push(Err(RecordError::MalformedRow {
                row,
                message: err.to_string(),
            })),
        }
    }

    Ok(RecordBatch { header, records })
}

/// Reads and validates a whole document, one [`ParsedRecord`] per data row.
pub fn parse_bill_records<R: Read>(input: R) -> Result<Vec<ParsedRecord>, ParserError> {
    let batch = read_records(input)?;

    let parsed = batch
        .records
        .into_iter()
        .map(|decoded| match decoded {
            Ok(record) => ParsedRecord {
                row: record.row(),
                record_id: record
                    .get(BillColumn::Id)
                    .filter(|id| !id.trim().is_empty())
                    .map(str::to_string),
                result: validate_record(&record),
            },
            Err(err) => ParsedRecord {
                row: err.row(),
                record_id: None,
                result: Err(err),
            },
        })
        .collect();

    Ok(parsed)
}
