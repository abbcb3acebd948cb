use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use billmanager_parser::{is_csv_content_type, parse_bill_records};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::bills::BillService;
use crate::error::{BillError, Result};
use crate::views::BillView;

pub const ALL_IMPORTED_MESSAGE: &str = "All csv records have been imported.";
pub const PARTIALLY_IMPORTED_MESSAGE: &str =
    "Check the log, some csv records have errors and have not been imported.";

/// What happens when bill creation rejects a record that parsed cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationFailurePolicy {
    /// The row is recorded as failed and the import continues.
    #[default]
    Isolate,
    /// The import stops; rows created before it stay persisted.
    Abort,
}

impl CreationFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationFailurePolicy::Isolate => "isolate",
            CreationFailurePolicy::Abort => "abort",
        }
    }
}

impl fmt::Display for CreationFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown creation failure policy '{0}', expected 'isolate' or 'abort'")]
pub struct UnknownFailurePolicy(pub String);

impl FromStr for CreationFailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "isolate" => Ok(CreationFailurePolicy::Isolate),
            "abort" => Ok(CreationFailurePolicy::Abort),
            _ => Err(UnknownFailurePolicy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub on_failure: CreationFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub row: usize,
    /// `None` when the row was rejected.
    pub bill: Option<BillView>,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        self.bill.is_some()
    }
}

/// Result of one import, serialized in the paginated shape clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub content: Vec<BillView>,
    pub page_number: u32,
    pub page_size: usize,
    pub total_elements: usize,
    pub total_pages: u32,
    pub message: String,
    #[serde(skip)]
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportSummary {
    pub fn from_outcomes(outcomes: Vec<ImportOutcome>) -> Self {
        let content: Vec<BillView> = outcomes
            .iter()
            .filter_map(|outcome| outcome.bill.clone())
            .collect();
        let message = if content.len() == outcomes.len() {
            ALL_IMPORTED_MESSAGE
        } else {
            PARTIALLY_IMPORTED_MESSAGE
        };

        Self {
            page_number: 1,
            page_size: content.len(),
            total_elements: content.len(),
            total_pages: 1,
            message: message.to_string(),
            content,
            outcomes,
        }
    }

    pub fn total_records(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.content.len()
    }

    pub fn failed(&self) -> usize {
        self.total_records() - self.succeeded()
    }

    pub fn failed_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.row)
    }
}

/// Hashes everything read through it.
struct DigestReader<R> {
    inner: R,
    hasher: blake3::Hasher,
}

impl<R: Read> DigestReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

/// Imports every bill in a CSV upload.
///
/// The declared `content_type` must be `text/csv`; nothing is read
/// otherwise. The whole document is parsed before the first bill is
/// created, so a stream failure leaves the store untouched. Records are then
/// created one at a time in row order.
pub async fn import_csv<R: Read>(
    service: &BillService,
    content_type: Option<&str>,
    input: R,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let span = info_span!(
        "import",
        import_id = %Uuid::new_v4(),
        blake3 = field::Empty,
        on_failure = %options.on_failure,
    );
    run_import(service, content_type, input, options)
        .instrument(span)
        .await
}

async fn run_import<R: Read>(
    service: &BillService,
    content_type: Option<&str>,
    input: R,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let content_type = content_type.unwrap_or_default();
    if !is_csv_content_type(content_type) {
        warn!(content_type, "rejected upload with wrong content type");
        return Err(BillError::WrongFileType(content_type.to_string()));
    }

    let (parsed, digest) = {
        let mut reader = DigestReader::new(input);
        match parse_bill_records(&mut reader) {
            Ok(parsed) => (parsed, reader.finish()),
            Err(err) => {
                error!(error = %err, "failed to read csv upload");
                return Err(BillError::StreamRead(err));
            }
        }
    };
    Span::current().record("blake3", digest.as_str());
    info!(records = parsed.len(), "csv upload parsed");

    let mut outcomes = Vec::with_capacity(parsed.len());
    for record in parsed {
        let request = match record.result {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    row = record.row,
                    record_id = record.record_id.as_deref(),
                    field = err.field().map(|field| field.header()),
                    expected = err.expected().map(|kind| kind.as_str()),
                    "{err}"
                );
                outcomes.push(ImportOutcome {
                    row: record.row,
                    bill: None,
                });
                continue;
            }
        };

        match service.create(&request).await {
            Ok(bill) => outcomes.push(ImportOutcome {
                row: record.row,
                bill: Some(bill),
            }),
            Err(err)
                if err.is_business_rule()
                    && options.on_failure == CreationFailurePolicy::Isolate =>
            {
                warn!(row = record.row, error = %err, "bill creation rejected csv record");
                outcomes.push(ImportOutcome {
                    row: record.row,
                    bill: None,
                });
            }
            Err(err) if err.is_business_rule() => {
                error!(row = record.row, error = %err, "csv import aborted");
                return Err(BillError::ImportAborted {
                    row: record.row,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                error!(row = record.row, error = %err, "csv import failed");
                return Err(err);
            }
        }
    }

    let summary = ImportSummary::from_outcomes(outcomes);
    info!(
        total = summary.total_records(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "csv import finished"
    );
    Ok(summary)
}
