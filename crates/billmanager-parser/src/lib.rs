pub mod errors;
pub mod model;
mod reader;
pub mod schema;
pub mod validation;

pub use errors::{DataKind, ParserError, RecordError};
pub use model::{BillCreationRequest, CsvRecord, ParsedRecord};
pub use reader::{parse_bill_records, read_records, RecordBatch};
pub use schema::{is_csv_content_type, BillColumn, HeaderMap, BILL_COLUMNS, CSV_CONTENT_TYPE};
pub use validation::{parse_iso_date, validate_record};
