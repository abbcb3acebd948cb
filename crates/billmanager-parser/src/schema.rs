use std::fmt;

use csv::StringRecord;

use crate::errors::DataKind;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BillColumn {
    Id,
    DueDate,
    PaymentDate,
    Amount,
    Description,
    UserEmail,
}

pub const BILL_COLUMNS: [BillColumn; 6] = [
    BillColumn::Id,
    BillColumn::DueDate,
    BillColumn::PaymentDate,
    BillColumn::Amount,
    BillColumn::Description,
    BillColumn::UserEmail,
];

impl BillColumn {
    pub fn header(&self) -> &'static str {
        match self {
            BillColumn::Id => "ID",
            BillColumn::DueDate => "Due Date",
            BillColumn::PaymentDate => "Payment Date",
            BillColumn::Amount => "Amount",
            BillColumn::Description => "Description",
            BillColumn::UserEmail => "User Email",
        }
    }

    pub fn kind(&self) -> Option<DataKind> {
        match self {
            BillColumn::Id | BillColumn::Amount => Some(DataKind::Number),
            BillColumn::DueDate | BillColumn::PaymentDate => Some(DataKind::Date),
            BillColumn::UserEmail => Some(DataKind::Email),
            BillColumn::Description => None,
        }
    }

    /// Matches a header cell, ignoring case and surrounding whitespace.
    pub fn from_header(raw: &str) -> Option<Self> {
        let name = raw.trim_start_matches('\u{feff}').trim();
        BILL_COLUMNS
            .into_iter()
            .find(|column| column.header().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for BillColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Positions of the recognized columns within a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    positions: Vec<(BillColumn, usize)>,
}

impl HeaderMap {
    pub fn resolve(headers: &StringRecord) -> Self {
        let mut positions: Vec<(BillColumn, usize)> = Vec::new();
        for (idx, raw) in headers.iter().enumerate() {
            let Some(column) = BillColumn::from_header(raw) else {
                continue;
            };
            // first occurrence wins
            if positions.iter().all(|(seen, _)| *seen != column) {
                positions.push((column, idx));
            }
        }
        Self { positions }
    }

    pub fn position(&self, column: BillColumn) -> Option<usize> {
        self.positions
            .iter()
            .find(|(seen, _)| *seen == column)
            .map(|(_, idx)| *idx)
    }

    /// Recognized columns in header order.
    pub fn columns(&self) -> impl Iterator<Item = (BillColumn, usize)> + '_ {
        self.positions.iter().copied()
    }

    pub fn missing(&self) -> Vec<BillColumn> {
        BILL_COLUMNS
            .into_iter()
            .filter(|column| self.position(*column).is_none())
            .collect()
    }
}

/// Compares a declared media type against `text/csv`, ignoring case and
/// parameters such as `charset`.
pub fn is_csv_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE))
        .unwrap_or(false)
}
