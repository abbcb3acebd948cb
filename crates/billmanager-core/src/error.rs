use billmanager_parser::ParserError;
use billmanager_repository::{RepositoryError, UnknownBillStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillError {
    #[error("The file must be a CSV, received content type '{0}'")]
    WrongFileType(String),

    #[error("An unexpected error occurred while reading the CSV: {0}")]
    StreamRead(#[from] ParserError),

    #[error("{0}")]
    UserNotFound(String),

    #[error("User with email {0} already exist.")]
    UserAlreadyExists(String),

    #[error("{0}")]
    BillNotFound(String),

    #[error("This bill already paid, you can't modify the status of this bill.")]
    BillAlreadyPaid,

    #[error("The 'paymentDate' field must have a date before or equal to the 'dueDate' field.")]
    PaymentDate,

    #[error(transparent)]
    InvalidBillStatus(#[from] UnknownBillStatus),

    #[error("{0}")]
    Validation(String),

    #[error("CSV import stopped at row {row}: {source}")]
    ImportAborted {
        row: usize,
        #[source]
        source: Box<BillError>,
    },

    #[error("Repository operation failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl BillError {
    pub(crate) fn user_email_not_found(email: &str) -> Self {
        BillError::UserNotFound(format!("User with email {email} not exist."))
    }

    pub(crate) fn user_id_not_found(id: i64) -> Self {
        BillError::UserNotFound(format!("User with id {id} not exist."))
    }

    pub(crate) fn bill_not_found(id: i64) -> Self {
        BillError::BillNotFound(format!("Bill with id {id} not exist."))
    }

    /// Rejections raised by the bill rules themselves, as opposed to
    /// infrastructure failures. Only these may be isolated to a single
    /// CSV row.
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            BillError::UserNotFound(_)
                | BillError::UserAlreadyExists(_)
                | BillError::BillNotFound(_)
                | BillError::BillAlreadyPaid
                | BillError::PaymentDate
                | BillError::InvalidBillStatus(_)
                | BillError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BillError>;
