//! Persistence for users and bills: the repository traits plus Postgres and
//! in-memory implementations.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::migrate::MigrateError;
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    Pending,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "PENDING",
            BillStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value invalid to enum BillStatus: {0}")]
pub struct UnknownBillStatus(pub String);

impl FromStr for BillStatus {
    type Err = UnknownBillStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BillStatus::Pending),
            "PAID" => Ok(BillStatus::Paid),
            _ => Err(UnknownBillStatus(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub(crate) fn from_stored(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBill {
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub status: BillStatus,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillRecord {
    pub id: i64,
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub status: BillStatus,
    pub user: UserRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BillSort {
    #[default]
    DueDate,
    PaymentDate,
    Amount,
    Description,
    Id,
}

impl BillSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillSort::DueDate => "dueDate",
            BillSort::PaymentDate => "paymentDate",
            BillSort::Amount => "amount",
            BillSort::Description => "description",
            BillSort::Id => "id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort property '{0}'")]
pub struct UnknownSortKey(pub String);

impl FromStr for BillSort {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "dueDate" => Ok(BillSort::DueDate),
            "paymentDate" => Ok(BillSort::PaymentDate),
            "amount" => Ok(BillSort::Amount),
            "description" => Ok(BillSort::Description),
            "id" => Ok(BillSort::Id),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// Bills due on or after `due_date_from` whose description contains
/// `description`, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillQuery {
    pub due_date_from: NaiveDate,
    pub description: String,
    /// Zero-based.
    pub page: u32,
    pub size: u32,
    pub sort: BillSort,
}

impl BillQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillPage {
    pub items: Vec<BillRecord>,
    pub total_elements: u64,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("invalid stored value '{0}'")]
    InvalidStatus(String),

    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("sum of bill amounts due between {start} and {end} overflows")]
    AmountOverflow { start: NaiveDate, end: NaiveDate },
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &NewUser) -> Result<UserRecord, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepositoryError>;
}

#[async_trait]
pub trait BillRepository: Send + Sync {
    async fn insert_bill(&self, bill: &NewBill) -> Result<BillRecord, RepositoryError>;
    /// Overwrites every column of the bill with `bill.id`.
    async fn update_bill(&self, bill: &BillRecord) -> Result<BillRecord, RepositoryError>;
    async fn find_bill_by_id(&self, id: i64) -> Result<Option<BillRecord>, RepositoryError>;
    async fn search_bills(&self, query: &BillQuery) -> Result<BillPage, RepositoryError>;
    /// Sum of amounts for bills with `start <= due_date <= end`.
    async fn total_amount_by_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, RepositoryError>;
}
