use billmanager_repository::{BillRecord, BillStatus, UserRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub email: String,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    pub id: i64,
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub bill_status: BillStatus,
    pub user: UserView,
}

impl From<&BillRecord> for BillView {
    fn from(bill: &BillRecord) -> Self {
        Self {
            id: bill.id,
            due_date: bill.due_date,
            payment_date: bill.payment_date,
            amount: bill.amount,
            description: bill.description.clone(),
            bill_status: bill.status,
            user: UserView::from(&bill.user),
        }
    }
}

impl From<BillRecord> for BillView {
    fn from(bill: BillRecord) -> Self {
        BillView::from(&bill)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub content: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}
