use std::fmt;
use std::sync::Arc;

use billmanager_parser::BillCreationRequest;
use billmanager_repository::{
    BillQuery, BillRecord, BillRepository, BillSort, BillStatus, NewBill,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BillError, Result};
use crate::users::UserService;
use crate::views::{BillView, PaginatedResponse};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReference {
    #[serde(default)]
    pub email: String,
}

/// Bill payload accepted by the create and update endpoints.
///
/// Every field is optional on the wire so that missing values surface as
/// validation messages rather than deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRequest {
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub bill_status: Option<BillStatus>,
    pub user: Option<UserReference>,
}

/// Validated replacement values for an existing bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillUpdate {
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub status: BillStatus,
    /// When present the bill moves to this user.
    pub user_email: Option<String>,
}

impl BillRequest {
    pub fn into_creation(self) -> Result<BillCreationRequest> {
        self.into_creation_on(Utc::now().date_naive())
    }

    /// Like [`BillRequest::into_creation`], with both dates required to fall
    /// after `today`.
    pub fn into_creation_on(self, today: NaiveDate) -> Result<BillCreationRequest> {
        let mut problems = self.common_problems(today);
        let email = self
            .user
            .as_ref()
            .map(|user| user.email.trim().to_string())
            .filter(|email| !email.is_empty());
        if self.user.is_none() {
            problems.push("The 'user' field is required");
        } else if email.is_none() {
            problems.push("The field 'email' is required");
        }
        reject(&problems)?;

        match (self.due_date, self.payment_date, self.amount, self.description, email) {
            (Some(due_date), Some(payment_date), Some(amount), Some(description), Some(user_email)) => {
                Ok(BillCreationRequest {
                    due_date,
                    payment_date,
                    amount,
                    description: description.trim().to_string(),
                    user_email,
                })
            }
            _ => Err(BillError::Validation("The bill request is incomplete".into())),
        }
    }

    pub fn into_update(self) -> Result<BillUpdate> {
        self.into_update_on(Utc::now().date_naive())
    }

    pub fn into_update_on(self, today: NaiveDate) -> Result<BillUpdate> {
        let mut problems = self.common_problems(today);
        if self.bill_status.is_none() {
            problems.push("The field 'billStatus' is required");
        }
        reject(&problems)?;

        let user_email = self
            .user
            .map(|user| user.email.trim().to_string())
            .filter(|email| !email.is_empty());

        match (
            self.due_date,
            self.payment_date,
            self.amount,
            self.description,
            self.bill_status,
        ) {
            (Some(due_date), Some(payment_date), Some(amount), Some(description), Some(status)) => {
                Ok(BillUpdate {
                    due_date,
                    payment_date,
                    amount,
                    description: description.trim().to_string(),
                    status,
                    user_email,
                })
            }
            _ => Err(BillError::Validation("The bill request is incomplete".into())),
        }
    }

    fn common_problems(&self, today: NaiveDate) -> Vec<&'static str> {
        let mut problems = Vec::new();
        match self.due_date {
            None => problems.push("The field 'dueDate' is required"),
            Some(due_date) if due_date <= today => {
                problems.push("The field 'dueDate' must be a date in the future")
            }
            Some(_) => {}
        }
        match self.payment_date {
            None => problems.push("The field 'paymentDate' is required"),
            Some(payment_date) if payment_date <= today => {
                problems.push("The field 'paymentDate' must be a date in the future")
            }
            Some(_) => {}
        }
        match self.amount {
            None => problems.push("The field 'amount' is required"),
            Some(amount) if amount <= Decimal::new(1, 1) => {
                problems.push("The field 'amount' must have a value greater than 0.1")
            }
            Some(_) => {}
        }
        if self
            .description
            .as_deref()
            .map_or(true, |description| description.trim().is_empty())
        {
            problems.push("The field 'description' is required");
        }
        problems
    }
}

fn reject(problems: &[&str]) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(BillError::Validation(problems.join("; ")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillSearch {
    pub due_date: NaiveDate,
    pub description: String,
    /// Zero-based.
    pub page: u32,
    pub size: u32,
    pub sort: String,
}

impl BillSearch {
    pub fn new(due_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            due_date,
            description: description.into(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: BillSort::default().as_str().to_string(),
        }
    }

    fn to_query(&self) -> Result<BillQuery> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(BillError::Validation(format!(
                "The page size must be between 1 and {MAX_PAGE_SIZE}, found {}",
                self.size
            )));
        }
        let sort = self
            .sort
            .parse::<BillSort>()
            .map_err(|err| BillError::Validation(err.to_string()))?;

        Ok(BillQuery {
            due_date_from: self.due_date,
            description: self.description.clone(),
            page: self.page,
            size: self.size,
            sort,
        })
    }
}

/// Sum of bill amounts inside an inclusive due-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodTotal {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total: Decimal,
}

impl fmt::Display for PeriodTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total amount between {} and {} : {}",
            self.start, self.end, self.total
        )
    }
}

#[derive(Clone)]
pub struct BillService {
    repository: Arc<dyn BillRepository>,
    users: UserService,
}

impl BillService {
    pub fn new(repository: Arc<dyn BillRepository>, users: UserService) -> Self {
        Self { repository, users }
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Creates a `PENDING` bill owned by the user with `request.user_email`.
    pub async fn create(&self, request: &BillCreationRequest) -> Result<BillView> {
        let user = self.users.find_by_email(&request.user_email).await?;
        ensure_payment_not_after_due(request.payment_date, request.due_date)?;

        let bill = self
            .repository
            .insert_bill(&NewBill {
                due_date: request.due_date,
                payment_date: request.payment_date,
                amount: request.amount,
                description: request.description.clone(),
                status: BillStatus::Pending,
                user_id: user.id,
            })
            .await?;

        debug!(bill_id = bill.id, user_id = user.id, "bill created");
        Ok(BillView::from(bill))
    }

    pub async fn update(&self, id: i64, update: &BillUpdate) -> Result<BillView> {
        let mut bill = self.find_bill(id).await?;
        ensure_not_paid(&bill)?;

        if let Some(email) = &update.user_email {
            bill.user = self.users.find_by_email(email).await?;
        }
        ensure_payment_not_after_due(update.payment_date, update.due_date)?;

        bill.due_date = update.due_date;
        bill.payment_date = update.payment_date;
        bill.amount = update.amount;
        bill.description = update.description.clone();
        bill.status = update.status;

        let saved = self.repository.update_bill(&bill).await?;
        info!(bill_id = saved.id, status = %saved.status, "bill updated");
        Ok(BillView::from(saved))
    }

    pub async fn update_status(&self, id: i64, new_status: &str) -> Result<BillView> {
        let mut bill = self.find_bill(id).await?;
        ensure_not_paid(&bill)?;

        bill.status = new_status.parse::<BillStatus>()?;
        let saved = self.repository.update_bill(&bill).await?;
        info!(bill_id = saved.id, status = %saved.status, "bill status changed");
        Ok(BillView::from(saved))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<BillView> {
        self.find_bill(id).await.map(BillView::from)
    }

    pub async fn search(&self, search: &BillSearch) -> Result<PaginatedResponse<BillView>> {
        let query = search.to_query()?;
        let page = self.repository.search_bills(&query).await?;

        if page.items.is_empty() {
            return Err(BillError::BillNotFound(format!(
                "Bills with 'dueDate' {} and 'description' {} not found.",
                search.due_date, search.description
            )));
        }

        let size = u64::from(query.size);
        Ok(PaginatedResponse {
            content: page.items.iter().map(BillView::from).collect(),
            page_number: query.page,
            page_size: query.size,
            total_elements: page.total_elements,
            total_pages: page.total_elements.div_ceil(size),
        })
    }

    pub async fn amount_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<PeriodTotal> {
        if start > end {
            return Err(BillError::Validation(format!(
                "The 'startDate' {start} must be before or equal to the 'endDate' {end}"
            )));
        }
        let total = self.repository.total_amount_by_period(start, end).await?;
        Ok(PeriodTotal { start, end, total })
    }

    async fn find_bill(&self, id: i64) -> Result<BillRecord> {
        self.repository
            .find_bill_by_id(id)
            .await?
            .ok_or_else(|| BillError::bill_not_found(id))
    }
}

fn ensure_payment_not_after_due(payment_date: NaiveDate, due_date: NaiveDate) -> Result<()> {
    if payment_date > due_date {
        return Err(BillError::PaymentDate);
    }
    Ok(())
}

fn ensure_not_paid(bill: &BillRecord) -> Result<()> {
    if bill.status == BillStatus::Paid {
        return Err(BillError::BillAlreadyPaid);
    }
    Ok(())
}
