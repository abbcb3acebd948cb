use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::{
    BillPage, BillQuery, BillRecord, BillRepository, BillSort, BillStatus, NewBill, NewUser,
    RepositoryError, UserRecord, UserRepository,
};

#[derive(Debug, Clone)]
struct StoredBill {
    id: i64,
    due_date: NaiveDate,
    payment_date: NaiveDate,
    amount: Decimal,
    description: String,
    status: BillStatus,
    user_id: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<UserRecord>,
    bills: Vec<StoredBill>,
    last_user_id: i64,
    last_bill_id: i64,
}

impl MemoryState {
    fn user(&self, id: i64) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.id == id)
    }

    fn record(&self, bill: &StoredBill) -> Result<BillRecord, RepositoryError> {
        let user = self.user(bill.user_id).cloned().ok_or(RepositoryError::NotFound {
            entity: "user",
            id: bill.user_id,
        })?;
        Ok(BillRecord {
            id: bill.id,
            due_date: bill.due_date,
            payment_date: bill.payment_date,
            amount: bill.amount,
            description: bill.description.clone(),
            status: bill.status,
            user,
        })
    }
}

/// Process-local store with the same semantics as [`crate::PostgresRepository`].
///
/// Used by tests and by `serve --in-memory`.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bill_count(&self) -> usize {
        self.state.read().await.bills.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::DuplicateEmail(user.email.clone()));
        }
        state.last_user_id += 1;
        let record = UserRecord {
            id: state.last_user_id,
            email: user.email.clone(),
            role: user.role,
        };
        state.users.push(record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.state.read().await.user(id).cloned())
    }
}

#[async_trait]
impl BillRepository for InMemoryRepository {
    async fn insert_bill(&self, bill: &NewBill) -> Result<BillRecord, RepositoryError> {
        let mut state = self.state.write().await;
        if state.user(bill.user_id).is_none() {
            return Err(RepositoryError::NotFound {
                entity: "user",
                id: bill.user_id,
            });
        }
        state.last_bill_id += 1;
        let stored = StoredBill {
            id: state.last_bill_id,
            due_date: bill.due_date,
            payment_date: bill.payment_date,
            amount: bill.amount,
            description: bill.description.clone(),
            status: bill.status,
            user_id: bill.user_id,
        };
        let record = state.record(&stored)?;
        state.bills.push(stored);
        Ok(record)
    }

    async fn update_bill(&self, bill: &BillRecord) -> Result<BillRecord, RepositoryError> {
        let mut state = self.state.write().await;
        if state.user(bill.user.id).is_none() {
            return Err(RepositoryError::NotFound {
                entity: "user",
                id: bill.user.id,
            });
        }
        let stored = state
            .bills
            .iter_mut()
            .find(|stored| stored.id == bill.id)
            .ok_or(RepositoryError::NotFound {
                entity: "bill",
                id: bill.id,
            })?;

        stored.due_date = bill.due_date;
        stored.payment_date = bill.payment_date;
        stored.amount = bill.amount;
        stored.description = bill.description.clone();
        stored.status = bill.status;
        stored.user_id = bill.user.id;

        let stored = stored.clone();
        state.record(&stored)
    }

    async fn find_bill_by_id(&self, id: i64) -> Result<Option<BillRecord>, RepositoryError> {
        let state = self.state.read().await;
        state
            .bills
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| state.record(stored))
            .transpose()
    }

    async fn search_bills(&self, query: &BillQuery) -> Result<BillPage, RepositoryError> {
        let state = self.state.read().await;
        let needle = query.description.to_lowercase();

        let mut matches: Vec<&StoredBill> = state
            .bills
            .iter()
            .filter(|bill| bill.due_date >= query.due_date_from)
            .filter(|bill| bill.description.to_lowercase().contains(&needle))
            .collect();

        matches.sort_by(|a, b| {
            let primary = match query.sort {
                BillSort::DueDate => a.due_date.cmp(&b.due_date),
                BillSort::PaymentDate => a.payment_date.cmp(&b.payment_date),
                BillSort::Amount => a.amount.cmp(&b.amount),
                BillSort::Description => a.description.cmp(&b.description),
                BillSort::Id => a.id.cmp(&b.id),
            };
            primary.then(a.id.cmp(&b.id))
        });

        let total_elements = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.size as usize)
            .map(|bill| state.record(bill))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BillPage {
            items,
            total_elements,
        })
    }

    async fn total_amount_by_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, RepositoryError> {
        let state = self.state.read().await;
        state
            .bills
            .iter()
            .filter(|bill| bill.due_date >= start && bill.due_date <= end)
            .try_fold(Decimal::ZERO, |total, bill| total.checked_add(bill.amount))
            .ok_or(RepositoryError::AmountOverflow { start, end })
    }
}
