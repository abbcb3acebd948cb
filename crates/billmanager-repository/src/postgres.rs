use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::{
    BillPage, BillQuery, BillRecord, BillRepository, BillSort, BillStatus, NewBill, NewUser,
    RepositoryError, Role, UserRecord, UserRepository,
};

const BILL_COLUMNS: &str = r#"
    b.id,
    b.due_date,
    b.payment_date,
    b.amount,
    b.description,
    b.bill_status,
    u.id AS user_id,
    u.email AS user_email,
    u.role AS user_role
"#;

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "database connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    async fn fetch_bill(&self, id: i64) -> Result<Option<BillRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills b JOIN users u ON u.id = b.user_id WHERE b.id = $1"
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(bill_from_row).transpose()
    }
}

fn sort_column(sort: BillSort) -> &'static str {
    match sort {
        BillSort::DueDate => "b.due_date",
        BillSort::PaymentDate => "b.payment_date",
        BillSort::Amount => "b.amount",
        BillSort::Description => "b.description",
        BillSort::Id => "b.id",
    }
}

/// `%`, `_` and `\` in the needle match literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn user_from_row(row: &PgRow, prefix: &str) -> Result<UserRecord, RepositoryError> {
    let role_str: String = row.try_get(format!("{prefix}role").as_str())?;
    let role =
        Role::from_stored(&role_str).ok_or_else(|| RepositoryError::InvalidStatus(role_str.clone()))?;
    Ok(UserRecord {
        id: row.try_get(format!("{prefix}id").as_str())?,
        email: row.try_get(format!("{prefix}email").as_str())?,
        role,
    })
}

fn bill_from_row(row: &PgRow) -> Result<BillRecord, RepositoryError> {
    let status_str: String = row.try_get("bill_status")?;
    let status = status_str
        .parse::<BillStatus>()
        .map_err(|_| RepositoryError::InvalidStatus(status_str.clone()))?;

    Ok(BillRecord {
        id: row.try_get("id")?,
        due_date: row.try_get("due_date")?,
        payment_date: row.try_get("payment_date")?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        status,
        user: user_from_row(row, "user_")?,
    })
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, role)
            VALUES ($1, $2)
            RETURNING id, email, role
            "#,
        )
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => user_from_row(&row, ""),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, role FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|row| user_from_row(row, "")).transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|row| user_from_row(row, "")).transpose()
    }
}

#[async_trait]
impl BillRepository for PostgresRepository {
    async fn insert_bill(&self, bill: &NewBill) -> Result<BillRecord, RepositoryError> {
        let sql = format!(
            r#"
            WITH b AS (
                INSERT INTO bills (due_date, payment_date, amount, description, bill_status, user_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {BILL_COLUMNS} FROM b JOIN users u ON u.id = b.user_id
            "#
        );
        let row = sqlx::query(&sql)
            .bind(bill.due_date)
            .bind(bill.payment_date)
            .bind(bill.amount)
            .bind(&bill.description)
            .bind(bill.status.as_str())
            .bind(bill.user_id)
            .fetch_one(&self.pool)
            .await?;

        let record = bill_from_row(&row)?;
        debug!(bill_id = record.id, user_id = bill.user_id, "bill inserted");
        Ok(record)
    }

    async fn update_bill(&self, bill: &BillRecord) -> Result<BillRecord, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE bills
            SET due_date = $1,
                payment_date = $2,
                amount = $3,
                description = $4,
                bill_status = $5,
                user_id = $6
            WHERE id = $7
            "#,
        )
        .bind(bill.due_date)
        .bind(bill.payment_date)
        .bind(bill.amount)
        .bind(&bill.description)
        .bind(bill.status.as_str())
        .bind(bill.user.id)
        .bind(bill.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "bill",
                id: bill.id,
            });
        }

        self.fetch_bill(bill.id)
            .await?
            .ok_or(RepositoryError::NotFound {
                entity: "bill",
                id: bill.id,
            })
    }

    async fn find_bill_by_id(&self, id: i64) -> Result<Option<BillRecord>, RepositoryError> {
        self.fetch_bill(id).await
    }

    async fn search_bills(&self, query: &BillQuery) -> Result<BillPage, RepositoryError> {
        let pattern = contains_pattern(&query.description);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bills b
            WHERE b.due_date >= $1 AND b.description ILIKE $2 ESCAPE '\'
            "#,
        )
        .bind(query.due_date_from)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills b
            JOIN users u ON u.id = b.user_id
            WHERE b.due_date >= $1 AND b.description ILIKE $2 ESCAPE '\'
            ORDER BY {} ASC, b.id ASC
            LIMIT $3 OFFSET $4
            "#,
            sort_column(query.sort)
        );
        let rows = sqlx::query(&sql)
            .bind(query.due_date_from)
            .bind(&pattern)
            .bind(i64::from(query.size))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(bill_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BillPage {
            items,
            total_elements: total.max(0) as u64,
        })
    }

    async fn total_amount_by_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM bills WHERE due_date BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
