//! PostgreSQL-backed [`ExpenseStore`].
//!
//! Uses `sqlx` runtime queries (no compile-time macros). Three tables: `users`,
//! `expenses` (foreign key to `users`) and the unused `expense_categories` lookup.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    FromRow, PgPool,
};

use spendbot_core::{
    config::Config,
    errors::Error,
    models::{Expense, ExpenseCategory, NewExpense, User},
    store::ExpenseStore,
    Result,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id           SERIAL PRIMARY KEY,
    telegram_id  TEXT NOT NULL UNIQUE,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS expenses (
    id           SERIAL PRIMARY KEY,
    user_id      INT NOT NULL REFERENCES users(id),
    description  TEXT NOT NULL,
    amount       NUMERIC(10, 2) NOT NULL,
    category     TEXT NOT NULL,
    added_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS expense_categories (
    id    SERIAL PRIMARY KEY,
    name  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_expenses_user_added ON expenses(user_id, added_at DESC);
"#;

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    telegram_id: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            telegram_id: row.telegram_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: i32,
    user_id: i32,
    description: String,
    amount: Decimal,
    category: String,
    added_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            description: row.description,
            amount: row.amount,
            category: row.category,
            added_at: row.added_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
}

impl From<CategoryRow> for ExpenseCategory {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

fn store_err(context: &str) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::Store(format!("{context}: {e}"))
}

pub struct PgExpenseStore {
    pool: PgPool,
}

impl PgExpenseStore {
    /// Create a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured URL. Production requires TLS.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(&cfg.database_url)
            .map_err(|e| Error::Config(format!("invalid DATABASE_URL: {e}")))?;
        if cfg.environment.is_production() {
            options = options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(cfg.database_max_connections)
            .connect_with(options)
            .await
            .map_err(store_err("database connection failed"))?;
        tracing::info!("database connection established");
        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn run_migration(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(store_err("migration failed"))?;
        tracing::info!("database schema ready");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<ExpenseCategory>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM expense_categories ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err("failed to list categories"))?;
        Ok(rows.into_iter().map(ExpenseCategory::from).collect())
    }
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    async fn find_user(&self, telegram_id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, telegram_id, created_at FROM users WHERE telegram_id = $1")
                .bind(telegram_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("failed to find user"))?;
        Ok(row.map(User::from))
    }

    async fn find_or_create_user(&self, telegram_id: &str) -> Result<User> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (telegram_id)
            VALUES ($1)
            ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
            RETURNING id, telegram_id, created_at
            "#,
        )
        .bind(telegram_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err("failed to find or create user"))?;
        Ok(row.into())
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
        let row: ExpenseRow = sqlx::query_as(
            r#"
            INSERT INTO expenses (user_id, description, amount, category, added_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, description, amount, category, added_at
            "#,
        )
        .bind(expense.user_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.category)
        .bind(expense.added_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err("failed to create expense"))?;
        Ok(row.into())
    }

    async fn list_expenses(&self, user_id: i32) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, description, amount, category, added_at
            FROM expenses
            WHERE user_id = $1
            ORDER BY added_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("failed to list expenses"))?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn recent_expenses(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, description, amount, category, added_at
            FROM expenses
            WHERE user_id = $1 AND added_at >= $2
            ORDER BY added_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("failed to list recent expenses"))?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn delete_expense(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err("failed to delete expense"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err("database ping failed"))?;
        Ok(())
    }
}
