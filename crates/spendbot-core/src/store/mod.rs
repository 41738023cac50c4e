//! Persistence port.
//!
//! Postgres lives in `spendbot-postgres`; [`memory::InMemoryExpenseStore`] backs tests and
//! local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{Expense, NewExpense, User},
    Result,
};

pub mod memory;

pub use memory::InMemoryExpenseStore;

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Look up a user by Telegram id. Returns `None` if unknown.
    async fn find_user(&self, telegram_id: &str) -> Result<Option<User>>;

    /// Return the user for `telegram_id`, creating it on first sight.
    async fn find_or_create_user(&self, telegram_id: &str) -> Result<User>;

    /// Insert an expense. The owning user must exist.
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense>;

    /// All expenses of a user, most recent `added_at` first.
    async fn list_expenses(&self, user_id: i32) -> Result<Vec<Expense>>;

    /// Expenses of a user with `added_at >= since`, most recent first, at most `limit`.
    async fn recent_expenses(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Expense>>;

    /// Delete an expense. Returns true if found and deleted.
    async fn delete_expense(&self, id: i32) -> Result<bool>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}
