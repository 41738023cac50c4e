use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    errors::Error,
    models::{Expense, NewExpense, User},
    store::ExpenseStore,
    Result,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    expenses: Vec<Expense>,
    next_user_id: i32,
    next_expense_id: i32,
}

/// In-memory store using `std::sync::RwLock` (locks are never held across `.await`).
///
/// Mirrors the Postgres constraints that matter to callers: unique Telegram ids and the
/// expense → user foreign key.
#[derive(Default)]
pub struct InMemoryExpenseStore {
    tables: RwLock<Tables>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| Error::Store(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| Error::Store(format!("lock poisoned: {e}")))
    }
}

fn newest_first(expenses: &mut [Expense]) {
    expenses.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn find_user(&self, telegram_id: &str) -> Result<Option<User>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn find_or_create_user(&self, telegram_id: &str) -> Result<User> {
        let mut tables = self.write()?;
        if let Some(user) = tables.users.iter().find(|u| u.telegram_id == telegram_id) {
            return Ok(user.clone());
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            telegram_id: telegram_id.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense> {
        let mut tables = self.write()?;
        if !tables.users.iter().any(|u| u.id == expense.user_id) {
            return Err(Error::Store(format!(
                "expense references missing user {}",
                expense.user_id
            )));
        }

        tables.next_expense_id += 1;
        let row = Expense {
            id: tables.next_expense_id,
            user_id: expense.user_id,
            description: expense.description,
            amount: expense.amount,
            category: expense.category,
            added_at: expense.added_at,
        };
        tables.expenses.push(row.clone());
        Ok(row)
    }

    async fn list_expenses(&self, user_id: i32) -> Result<Vec<Expense>> {
        let tables = self.read()?;
        let mut list: Vec<Expense> = tables
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut list);
        Ok(list)
    }

    async fn recent_expenses(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Expense>> {
        let mut list = self.list_expenses(user_id).await?;
        list.retain(|e| e.added_at >= since);
        list.truncate(limit);
        Ok(list)
    }

    async fn delete_expense(&self, id: i32) -> Result<bool> {
        let mut tables = self.write()?;
        let before = tables.expenses.len();
        tables.expenses.retain(|e| e.id != id);
        Ok(tables.expenses.len() < before)
    }

    async fn ping(&self) -> Result<()> {
        self.read().map(|_| ())
    }
}
