//! Persisted records.
//!
//! Storage adapters own the row mapping; these are the shapes the bot and the HTTP API
//! exchange with a [`crate::store::ExpenseStore`].

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fraction digits kept for every stored amount (`NUMERIC(10,2)`).
pub const AMOUNT_SCALE: u32 = 2;

/// A Telegram user known to the tracker. Created lazily, never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub telegram_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    /// When the expense occurred. Defaults to the creation time.
    pub added_at: DateTime<Utc>,
}

/// Insert payload for an [`Expense`]; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub user_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub added_at: DateTime<Utc>,
}

impl NewExpense {
    pub fn new(
        user_id: i32,
        description: impl Into<String>,
        amount: Decimal,
        category: impl Into<String>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            description: description.into(),
            amount: round_amount(amount),
            category: category.into(),
            added_at,
        }
    }
}

/// Name-only category lookup. Kept in the schema; no flow references it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: i32,
    pub name: String,
}

/// Integer digits `NUMERIC(10,2)` leaves room for.
const AMOUNT_INTEGER_DIGITS: u32 = 8;

/// Round half away from zero, the way `NUMERIC(10,2)` stores it.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `amount` still fits the column once rounded.
pub fn amount_fits(amount: Decimal) -> bool {
    round_amount(amount).abs() < Decimal::from(10u64.pow(AMOUNT_INTEGER_DIGITS))
}
