//! User-facing chat replies.

use std::time::Duration;

use chrono::Local;

use crate::{analysis::ExpenseAnalysis, models::Expense};

pub const WELCOME: &str = "👋 Welcome to the expense tracker!\n\n\
Send an expense as: [amount] [category] [description]\n\
Example: 25.50 food Lunch at restaurant\n\n\
📋 Commands:\n\
/start - Show this help message\n\
/list - Show your recent expenses (last 30 days)";

pub const FORMAT_HELP: &str = "🤔 I couldn't find an expense in that message.\n\n\
Please use the format: [amount] [category] [description]\n\
Example: 25.50 food Lunch at restaurant";

pub const PROCESSING_ERROR: &str = "Error processing your message. Please try again.";

pub const LIST_ERROR: &str = "Error retrieving expenses. Please try again.";

pub const EMPTY_LIST: &str = "You have no recorded expenses in the last 30 days.";

pub fn throttled(retry_after: Duration) -> String {
    format!(
        "⏳ Too many messages. Please wait {:.1} seconds.",
        retry_after.as_secs_f64()
    )
}

pub fn expense_added(analysis: &ExpenseAnalysis) -> String {
    format!(
        "✅ Expense added\n\nAmount: {:.2}\nCategory: {}\nDescription: {}",
        analysis.amount, analysis.category, analysis.description
    )
}

/// Numbered list with amount, category, description and a local date per entry.
pub fn expense_list(expenses: &[Expense]) -> String {
    let mut out = String::from("📊 Your recent expenses:\n");
    for (idx, e) in expenses.iter().enumerate() {
        let date = e.added_at.with_timezone(&Local).format("%m/%d/%Y");
        out.push_str(&format!(
            "\n{}. ${:.2} - {}\n   {}\n   {}\n",
            idx + 1,
            e.amount,
            e.category,
            e.description,
            date
        ));
    }
    out
}
