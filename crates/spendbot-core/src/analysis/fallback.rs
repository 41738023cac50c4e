use std::str::FromStr;

use rust_decimal::Decimal;

use super::ExpenseAnalysis;

/// Parse `[amount] [category] [description...]`, e.g. `25.50 food Lunch at restaurant`.
///
/// The amount must be a plain decimal number; the category is lower-cased; an empty
/// description defaults to the category. Returns `None` when no expense can be read.
pub fn parse_expense_text(text: &str) -> Option<ExpenseAnalysis> {
    let mut tokens = text.split_whitespace();

    let amount = Decimal::from_str(tokens.next()?).ok()?;
    let category = tokens.next()?.to_lowercase();
    let description = tokens.collect::<Vec<_>>().join(" ");

    Some(ExpenseAnalysis {
        amount,
        description: if description.is_empty() {
            category.clone()
        } else {
            description
        },
        category,
    })
}
