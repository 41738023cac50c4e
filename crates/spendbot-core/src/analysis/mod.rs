//! Expense extraction from free-text chat messages.
//!
//! [`ExpenseAnalyzer`] composes an optional primary strategy (the remote analysis endpoint,
//! see `spendbot-analysis`) with the local [`fallback`] parser. Callers only see
//! [`ExpenseAnalysis`]; which strategy produced it is logged, not returned.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Result;

pub mod fallback;

pub const UNKNOWN_CATEGORY: &str = "unknown";
const UNKNOWN_DESCRIPTION: &str = "Could not parse message";

/// Structured result of analyzing one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseAnalysis {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
}

impl ExpenseAnalysis {
    /// Sentinel meaning "no expense recognized in this message".
    pub fn unknown() -> Self {
        Self {
            amount: Decimal::ZERO,
            category: UNKNOWN_CATEGORY.to_string(),
            description: UNKNOWN_DESCRIPTION.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }
}

/// One way of turning a message into an [`ExpenseAnalysis`].
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn analyze(&self, message: &str, user_id: i32) -> Result<ExpenseAnalysis>;
}

/// Primary strategy with local fallback.
///
/// Exactly one primary attempt (if configured) and one local attempt; no retries.
#[derive(Clone, Default)]
pub struct ExpenseAnalyzer {
    primary: Option<Arc<dyn AnalysisStrategy>>,
}

impl ExpenseAnalyzer {
    pub fn new(primary: Option<Arc<dyn AnalysisStrategy>>) -> Self {
        Self { primary }
    }

    /// Analyzer that only uses the local parser.
    pub fn local_only() -> Self {
        Self { primary: None }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn analyze(&self, message: &str, user_id: i32) -> ExpenseAnalysis {
        if let Some(primary) = &self.primary {
            match primary.analyze(message, user_id).await {
                Ok(analysis) => {
                    tracing::debug!(
                        strategy = primary.name(),
                        user_id,
                        category = %analysis.category,
                        "message analyzed"
                    );
                    return analysis;
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = primary.name(),
                        user_id,
                        error = %e,
                        "analysis failed, using local parser"
                    );
                }
            }
        }

        match fallback::parse_expense_text(message) {
            Some(analysis) => analysis,
            None => {
                tracing::debug!(user_id, "local parser found no expense");
                ExpenseAnalysis::unknown()
            }
        }
    }
}
