//! Chat orchestration: one inbound update in, at most one reply out.

use std::{sync::Arc, time::Instant};

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::{
    analysis::ExpenseAnalyzer,
    domain::{ChatId, TelegramId},
    formatting,
    messaging::{
        port::MessagingPort,
        types::{Command, IncomingUpdate, TextMessage},
    },
    models::{amount_fits, NewExpense},
    rate_limit::ChatRateLimiter,
    store::ExpenseStore,
    Result,
};

/// How far back `/list` looks.
pub const LIST_LOOKBACK_DAYS: i64 = 30;
/// Maximum entries shown by `/list`.
pub const LIST_LIMIT: usize = 5;

pub struct ExpenseBot {
    store: Arc<dyn ExpenseStore>,
    analyzer: Arc<ExpenseAnalyzer>,
    messenger: Arc<dyn MessagingPort>,
    rate_limiter: Mutex<ChatRateLimiter>,
}

impl ExpenseBot {
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        analyzer: Arc<ExpenseAnalyzer>,
        messenger: Arc<dyn MessagingPort>,
        rate_limiter: ChatRateLimiter,
    ) -> Self {
        Self {
            store,
            analyzer,
            messenger,
            rate_limiter: Mutex::new(rate_limiter),
        }
    }

    /// Handle one update. Failures are logged and turned into chat replies; nothing is retried.
    pub async fn handle(&self, update: IncomingUpdate) {
        let chat_id = update.chat_id();
        let Some(user_id) = update.user_id().cloned() else {
            tracing::debug!(chat_id = chat_id.0, "update without sender, ignoring");
            return;
        };

        if !self.check_rate_limit(chat_id, &user_id).await {
            return;
        }

        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd, &user_id).await,
            IncomingUpdate::Text(msg) => self.handle_text(msg, &user_id).await,
        }
    }

    async fn check_rate_limit(&self, chat_id: ChatId, user_id: &TelegramId) -> bool {
        let retry_after = {
            let mut rl = self.rate_limiter.lock().await;
            let now = Instant::now();
            if rl.allow_at(user_id, now) {
                return true;
            }
            rl.retry_after_at(user_id, now)
        };

        tracing::info!(user_id = %user_id, "rate limited");
        self.reply(chat_id, &formatting::throttled(retry_after)).await;
        false
    }

    async fn handle_command(&self, cmd: Command, user_id: &TelegramId) {
        match cmd.name.as_str() {
            "start" | "help" => self.reply(cmd.chat_id, formatting::WELCOME).await,
            "list" => self.handle_list(cmd.chat_id, user_id).await,
            other => {
                tracing::debug!(command = other, "unknown command");
                self.reply(cmd.chat_id, formatting::WELCOME).await;
            }
        }
    }

    async fn handle_list(&self, chat_id: ChatId, user_id: &TelegramId) {
        match self.recent_expenses_text(user_id).await {
            Ok(text) => self.reply(chat_id, &text).await,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "/list failed");
                self.reply(chat_id, formatting::LIST_ERROR).await;
            }
        }
    }

    async fn recent_expenses_text(&self, user_id: &TelegramId) -> Result<String> {
        let user = self.store.find_or_create_user(user_id.as_str()).await?;
        let since = Utc::now() - Duration::days(LIST_LOOKBACK_DAYS);
        let expenses = self
            .store
            .recent_expenses(user.id, since, LIST_LIMIT)
            .await?;

        if expenses.is_empty() {
            return Ok(formatting::EMPTY_LIST.to_string());
        }
        Ok(formatting::expense_list(&expenses))
    }

    async fn handle_text(&self, msg: TextMessage, user_id: &TelegramId) {
        match self.record_expense(&msg.text, user_id).await {
            Ok(Some(reply)) => self.reply(msg.chat_id, &reply).await,
            Ok(None) => self.reply(msg.chat_id, formatting::FORMAT_HELP).await,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "failed to record expense");
                self.reply(msg.chat_id, formatting::PROCESSING_ERROR).await;
            }
        }
    }

    /// Resolve the user, analyze the text and persist the expense.
    ///
    /// Returns the confirmation text, or `None` when no expense was recognized.
    async fn record_expense(&self, text: &str, user_id: &TelegramId) -> Result<Option<String>> {
        let user = self.store.find_or_create_user(user_id.as_str()).await?;

        let analysis = self.analyzer.analyze(text, user.id).await;
        if analysis.is_unknown() {
            return Ok(None);
        }
        if !amount_fits(analysis.amount) {
            tracing::debug!(user_id = %user_id, amount = %analysis.amount, "amount out of range");
            return Ok(None);
        }

        let expense = self
            .store
            .create_expense(NewExpense::new(
                user.id,
                analysis.description.clone(),
                analysis.amount,
                analysis.category.clone(),
                Utc::now(),
            ))
            .await?;
        tracing::info!(
            user_id = %user_id,
            expense_id = expense.id,
            category = %expense.category,
            "expense recorded"
        );

        Ok(Some(formatting::expense_added(&analysis)))
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        analysis::{AnalysisStrategy, ExpenseAnalysis},
        errors::Error,
        models::{Expense, User},
        store::InMemoryExpenseStore,
    };

    #[derive(Default)]
    struct FakeMessenger {
        sends: StdMutex<Vec<(ChatId, String)>>,
    }

    impl FakeMessenger {
        fn sent(&self) -> Vec<String> {
            self.sends
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sends.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl AnalysisStrategy for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn analyze(&self, _message: &str, _user_id: i32) -> Result<ExpenseAnalysis> {
            Err(Error::External("analysis endpoint unreachable".to_string()))
        }
    }

    /// Store whose writes always fail, for the processing-error path.
    struct BrokenStore;

    #[async_trait]
    impl ExpenseStore for BrokenStore {
        async fn find_user(&self, _telegram_id: &str) -> Result<Option<User>> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn find_or_create_user(&self, _telegram_id: &str) -> Result<User> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn create_expense(&self, _expense: NewExpense) -> Result<Expense> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn list_expenses(&self, _user_id: i32) -> Result<Vec<Expense>> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn recent_expenses(
            &self,
            _user_id: i32,
            _since: chrono::DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<Expense>> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn delete_expense(&self, _id: i32) -> Result<bool> {
            Err(Error::Store("connection reset".to_string()))
        }
        async fn ping(&self) -> Result<()> {
            Err(Error::Store("connection reset".to_string()))
        }
    }

    struct Harness {
        bot: ExpenseBot,
        store: Arc<InMemoryExpenseStore>,
        messenger: Arc<FakeMessenger>,
    }

    fn harness(window: std::time::Duration) -> Harness {
        let store = Arc::new(InMemoryExpenseStore::new());
        let messenger = Arc::new(FakeMessenger::default());
        let bot = ExpenseBot::new(
            store.clone(),
            Arc::new(ExpenseAnalyzer::new(Some(Arc::new(Unreachable)))),
            messenger.clone(),
            ChatRateLimiter::new(window),
        );
        Harness {
            bot,
            store,
            messenger,
        }
    }

    fn text(user: &str, body: &str) -> IncomingUpdate {
        IncomingUpdate::from_text(ChatId(100), Some(TelegramId::from(user)), body)
    }

    #[tokio::test]
    async fn expense_is_recorded_via_fallback_when_analysis_is_down() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T1", "25.50 food Lunch at restaurant")).await;

        let user = h.store.find_user("T1").await.unwrap().expect("user created");
        let rows = h.store.list_expenses(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Decimal::new(2550, 2));
        assert_eq!(rows[0].category, "food");
        assert_eq!(rows[0].description, "Lunch at restaurant");

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("25.5"));
        assert!(sent[0].contains("food"));
        assert!(sent[0].contains("Lunch at restaurant"));
    }

    #[tokio::test]
    async fn unrecognized_text_gets_format_help_and_no_row() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T1", "hello there")).await;

        let user = h.store.find_user("T1").await.unwrap().unwrap();
        assert!(h.store.list_expenses(user.id).await.unwrap().is_empty());
        assert_eq!(h.messenger.sent(), vec![formatting::FORMAT_HELP.to_string()]);
    }

    #[tokio::test]
    async fn blank_text_gets_format_help() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T1", "  \t ")).await;

        assert_eq!(h.messenger.sent(), vec![formatting::FORMAT_HELP.to_string()]);
    }

    #[tokio::test]
    async fn amount_too_large_for_storage_gets_format_help() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T1", "100000000 rent")).await;
        h.bot.handle(text("T1", "99999999.995 rent")).await;

        let user = h.store.find_user("T1").await.unwrap().unwrap();
        assert!(h.store.list_expenses(user.id).await.unwrap().is_empty());
        assert_eq!(h.messenger.sent(), vec![formatting::FORMAT_HELP.to_string(); 2]);
    }

    #[tokio::test]
    async fn updates_without_sender_are_ignored() {
        let h = harness(std::time::Duration::ZERO);

        h.bot
            .handle(IncomingUpdate::from_text(ChatId(1), None, "25 food"))
            .await;

        assert!(h.messenger.sent().is_empty());
        assert!(h.store.find_user("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_message_within_window_is_throttled() {
        let h = harness(std::time::Duration::from_secs(60));

        h.bot.handle(text("T1", "1 food a")).await;
        h.bot.handle(text("T1", "2 food b")).await;
        h.bot.handle(text("T2", "3 food c")).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].starts_with("✅"));
        assert!(sent[1].starts_with("⏳"));
        assert!(sent[2].starts_with("✅"));

        let t1 = h.store.find_user("T1").await.unwrap().unwrap();
        assert_eq!(h.store.list_expenses(t1.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commands_are_rate_limited_too() {
        let h = harness(std::time::Duration::from_secs(60));

        h.bot.handle(text("T1", "/start")).await;
        h.bot.handle(text("T1", "/list")).await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0], formatting::WELCOME);
        assert!(sent[1].starts_with("⏳"));
    }

    #[tokio::test]
    async fn start_and_unknown_commands_show_help_without_parsing() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T1", "/start")).await;
        h.bot.handle(text("T1", "/help@spend_bot")).await;
        h.bot.handle(text("T1", "/25 food")).await;

        assert_eq!(h.messenger.sent(), vec![formatting::WELCOME.to_string(); 3]);
        assert!(h.store.find_user("T1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_with_no_expenses_shows_empty_state() {
        let h = harness(std::time::Duration::ZERO);

        h.bot.handle(text("T9", "/list")).await;

        assert_eq!(h.messenger.sent(), vec![formatting::EMPTY_LIST.to_string()]);
        // `/list` resolves-or-creates the user.
        assert!(h.store.find_user("T9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_shows_at_most_five_recent_entries() {
        let h = harness(std::time::Duration::ZERO);
        let user = h.store.find_or_create_user("T1").await.unwrap();
        let now = Utc::now();

        h.store
            .create_expense(NewExpense::new(
                user.id,
                "ancient",
                Decimal::new(1, 0),
                "old",
                now - Duration::days(31),
            ))
            .await
            .unwrap();
        for i in 0..6 {
            h.store
                .create_expense(NewExpense::new(
                    user.id,
                    format!("item {i}"),
                    Decimal::new(10 + i, 0),
                    "food",
                    now - Duration::minutes(i),
                ))
                .await
                .unwrap();
        }

        h.bot.handle(text("T1", "/list")).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        let body = &sent[0];
        assert!(body.contains("1. $10.00 - food"));
        assert!(body.contains("5. $14.00 - food"));
        assert!(!body.contains("6."));
        assert!(!body.contains("item 5"));
        assert!(!body.contains("ancient"));
    }

    #[tokio::test]
    async fn store_failure_reports_generic_error() {
        let messenger = Arc::new(FakeMessenger::default());
        let bot = ExpenseBot::new(
            Arc::new(BrokenStore),
            Arc::new(ExpenseAnalyzer::local_only()),
            messenger.clone(),
            ChatRateLimiter::new(std::time::Duration::ZERO),
        );

        bot.handle(text("T1", "25 food lunch")).await;
        bot.handle(text("T1", "/list")).await;

        assert_eq!(
            messenger.sent(),
            vec![
                formatting::PROCESSING_ERROR.to_string(),
                formatting::LIST_ERROR.to_string()
            ]
        );
    }
}
