use std::{sync::Arc, time::Duration};

use teloxide::{
    dispatching::{DefaultKey, Dispatcher},
    dptree,
    prelude::*,
    RequestError,
};
use tokio_util::sync::CancellationToken;

use spendbot_core::bot::ExpenseBot;

use crate::handlers;

/// How often a pending shutdown re-checks a dispatcher that has not started polling yet.
const SHUTDOWN_RETRY: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct AppState {
    pub expense_bot: Arc<ExpenseBot>,
    /// Our own username, for telling `/cmd@otherbot` apart in groups.
    pub bot_username: Option<String>,
}

/// Long-poll Telegram until `cancel` fires.
pub async fn run_polling(
    bot: Bot,
    expense_bot: Arc<ExpenseBot>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            tracing::info!(username = %me.username(), "telegram bot started");
            Some(me.username().to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "telegram getMe failed, polling anyway");
            None
        }
    };

    let state = Arc::new(AppState {
        expense_bot,
        bot_username,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = ?upd.id, "unhandled telegram update");
        })
        .build();

    dispatch_until_cancelled(dispatcher, cancel).await;
    Ok(())
}

/// Run `dispatcher` until it stops or `cancel` fires.
///
/// A cancellation that lands before polling has started is held until the dispatcher
/// is running, then delivered.
async fn dispatch_until_cancelled(
    mut dispatcher: Dispatcher<Bot, RequestError, DefaultKey>,
    cancel: CancellationToken,
) {
    if cancel.is_cancelled() {
        tracing::info!("shutdown requested before polling started");
        return;
    }

    let shutdown = dispatcher.shutdown_token();
    let watcher = tokio::spawn(async move {
        cancel.cancelled().await;
        loop {
            match shutdown.shutdown() {
                Ok(done) => {
                    done.await;
                    return;
                }
                // Idle: dispatch() has not reached the polling loop yet.
                Err(_) => tokio::time::sleep(SHUTDOWN_RETRY).await,
            }
        }
    });

    dispatcher.dispatch().await;
    watcher.abort();
    tracing::info!("telegram dispatcher stopped");
}
