use std::{net::SocketAddr, sync::Arc};

use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use spendbot_analysis::RemoteAnalyzer;
use spendbot_core::{
    analysis::{AnalysisStrategy, ExpenseAnalyzer},
    bot::ExpenseBot,
    config::Config,
    messaging::port::MessagingPort,
    rate_limit::ChatRateLimiter,
    store::ExpenseStore,
    Error,
};
use spendbot_postgres::PgExpenseStore;
use spendbot_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cfg = Arc::new(Config::load()?);
    spendbot_core::logging::init("spendbot", cfg.environment)?;

    let pg = PgExpenseStore::connect(&cfg).await?;
    pg.run_migration().await?;
    let store: Arc<dyn ExpenseStore> = Arc::new(pg);

    let primary: Option<Arc<dyn AnalysisStrategy>> = match &cfg.analysis_api_url {
        Some(url) => {
            let remote = RemoteAnalyzer::new(url, cfg.analysis_timeout)?;
            tracing::info!(endpoint = remote.endpoint(), "remote analysis enabled");
            Some(Arc::new(remote))
        }
        None => {
            tracing::warn!("BOT_API_URL not set, using local expense parser only");
            None
        }
    };
    let analyzer = Arc::new(ExpenseAnalyzer::new(primary));

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    // HTTP API first, then the bot.
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let http = tokio::spawn(spendbot_api::serve(
        listener,
        spendbot_api::router(store.clone()),
        cancel.clone(),
    ));

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let expense_bot = Arc::new(ExpenseBot::new(
        store,
        analyzer,
        messenger,
        ChatRateLimiter::new(cfg.rate_limit_window),
    ));
    tracing::info!("all services initialized");

    let polled = spendbot_telegram::router::run_polling(bot, expense_bot, cancel.clone()).await;

    // The dispatcher may also stop on its own; take the HTTP server down with it.
    cancel.cancel();
    match http.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    polled.map_err(|e| Error::External(format!("telegram bot failed: {e}")))?;
    Ok(())
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl-c received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
    cancel.cancel();
}
