//! HTTP API over the persisted expenses (axum).
//!
//! Routes:
//! - `GET    /api/expenses/user/{telegram_id}` list a user's expenses, newest first
//! - `POST   /api/expenses`                    create an expense for an existing user
//! - `DELETE /api/expenses/{id}`               delete one expense
//! - `GET    /health`                          liveness + store connectivity

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use spendbot_core::{
    errors::Error,
    models::{amount_fits, NewExpense},
    store::ExpenseStore,
};

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ExpenseStore>,
}

pub fn router(store: Arc<dyn ExpenseStore>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/expenses", post(handle_create))
        .route("/api/expenses/user/{telegram_id}", get(handle_list_for_user))
        .route("/api/expenses/{id}", delete(handle_delete))
        .with_state(AppState { store })
}

/// Serve `app` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;
    tracing::info!("HTTP server closed");
    Ok(())
}

// --- Request / response bodies ---

/// Telegram ids arrive as strings or as bare JSON numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TelegramIdInput {
    Text(String),
    Number(i64),
}

impl TelegramIdInput {
    fn into_string(self) -> String {
        match self {
            TelegramIdInput::Text(s) => s.trim().to_string(),
            TelegramIdInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateExpenseRequest {
    telegram_id: Option<TelegramIdInput>,
    description: Option<String>,
    amount: Option<Decimal>,
    category: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct ValidExpense {
    telegram_id: String,
    description: String,
    amount: Decimal,
    category: String,
}

impl CreateExpenseRequest {
    /// Every field is required; empty strings and a zero amount count as missing.
    fn validate(self) -> Result<ValidExpense, Error> {
        let missing = || Error::Validation("Missing required fields".to_string());

        let telegram_id = self
            .telegram_id
            .map(TelegramIdInput::into_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(missing)?;
        let description = self.description.filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let amount = self.amount.filter(|a| !a.is_zero()).ok_or_else(missing)?;
        let category = self.category.filter(|s| !s.is_empty()).ok_or_else(missing)?;
        if !amount_fits(amount) {
            return Err(Error::Validation("Amount out of range".to_string()));
        }

        Ok(ValidExpense {
            telegram_id,
            description,
            amount,
            category,
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn internal_error(context: &str, e: Error) -> Response {
    tracing::error!(error = %e, "{context}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// --- Handlers ---

async fn handle_index() -> &'static str {
    "Telegram Expense Tracker API"
}

async fn handle_health(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(HealthResponse { status: "ok" }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
                .into_response()
        }
    }
}

async fn handle_list_for_user(
    State(state): State<AppState>,
    Path(telegram_id): Path<String>,
) -> Response {
    let user = match state.store.find_user(&telegram_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => return internal_error("error fetching user", e),
    };

    match state.store.list_expenses(user.id).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(e) => internal_error("error fetching expenses", e),
    }
}

async fn handle_create(
    State(state): State<AppState>,
    body: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected expense body");
            return error_response(StatusCode::BAD_REQUEST, "Missing required fields");
        }
    };

    let input = match body.validate() {
        Ok(input) => input,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &validation_message(e)),
    };

    let user = match state.store.find_user(&input.telegram_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => return internal_error("error fetching user", e),
    };

    let new_expense = NewExpense::new(
        user.id,
        input.description,
        input.amount,
        input.category,
        Utc::now(),
    );
    match state.store.create_expense(new_expense).await {
        Ok(expense) => {
            tracing::info!(
                expense_id = expense.id,
                user_id = user.id,
                "expense created via API"
            );
            (StatusCode::CREATED, Json(expense)).into_response()
        }
        Err(e) => internal_error("error creating expense", e),
    }
}

fn validation_message(e: Error) -> String {
    match e {
        Error::Validation(msg) => msg,
        other => other.to_string(),
    }
}

async fn handle_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    // Ids that cannot exist are reported like any other unknown id.
    let Ok(id) = id.parse::<i32>() else {
        return error_response(StatusCode::NOT_FOUND, "Expense not found");
    };

    match state.store.delete_expense(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Expense not found"),
        Err(e) => internal_error("error deleting expense", e),
    }
}
