//! Remote message-analysis adapter.
//!
//! Posts `{message, user_id}` to `<base>/messages/analyze` and expects
//! `{amount, category, description}` back. Any failure is reported as
//! [`Error::External`] so the core analyzer can fall back to local parsing.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use spendbot_core::{
    analysis::{AnalysisStrategy, ExpenseAnalysis},
    errors::Error,
    Result,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    message: &'a str,
    user_id: i32,
}

#[derive(Clone, Debug)]
pub struct RemoteAnalyzer {
    endpoint: String,
    http: reqwest::Client,
}

impl RemoteAnalyzer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("analysis http client: {e}")))?;
        Ok(Self {
            endpoint: analyze_endpoint(base_url),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn analyze_endpoint(base_url: &str) -> String {
    format!("{}/messages/analyze", base_url.trim().trim_end_matches('/'))
}

#[async_trait]
impl AnalysisStrategy for RemoteAnalyzer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, message: &str, user_id: i32) -> Result<ExpenseAnalysis> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&AnalyzeRequest { message, user_id })
            .send()
            .await
            .map_err(|e| Error::External(format!("analysis request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "analysis failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let analysis: ExpenseAnalysis = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("analysis json error: {e}")))?;

        tracing::debug!(
            user_id,
            category = %analysis.category,
            "remote analysis succeeded"
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc};

    use axum::{http::StatusCode, routing::post, Json, Router};
    use rust_decimal::Decimal;
    use spendbot_core::analysis::ExpenseAnalyzer;

    use super::*;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        addr
    }

    async fn echo_analysis(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "amount": 42.5,
            "category": "remote",
            "description": format!(
                "{}|{}",
                body["message"].as_str().unwrap_or_default(),
                body["user_id"]
            ),
        }))
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        assert_eq!(
            analyze_endpoint("http://analysis:8000/"),
            "http://analysis:8000/messages/analyze"
        );
        assert_eq!(
            analyze_endpoint("http://analysis:8000/api"),
            "http://analysis:8000/api/messages/analyze"
        );
    }

    #[tokio::test]
    async fn posts_message_and_user_id() {
        let addr = spawn(Router::new().route("/messages/analyze", post(echo_analysis))).await;
        let client = RemoteAnalyzer::new(&format!("http://{addr}/"), DEFAULT_TIMEOUT).unwrap();

        let got = client.analyze("coffee 3", 7).await.unwrap();
        assert_eq!(got.amount, Decimal::new(425, 1));
        assert_eq!(got.category, "remote");
        assert_eq!(got.description, "coffee 3|7");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/messages/analyze",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let addr = spawn(app).await;
        let client = RemoteAnalyzer::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();

        let err = client.analyze("25 food", 1).await.unwrap_err();
        assert!(matches!(err, Error::External(ref s) if s.contains("503")));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let app = Router::new().route(
            "/messages/analyze",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = spawn(app).await;
        let client =
            RemoteAnalyzer::new(&format!("http://{addr}"), Duration::from_millis(100)).unwrap();

        assert!(client.analyze("25 food", 1).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_local_parser() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let remote = RemoteAnalyzer::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
        let analyzer = ExpenseAnalyzer::new(Some(Arc::new(remote)));

        let got = analyzer.analyze("25.50 food Lunch at restaurant", 1).await;
        assert_eq!(got.amount, Decimal::new(2550, 2));
        assert_eq!(got.category, "food");
        assert_eq!(got.description, "Lunch at restaurant");

        assert!(analyzer.analyze("hello there", 1).await.is_unknown());
    }
}
