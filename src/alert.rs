//! Error reports for operators, delivered to the configured error webhook.

use chrono::Utc;
use serde::Serialize;

/// Where a failure happened. Ids only; never secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertContext {
    pub operation: &'static str,
    pub caller_id: Option<String>,
    pub target_id: Option<String>,
}

impl AlertContext {
    pub fn new(operation: &'static str) -> Self {
        Self { operation, caller_id: None, target_id: None }
    }

    pub fn caller(mut self, id: impl Into<String>) -> Self {
        self.caller_id = Some(id.into());
        self
    }

    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target_id = Some(id.into());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertBody<'a> {
    title: &'a str,
    error_kind: &'a str,
    message: String,
    location: &'static str,
    context: &'a AlertContext,
    at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct AlertSink {
    client: reqwest::Client,
}

impl Default for AlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Best-effort: delivery failures are logged, never returned.
    pub async fn send_error(
        &self,
        webhook: Option<&str>,
        kind: &str,
        err: &dyn std::fmt::Display,
        ctx: &AlertContext,
    ) {
        tracing::error!(operation = ctx.operation, caller = ?ctx.caller_id, target = ?ctx.target_id, "{kind}: {err}");
        let Some(url) = webhook else {
            log::info!("[alert] no webhook configured, skipping error report");
            return;
        };
        let body = AlertBody {
            title: "Bot Error Report",
            error_kind: kind,
            message: err.to_string(),
            location: ctx.operation,
            context: ctx,
            at: Utc::now(),
        };
        self.deliver(url, &body).await;
    }

    pub async fn send_info(&self, webhook: &str, title: &str, message: &str) {
        let body = serde_json::json!({ "title": title, "message": message, "at": Utc::now() });
        self.deliver(webhook, &body).await;
    }

    async fn deliver<T: Serialize + ?Sized>(&self, url: &str, body: &T) {
        match self.client.post(url).json(body).send().await {
            Ok(resp) if resp.status().is_success() => log::debug!("[alert] delivered"),
            Ok(resp) => log::warn!("[alert] webhook answered {}", resp.status()),
            Err(e) => log::warn!("[alert] webhook delivery failed: {e}"),
        }
    }
}
