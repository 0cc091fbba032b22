//! Rendering payloads handed to the chat-platform collaborator, and the sink
//! trait it is reached through. The core never formats chat messages; it
//! only describes what should be shown.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{MessageRef, Report, ReportState, StatsSnapshot};

#[derive(Debug, Error)]
pub enum RenderError {
    /// The channel or message to update no longer exists.
    #[error("render target missing")]
    TargetMissing,
    #[error("no destination channel configured")]
    NotConfigured,
    #[error("transport: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Visual {
    Blacklisted,
    Updated,
    Resolved,
    PendingReview,
    Approved,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Affordance {
    pub action: String,
    pub label: String,
    pub target_user_id: Option<String>,
}

impl Affordance {
    fn new(action: &str, label: &str, target: Option<&str>) -> Self {
        Self { action: action.into(), label: label.into(), target_user_id: target.map(str::to_string) }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub visual: Visual,
    pub state: ReportState,
    pub report: Report,
    pub edit_count: usize,
    pub actor: String,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffReviewCard {
    pub visual: Visual,
    pub report: Report,
    pub actor: String,
    pub affordances: Vec<Affordance>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsBoard {
    pub stats: StatsSnapshot,
    pub total_users: u64,
    pub blacklisted_users: u64,
    pub cleared_users: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PanelCard {
    pub affordances: Vec<Affordance>,
    pub stats: StatsSnapshot,
    pub updated_at: DateTime<Utc>,
}

/// One page of the `check` listing (one report per page).
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub user_id: String,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub report: Option<Report>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderPayload {
    ReportCard(ReportCard),
    StaffReviewCard(StaffReviewCard),
    StatsBoard(StatsBoard),
    Panel(PanelCard),
    ReportPage(ReportPage),
}

impl RenderPayload {
    pub fn report_card(visual: Visual, report: &Report, actor: &str, stats: StatsSnapshot) -> Self {
        RenderPayload::ReportCard(ReportCard {
            visual,
            state: report.state(),
            edit_count: report.edit_count(),
            report: report.clone(),
            actor: actor.to_string(),
            stats,
        })
    }

    pub fn staff_card(visual: Visual, report: &Report, actor: &str) -> Self {
        let affordances = if visual == Visual::PendingReview {
            vec![
                Affordance::new("approve", "Add to blacklist", Some(&report.user_id)),
                Affordance::new("dismiss", "Dismiss", Some(&report.user_id)),
            ]
        } else {
            Vec::new()
        };
        RenderPayload::StaffReviewCard(StaffReviewCard {
            visual,
            report: report.clone(),
            actor: actor.to_string(),
            affordances,
        })
    }

    pub fn panel(stats: StatsSnapshot) -> Self {
        RenderPayload::Panel(PanelCard {
            affordances: vec![
                Affordance::new("submit", "Report User", None),
                Affordance::new("resolve", "Unblacklist User", None),
            ],
            stats,
            updated_at: Utc::now(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderPayload::ReportCard(_) => "reportCard",
            RenderPayload::StaffReviewCard(_) => "staffReviewCard",
            RenderPayload::StatsBoard(_) => "statsBoard",
            RenderPayload::Panel(_) => "panel",
            RenderPayload::ReportPage(_) => "reportPage",
        }
    }
}

/// The external presentation collaborator.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, channel: &str, payload: &RenderPayload) -> Result<MessageRef, RenderError>;
    async fn edit(&self, channel: &str, message: &str, payload: &RenderPayload) -> Result<(), RenderError>;
}

/// Logs payloads and hands out synthetic message refs.
#[derive(Clone, Default)]
pub struct LogSink;

#[async_trait]
impl ChatSink for LogSink {
    async fn post(&self, channel: &str, payload: &RenderPayload) -> Result<MessageRef, RenderError> {
        let message = uuid::Uuid::new_v4().to_string();
        tracing::info!(channel, message_ref = %message, kind = payload.kind(), "post");
        Ok(message)
    }

    async fn edit(&self, channel: &str, message: &str, payload: &RenderPayload) -> Result<(), RenderError> {
        tracing::info!(channel, message_ref = message, kind = payload.kind(), "edit");
        Ok(())
    }
}

/// Forwards payloads to an HTTP relay owned by the gateway adapter.
#[derive(Clone)]
pub struct RelaySink {
    base: String,
    client: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct RelayPosted {
    id: String,
}

impl RelaySink {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { base: base.into().trim_end_matches('/').to_string(), client })
    }

    fn messages_url(&self, channel: &str) -> String {
        format!("{}/channels/{}/messages", self.base, urlencoding::encode(channel))
    }
}

fn transport(e: reqwest::Error) -> RenderError {
    RenderError::Transport(e.to_string())
}

#[async_trait]
impl ChatSink for RelaySink {
    async fn post(&self, channel: &str, payload: &RenderPayload) -> Result<MessageRef, RenderError> {
        let resp = self.client.post(self.messages_url(channel)).json(payload).send().await.map_err(transport)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RenderError::TargetMissing);
        }
        let posted: RelayPosted = resp.error_for_status().map_err(transport)?.json().await.map_err(transport)?;
        Ok(posted.id)
    }

    async fn edit(&self, channel: &str, message: &str, payload: &RenderPayload) -> Result<(), RenderError> {
        let url = format!("{}/{}", self.messages_url(channel), urlencoding::encode(message));
        let resp = self.client.patch(url).json(payload).send().await.map_err(transport)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RenderError::TargetMissing);
        }
        resp.error_for_status().map_err(transport)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewReport, ReportSource};

    #[test]
    fn staff_card_has_affordances_only_while_pending() {
        let r = NewReport {
            user_id: "123456789012345678".into(),
            reason: "Type: spam\nDetails: spam servers".into(),
            proof: Some("https://cdn.example/proof.png".into()),
            server: None,
            reported_by: "1".into(),
            user_tag: Some("bad#0001".into()),
            source: ReportSource::StaffReview,
            approved: false,
        }
        .into_report("RPT-X".into(), Utc::now());
        match RenderPayload::staff_card(Visual::PendingReview, &r, "1") {
            RenderPayload::StaffReviewCard(c) => {
                let actions: Vec<_> = c.affordances.iter().map(|a| a.action.as_str()).collect();
                assert_eq!(actions, ["approve", "dismiss"]);
            }
            other => panic!("unexpected payload {}", other.kind()),
        }
        match RenderPayload::staff_card(Visual::Dismissed, &r, "1") {
            RenderPayload::StaffReviewCard(c) => assert!(c.affordances.is_empty()),
            other => panic!("unexpected payload {}", other.kind()),
        }
    }

    #[test]
    fn payload_is_tagged_by_kind() {
        let v = serde_json::to_value(RenderPayload::panel(StatsSnapshot::default())).unwrap();
        assert_eq!(v["kind"], "panel");
        assert_eq!(v["affordances"][0]["action"], "submit");
    }
}
