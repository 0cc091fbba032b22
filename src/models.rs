use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Platform account identifier (15-20 decimal digits once validated).
pub type UserId = String;
/// Opaque handle of a message rendered by the chat collaborator.
pub type MessageRef = String;

/// Legacy proof sentinel written by older data files.
pub const NO_PROOF_SENTINEL: &str = "No proof available";
pub const DEFAULT_SERVER: &str = "Not specified";

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

// Old snapshots store "No proof available" (or "") instead of null.
fn deserialize_proof<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.filter(|p| !p.trim().is_empty() && p != NO_PROOF_SENTINEL))
}

/// How a report entered the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReportSource {
    #[default]
    Direct,
    StaffReview,
}

/// Explicit lifecycle state, derived from the persisted flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReportState {
    Active,
    PendingReview,
    Approved,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Transition {
    Approve,
    Resolve,
    Dismiss,
}

impl ReportState {
    /// Transition table; `None` means the move is not allowed from `self`.
    pub fn apply(self, t: Transition) -> Option<ReportState> {
        use ReportState::*;
        use Transition::*;
        match (self, t) {
            (Active | PendingReview, Approve) => Some(Approved),
            (Active | PendingReview | Approved, Resolve) => Some(Resolved),
            (PendingReview, Dismiss) => Some(Dismissed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReportState::Resolved | ReportState::Dismissed)
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportState::Active => "active",
            ReportState::PendingReview => "pending_review",
            ReportState::Approved => "approved",
            ReportState::Resolved => "resolved",
            ReportState::Dismissed => "dismissed",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transition::Approve => "approve",
            Transition::Resolve => "resolve",
            Transition::Dismiss => "dismiss",
        };
        f.write_str(s)
    }
}

/// Append-only edit history entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub edit_id: String,
    pub previous_reason: String,
    #[serde(default, deserialize_with = "deserialize_proof")]
    pub previous_proof: Option<String>,
    pub new_reason: String,
    #[serde(default, deserialize_with = "deserialize_proof")]
    pub new_proof: Option<String>,
    pub edited_by: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub user_id: UserId,
    pub reason: String,
    #[serde(default, deserialize_with = "deserialize_proof")]
    pub proof: Option<String>,
    #[serde(default = "default_server")]
    pub server: String,
    pub reported_by: String,
    pub reported_at: DateTime<Utc>,
    #[serde(default, alias = "messageId")]
    pub rendered_message_ref: Option<MessageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_message_ref: Option<MessageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tag: Option<String>,
    #[serde(default)]
    pub source: ReportSource,
    #[serde(default)]
    pub unblacklisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unblacklisted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unblacklisted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved: bool,
    /// Set when staff dismissed the pending review. A dismissed record is
    /// kept for audit only and no longer counts as a report.
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edits: Vec<EditRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn state(&self) -> ReportState {
        if self.unblacklisted {
            ReportState::Resolved
        } else if self.dismissed {
            ReportState::Dismissed
        } else if self.approved {
            ReportState::Approved
        } else if self.source == ReportSource::StaffReview {
            ReportState::PendingReview
        } else {
            ReportState::Active
        }
    }

    /// Neither resolved nor dismissed, whatever the approval status.
    pub fn is_active(&self) -> bool {
        !self.state().is_terminal()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }
}

/// Validated input for a fresh report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: UserId,
    pub reason: String,
    pub proof: Option<String>,
    pub server: Option<String>,
    pub reported_by: String,
    pub user_tag: Option<String>,
    pub source: ReportSource,
    pub approved: bool,
}

impl NewReport {
    pub fn into_report(self, id: String, now: DateTime<Utc>) -> Report {
        Report {
            id,
            user_id: self.user_id,
            reason: self.reason,
            proof: self.proof,
            server: self
                .server
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(default_server),
            reported_by: self.reported_by,
            reported_at: now,
            rendered_message_ref: None,
            review_message_ref: None,
            user_tag: self.user_tag,
            source: self.source,
            unblacklisted: false,
            unblacklisted_by: None,
            unblacklisted_at: None,
            approved: self.approved,
            dismissed: false,
            dismissed_by: None,
            dismissed_at: None,
            edits: Vec::new(),
            last_edited_by: None,
            last_edited_at: None,
        }
    }
}

/// Partial update applied atomically by the store. The `require_*` fields
/// are preconditions checked against the current record under the store's
/// write lock (or row lock); a failed precondition yields `Conflict`.
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
    pub require_active: bool,
    pub require_unapproved: bool,
    pub reason: Option<String>,
    pub proof: Option<Option<String>>,
    pub push_edit: Option<EditRecord>,
    pub approved: Option<bool>,
    pub resolved: Option<(String, DateTime<Utc>)>,
    pub dismissed: Option<(String, DateTime<Utc>)>,
    pub rendered_message_ref: Option<MessageRef>,
    pub review_message_ref: Option<MessageRef>,
}

impl ReportPatch {
    pub fn preconditions_hold(&self, r: &Report) -> bool {
        (!self.require_active || r.is_active()) && (!self.require_unapproved || !r.approved)
    }

    pub fn apply(self, r: &mut Report) {
        if let Some(edit) = self.push_edit {
            r.last_edited_by = Some(edit.edited_by.clone());
            r.last_edited_at = Some(edit.edited_at);
            r.edits.push(edit);
        }
        if let Some(reason) = self.reason {
            r.reason = reason;
        }
        if let Some(proof) = self.proof {
            r.proof = proof;
        }
        if let Some(approved) = self.approved {
            r.approved = approved;
        }
        if let Some((by, at)) = self.resolved {
            r.unblacklisted = true;
            r.unblacklisted_by = Some(by);
            r.unblacklisted_at = Some(at);
        }
        if let Some((by, at)) = self.dismissed {
            r.dismissed = true;
            r.dismissed_by = Some(by);
            r.dismissed_at = Some(at);
        }
        if let Some(m) = self.rendered_message_ref {
            r.rendered_message_ref = Some(m);
        }
        if let Some(m) = self.review_message_ref {
            r.review_message_ref = Some(m);
        }
    }
}

/// `{total, active, resolved}` polled by the presentation layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub active: u64,
    pub resolved: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub total: u64,
    pub approved: u64,
    pub pending: u64,
    pub distinct_reporters: u64,
}
