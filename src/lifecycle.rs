//! Report lifecycle controller.
//!
//! Every mutating operation for a user runs under that user's keyed lock, and
//! approve/dismiss additionally claim an in-flight slot keyed by the external
//! trigger so duplicate button presses are dropped. Rendering goes through the
//! [`ChatSink`] after the store has committed and never rolls it back.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_config::LifecycleConfig;
use crate::guard::{InFlight, KeyedLocks};
use crate::ids;
use crate::models::*;
use crate::render::{ChatSink, RenderError, RenderPayload, ReportPage, StatsBoard, Visual};
use crate::repo::{Repo, RepoError};
use crate::settings::{BotSettings, SetupRequest};
use crate::validate::{self, ValidationError};

const ID_ATTEMPTS: usize = 3;
// user ids are all digits, so this cannot collide with a user key
const BOARD_LOCK: &str = "boards";
const APPROVED_WITHOUT_RECORD_REASON: &str = "Added from staff report system";

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no matching report for user {user_id}")]
    NotFound { user_id: String },
    #[error("user {user_id} is already blacklisted")]
    AlreadyBlacklisted { user_id: String },
    #[error("duplicate trigger ignored")]
    DuplicateTrigger,
    #[error("cannot {transition} a report that is {from}")]
    InvalidTransition { from: ReportState, transition: Transition },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepoError> for LifecycleError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::StorageUnavailable(msg) => LifecycleError::StorageUnavailable(msg),
            other => LifecycleError::StorageUnavailable(other.to_string()),
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Body of `report submit`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub user_id: String,
    pub reason: String,
    pub proof: Option<String>,
    pub server: Option<String>,
}

/// Body of `staff-report submit`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffReportRequest {
    pub user_id: String,
    pub user_tag: String,
    pub violation_type: String,
    pub details: String,
    pub evidence_link: String,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    Created,
    Edited,
    Resolved,
    PendingReview,
    Approved,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub kind: OutcomeKind,
    pub state: ReportState,
    pub report: Report,
    #[schema(value_type = Object)]
    pub payload: RenderPayload,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub deleted: u64,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanelOutcome {
    pub channel_id: String,
    pub message_ref: Option<MessageRef>,
    #[schema(value_type = Object)]
    pub payload: RenderPayload,
}

pub struct Lifecycle {
    repo: Arc<dyn Repo>,
    sink: Arc<dyn ChatSink>,
    locks: KeyedLocks,
    in_flight: InFlight,
    config: LifecycleConfig,
}

impl Lifecycle {
    pub fn new(repo: Arc<dyn Repo>, sink: Arc<dyn ChatSink>, config: LifecycleConfig) -> Self {
        Self { repo, sink, locks: KeyedLocks::new(), in_flight: InFlight::new(), config }
    }

    pub fn repo(&self) -> &Arc<dyn Repo> {
        &self.repo
    }

    /// Direct report. Re-reporting a user with an active report edits it; a
    /// pending staff review is edited and published as approved.
    pub async fn submit_report(&self, req: ReportRequest, actor: &str) -> LifecycleResult<ReportOutcome> {
        let user_id = validate::user_id(req.user_id.trim())?.to_string();
        let reason = validate::reason(&req.reason, self.config.min_reason_len)?;
        let proof = validate::optional_proof(req.proof.as_deref());

        let _user = self.locks.lock(&user_id).await;
        let settings = self.repo.get_settings().await?;

        if let Some(existing) = self.repo.find_active_by_user(&user_id).await? {
            let promote = existing.state() == ReportState::PendingReview;
            let edit = EditRecord {
                edit_id: ids::edit_id(),
                previous_reason: existing.reason.clone(),
                previous_proof: existing.proof.clone(),
                new_reason: reason.clone(),
                new_proof: proof.clone(),
                edited_by: actor.to_string(),
                edited_at: Utc::now(),
            };
            let patch = ReportPatch {
                require_active: true,
                reason: Some(reason),
                proof: Some(proof),
                push_edit: Some(edit),
                approved: promote.then_some(true),
                ..Default::default()
            };
            let report = self
                .repo
                .update_report(&existing.id, patch)
                .await
                .map_err(|e| not_found_for(e, &user_id))?;
            tracing::info!(
                user_id = %report.user_id,
                report_id = %report.id,
                edits = report.edit_count(),
                promoted = promote,
                "report edited"
            );

            let stats = self.repo.stats_snapshot().await?;
            let visual = if report.rendered_message_ref.is_some() { Visual::Updated } else { Visual::Blacklisted };
            let payload = RenderPayload::report_card(visual, &report, actor, stats);
            let report = self.show_public_card(&settings, report, &payload).await;
            if promote {
                let staff = RenderPayload::staff_card(Visual::Approved, &report, actor);
                self.edit_staff_card(&settings, &report, &staff).await;
            }
            drop(_user);
            self.refresh_boards().await;
            return Ok(ReportOutcome { kind: OutcomeKind::Edited, state: report.state(), report, payload, stats });
        }

        let new = NewReport {
            user_id: user_id.clone(),
            reason,
            proof,
            server: req.server,
            reported_by: actor.to_string(),
            user_tag: None,
            source: ReportSource::Direct,
            approved: false,
        };
        let report = self.create_with_fresh_id(new).await?;
        tracing::info!(user_id = %report.user_id, report_id = %report.id, "report created");

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::report_card(Visual::Blacklisted, &report, actor, stats);
        let report = self.show_public_card(&settings, report, &payload).await;
        drop(_user);
        self.refresh_boards().await;
        Ok(ReportOutcome { kind: OutcomeKind::Created, state: report.state(), report, payload, stats })
    }

    pub async fn resolve_report(&self, user_id: &str, actor: &str) -> LifecycleResult<ReportOutcome> {
        let user_id = validate::user_id(user_id.trim())?.to_string();
        let _user = self.locks.lock(&user_id).await;
        let settings = self.repo.get_settings().await?;

        let active = self
            .repo
            .find_active_by_user(&user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound { user_id: user_id.clone() })?;
        check_transition(active.state(), Transition::Resolve)?;

        let patch = ReportPatch {
            require_active: true,
            resolved: Some((actor.to_string(), Utc::now())),
            ..Default::default()
        };
        let report = self
            .repo
            .update_report(&active.id, patch)
            .await
            .map_err(|e| not_found_for(e, &user_id))?;
        tracing::info!(user_id = %report.user_id, report_id = %report.id, by = actor, "report resolved");

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::report_card(Visual::Resolved, &report, actor, stats);
        if let Some(message) = report.rendered_message_ref.as_deref() {
            self.edit_card(settings.report_channel_id.as_deref(), message, &payload).await;
        }
        if active.state() == ReportState::PendingReview {
            let staff = RenderPayload::staff_card(Visual::Resolved, &report, actor);
            self.edit_staff_card(&settings, &report, &staff).await;
        }
        drop(_user);
        self.refresh_boards().await;
        Ok(ReportOutcome { kind: OutcomeKind::Resolved, state: report.state(), report, payload, stats })
    }

    /// Staff pre-review. A user with a pending record gets that record edited;
    /// a user already publicly listed is rejected.
    pub async fn submit_staff_review(&self, req: StaffReportRequest, actor: &str) -> LifecycleResult<ReportOutcome> {
        let user_id = validate::user_id(req.user_id.trim())?.to_string();
        let user_tag = validate::required(&req.user_tag, "userTag")?;
        let violation = validate::required(&req.violation_type, "violationType")?;
        let details = validate::required(&req.details, "details")?;
        let evidence = validate::evidence(&req.evidence_link, self.config.min_evidence_len)?;
        let reason = format!("Type: {violation}\nDetails: {details}");

        let _user = self.locks.lock(&user_id).await;
        let settings = self.repo.get_settings().await?;

        if self.repo.find_approved_active_by_user(&user_id).await?.is_some() {
            return Err(LifecycleError::AlreadyBlacklisted { user_id });
        }

        let (kind, report) = match self.repo.find_active_by_user(&user_id).await? {
            Some(existing) if existing.state() == ReportState::PendingReview => {
                let edit = EditRecord {
                    edit_id: ids::edit_id(),
                    previous_reason: existing.reason.clone(),
                    previous_proof: existing.proof.clone(),
                    new_reason: reason.clone(),
                    new_proof: Some(evidence.clone()),
                    edited_by: actor.to_string(),
                    edited_at: Utc::now(),
                };
                let patch = ReportPatch {
                    require_active: true,
                    require_unapproved: true,
                    reason: Some(reason),
                    proof: Some(Some(evidence)),
                    push_edit: Some(edit),
                    ..Default::default()
                };
                let report = self
                    .repo
                    .update_report(&existing.id, patch)
                    .await
                    .map_err(|e| not_found_for(e, &user_id))?;
                (OutcomeKind::Edited, report)
            }
            // a direct report is already on the public channel
            Some(_) => return Err(LifecycleError::AlreadyBlacklisted { user_id }),
            None => {
                let new = NewReport {
                    user_id: user_id.clone(),
                    reason,
                    proof: Some(evidence),
                    server: None,
                    reported_by: actor.to_string(),
                    user_tag: Some(user_tag),
                    source: ReportSource::StaffReview,
                    approved: false,
                };
                (OutcomeKind::PendingReview, self.create_with_fresh_id(new).await?)
            }
        };
        tracing::info!(user_id = %report.user_id, report_id = %report.id, "staff report pending review");

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::staff_card(Visual::PendingReview, &report, actor);
        let report = match report.review_message_ref.clone() {
            Some(_) => {
                self.edit_staff_card(&settings, &report, &payload).await;
                report
            }
            None => match self.post_card(settings.staff_channel(), &payload).await {
                Some(message) => {
                    self.remember_ref(report, ReportPatch { review_message_ref: Some(message), ..Default::default() })
                        .await
                }
                None => report,
            },
        };
        drop(_user);
        self.refresh_boards().await;
        Ok(ReportOutcome { kind, state: report.state(), report, payload, stats })
    }

    /// Promotes the user's unresolved report, creating an approved record when
    /// none exists. `trigger_id` identifies the external event (button press).
    pub async fn approve_pending(
        &self,
        user_id: &str,
        trigger_id: Option<&str>,
        actor: &str,
    ) -> LifecycleResult<ReportOutcome> {
        let user_id = validate::user_id(user_id.trim())?.to_string();
        let key = trigger_key("approve", &user_id, trigger_id);
        let _flight = self.in_flight.try_begin(&key).ok_or(LifecycleError::DuplicateTrigger)?;
        let _user = self.locks.lock(&user_id).await;
        let settings = self.repo.get_settings().await?;

        let (report, had_review_card) = match self.repo.find_active_by_user(&user_id).await? {
            Some(current) => {
                let from = current.state();
                if from == ReportState::Approved {
                    // an earlier trigger for the same approval already ran
                    tracing::debug!(user_id = %user_id, "approve ignored, already approved");
                    return Err(LifecycleError::DuplicateTrigger);
                }
                check_transition(from, Transition::Approve)?;
                let patch = ReportPatch {
                    require_active: true,
                    require_unapproved: true,
                    approved: Some(true),
                    ..Default::default()
                };
                let report = self.repo.update_report(&current.id, patch).await.map_err(|e| match e {
                    RepoError::Conflict => LifecycleError::DuplicateTrigger,
                    other => not_found_for(other, &user_id),
                })?;
                (report, from == ReportState::PendingReview)
            }
            None => {
                // a stale button on a dismissed review must not resurrect it
                if let Some(latest) = self.repo.list_by_user(&user_id).await?.first() {
                    if latest.state() == ReportState::Dismissed {
                        return Err(LifecycleError::InvalidTransition {
                            from: ReportState::Dismissed,
                            transition: Transition::Approve,
                        });
                    }
                }
                let new = NewReport {
                    user_id: user_id.clone(),
                    reason: APPROVED_WITHOUT_RECORD_REASON.to_string(),
                    proof: None,
                    server: None,
                    reported_by: actor.to_string(),
                    user_tag: None,
                    source: ReportSource::StaffReview,
                    approved: true,
                };
                (self.create_with_fresh_id(new).await?, false)
            }
        };
        tracing::info!(user_id = %report.user_id, report_id = %report.id, by = actor, "report approved");

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::report_card(Visual::Approved, &report, actor, stats);
        let report = self.show_public_card(&settings, report, &payload).await;
        if had_review_card {
            let staff = RenderPayload::staff_card(Visual::Approved, &report, actor);
            self.edit_staff_card(&settings, &report, &staff).await;
        }
        drop(_user);
        self.refresh_boards().await;
        Ok(ReportOutcome { kind: OutcomeKind::Approved, state: report.state(), report, payload, stats })
    }

    /// Closes the pending review and marks its staff card dismissed. The
    /// record stays for audit but no longer counts as a report.
    pub async fn dismiss_pending(
        &self,
        user_id: &str,
        trigger_id: Option<&str>,
        actor: &str,
    ) -> LifecycleResult<ReportOutcome> {
        let user_id = validate::user_id(user_id.trim())?.to_string();
        let key = trigger_key("dismiss", &user_id, trigger_id);
        let _flight = self.in_flight.try_begin(&key).ok_or(LifecycleError::DuplicateTrigger)?;
        let _user = self.locks.lock(&user_id).await;
        let settings = self.repo.get_settings().await?;

        let pending = self
            .repo
            .find_active_by_user(&user_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound { user_id: user_id.clone() })?;
        check_transition(pending.state(), Transition::Dismiss)?;

        let patch = ReportPatch {
            require_active: true,
            require_unapproved: true,
            dismissed: Some((actor.to_string(), Utc::now())),
            ..Default::default()
        };
        let report = self
            .repo
            .update_report(&pending.id, patch)
            .await
            .map_err(|e| not_found_for(e, &user_id))?;
        tracing::info!(user_id = %report.user_id, report_id = %report.id, by = actor, "staff report dismissed");

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::staff_card(Visual::Dismissed, &report, actor);
        self.edit_staff_card(&settings, &report, &payload).await;
        drop(_user);
        self.refresh_boards().await;
        Ok(ReportOutcome { kind: OutcomeKind::Dismissed, state: report.state(), report, payload, stats })
    }

    /// Empties the store. Requires the literal confirmation token.
    pub async fn clear_all(&self, confirmation: &str, actor: &str) -> LifecycleResult<ClearOutcome> {
        validate::confirmation(confirmation)?;
        let deleted = self.repo.delete_all().await?;
        tracing::warn!(deleted, by = actor, "all reports cleared");
        self.refresh_boards().await;
        let stats = self.repo.stats_snapshot().await?;
        Ok(ClearOutcome { deleted, stats })
    }

    pub async fn stats_snapshot(&self) -> LifecycleResult<StatsSnapshot> {
        Ok(self.repo.stats_snapshot().await?)
    }

    pub async fn stats_board(&self) -> LifecycleResult<StatsBoard> {
        let stats = self.repo.stats_snapshot().await?;
        let (total_users, blacklisted_users, cleared_users) = self.repo.distinct_users().await?;
        Ok(StatsBoard { stats, total_users, blacklisted_users, cleared_users, updated_at: Utc::now() })
    }

    pub async fn staff_stats(&self) -> LifecycleResult<StaffStats> {
        let total = self.repo.count_all().await?;
        let approved = self.repo.count_approved().await?;
        Ok(StaffStats {
            total,
            approved,
            pending: total.saturating_sub(approved),
            distinct_reporters: self.repo.distinct_reporters().await?,
        })
    }

    /// One report per page, newest first. `page` is 1-based and clamped.
    /// Dismissed reviews are not listed.
    pub async fn check(&self, user_id: &str, page: usize) -> LifecycleResult<ReportPage> {
        let user_id = validate::user_id(user_id.trim())?.to_string();
        let mut reports = self.repo.list_by_user(&user_id).await?;
        reports.retain(|r| !r.dismissed);
        if reports.is_empty() {
            return Err(LifecycleError::NotFound { user_id });
        }
        let total = reports.len();
        let active = reports.iter().filter(|r| r.is_active()).count();
        let page = page.clamp(1, total);
        Ok(ReportPage {
            user_id,
            page,
            total_pages: total,
            total,
            active,
            resolved: total - active,
            report: reports.into_iter().nth(page - 1),
        })
    }

    /// Posts the action panel and remembers where it lives.
    pub async fn panel(&self, channel_id: Option<String>, actor: &str) -> LifecycleResult<PanelOutcome> {
        let settings = self.repo.get_settings().await?;
        let channel = channel_id
            .filter(|c| !c.trim().is_empty())
            .or_else(|| settings.panel_channel_id.clone())
            .or_else(|| settings.report_channel_id.clone())
            .ok_or(ValidationError::MissingField("channelId"))?;

        let stats = self.repo.stats_snapshot().await?;
        let payload = RenderPayload::panel(stats);
        let message_ref = self.post_card(Some(channel.as_str()), &payload).await;
        if let Some(message) = message_ref.clone() {
            let panel_channel = channel.clone();
            self.repo
                .update_settings(Box::new(move |s: &mut BotSettings| {
                    s.panel_channel_id = Some(panel_channel);
                    s.panel_message_id = Some(message);
                }))
                .await?;
        }
        tracing::info!(channel = %channel, by = actor, posted = message_ref.is_some(), "panel posted");
        Ok(PanelOutcome { channel_id: channel, message_ref, payload })
    }

    pub async fn setup(&self, req: SetupRequest, actor: &str) -> LifecycleResult<BotSettings> {
        validate::required(&req.channel_id, "channelId")?;
        let settings = self.repo.update_settings(Box::new(move |s: &mut BotSettings| req.apply(s))).await?;
        tracing::info!(channel = ?settings.report_channel_id, by = actor, "bot configured");
        self.refresh_boards().await;
        Ok(settings)
    }

    /// `None` clears the webhook.
    pub async fn set_error_webhook(&self, url: Option<&str>, actor: &str) -> LifecycleResult<BotSettings> {
        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(validate::webhook_url(raw)?),
            None => None,
        };
        let enabled = url.is_some();
        let settings = self
            .repo
            .update_settings(Box::new(move |s: &mut BotSettings| s.error_webhook_url = url))
            .await?;
        tracing::info!(enabled, by = actor, "error webhook updated");
        Ok(settings)
    }

    async fn create_with_fresh_id(&self, new: NewReport) -> LifecycleResult<Report> {
        let now = Utc::now();
        for attempt in 1..=ID_ATTEMPTS {
            match self.repo.create_report(new.clone().into_report(ids::report_id(), now)).await {
                Ok(r) => return Ok(r),
                Err(RepoError::DuplicateId) => {
                    tracing::warn!(attempt, user_id = %new.user_id, "report id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LifecycleError::StorageUnavailable("could not allocate a unique report id".into()))
    }

    /// Edits the public card in place, or posts it when the report has none.
    async fn show_public_card(&self, settings: &BotSettings, report: Report, payload: &RenderPayload) -> Report {
        let channel = settings.report_channel_id.as_deref();
        if let Some(message) = report.rendered_message_ref.as_deref() {
            self.edit_card(channel, message, payload).await;
            return report;
        }
        match self.post_card(channel, payload).await {
            Some(message) => {
                self.remember_ref(report, ReportPatch { rendered_message_ref: Some(message), ..Default::default() })
                    .await
            }
            None => report,
        }
    }

    async fn edit_staff_card(&self, settings: &BotSettings, report: &Report, payload: &RenderPayload) {
        if let Some(message) = report.review_message_ref.as_deref() {
            self.edit_card(settings.staff_channel(), message, payload).await;
        }
    }

    // The ref is bookkeeping for later edits; losing it only costs an in-place update.
    async fn remember_ref(&self, report: Report, patch: ReportPatch) -> Report {
        match self.repo.update_report(&report.id, patch).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(report_id = %report.id, error = %e, "failed to store message ref");
                report
            }
        }
    }

    async fn post_card(&self, channel: Option<&str>, payload: &RenderPayload) -> Option<MessageRef> {
        let Some(channel) = channel else {
            tracing::debug!(kind = payload.kind(), "{}", RenderError::NotConfigured);
            return None;
        };
        match self.sink.post(channel, payload).await {
            Ok(message) => Some(message),
            Err(e) => {
                log_render_error(&e, channel, payload);
                None
            }
        }
    }

    async fn edit_card(&self, channel: Option<&str>, message: &str, payload: &RenderPayload) -> bool {
        let Some(channel) = channel else {
            tracing::debug!(kind = payload.kind(), "{}", RenderError::NotConfigured);
            return false;
        };
        match self.sink.edit(channel, message, payload).await {
            Ok(()) => true,
            Err(e) => {
                log_render_error(&e, channel, payload);
                false
            }
        }
    }

    /// Re-renders the stats board and the panel. Failures are logged.
    pub async fn refresh_boards(&self) {
        if let Err(e) = self.try_refresh_boards().await {
            tracing::warn!(error = %e, "board refresh failed");
        }
    }

    async fn try_refresh_boards(&self) -> LifecycleResult<()> {
        let _boards = self.locks.lock(BOARD_LOCK).await;
        let settings = self.repo.get_settings().await?;

        if let Some(channel) = settings.stats_channel_id.clone() {
            let board = RenderPayload::StatsBoard(self.stats_board().await?);
            let edited = match settings.stats_message_id.as_deref() {
                Some(message) => self.edit_card(Some(channel.as_str()), message, &board).await,
                None => false,
            };
            if !edited {
                if let Some(message) = self.post_card(Some(channel.as_str()), &board).await {
                    self.repo
                        .update_settings(Box::new(move |s: &mut BotSettings| s.stats_message_id = Some(message)))
                        .await?;
                }
            }
        }

        if let Some((channel, message)) = settings.panel_target() {
            let stats = self.repo.stats_snapshot().await?;
            self.edit_card(Some(channel), message, &RenderPayload::panel(stats)).await;
        }
        Ok(())
    }
}

fn trigger_key(action: &str, user_id: &str, trigger_id: Option<&str>) -> String {
    match trigger_id.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!("trigger:{t}"),
        None => format!("{action}:{user_id}"),
    }
}

fn check_transition(from: ReportState, transition: Transition) -> LifecycleResult<ReportState> {
    from.apply(transition).ok_or(LifecycleError::InvalidTransition { from, transition })
}

// A record found under the user lock can still vanish through clear_all.
fn not_found_for(e: RepoError, user_id: &str) -> LifecycleError {
    match e {
        RepoError::NotFound | RepoError::Conflict => LifecycleError::NotFound { user_id: user_id.to_string() },
        other => other.into(),
    }
}

fn log_render_error(e: &RenderError, channel: &str, payload: &RenderPayload) {
    match e {
        RenderError::TargetMissing => {
            tracing::warn!(channel, kind = payload.kind(), "render target missing, store left as is")
        }
        other => tracing::warn!(channel, kind = payload.kind(), error = %other, "render failed"),
    }
}
