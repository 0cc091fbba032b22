use std::sync::Arc;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::alert::{AlertContext, AlertSink};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::lifecycle::{
    ClearOutcome, Lifecycle, LifecycleError, LifecycleResult, OutcomeKind, PanelOutcome, ReportOutcome,
    ReportRequest, StaffReportRequest,
};
use crate::models::StaffStats;
use crate::rate_limit::RateLimiterFacade;
use crate::render::{ReportPage, StatsBoard};
use crate::repo::Repo;
use crate::settings::{BotSettings, SetupRequest};
use crate::validate;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/reports").route(web::post().to(submit_report)))
            .service(web::resource("/reports/{user_id}").route(web::get().to(check_reports)))
            .service(web::resource("/reports/{user_id}/resolve").route(web::post().to(resolve_report)))
            .service(web::resource("/staff-reports").route(web::post().to(submit_staff_report)))
            .service(web::resource("/staff-reports/{user_id}/approve").route(web::post().to(approve_staff_report)))
            .service(web::resource("/staff-reports/{user_id}/dismiss").route(web::post().to(dismiss_staff_report)))
            .service(web::resource("/panel").route(web::post().to(post_panel)))
            .service(web::resource("/stats").route(web::get().to(get_stats)))
            .service(web::resource("/staff-stats").route(web::get().to(get_staff_stats)))
            // Admin configuration endpoints
            .service(web::resource("/admin/clear-reports").route(web::post().to(clear_reports)))
            .service(web::resource("/admin/setup").route(web::put().to(setup)))
            .service(web::resource("/admin/error-webhook").route(web::put().to(set_error_webhook))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Lifecycle>,
    pub repo: Arc<dyn Repo>,
    pub rate_limiter: Option<RateLimiterFacade>,
    pub alerts: AlertSink,
}

impl AppState {
    pub fn new(service: Arc<Lifecycle>, rate_limiter: Option<RateLimiterFacade>) -> Self {
        let repo = service.repo().clone();
        Self { service, repo, rate_limiter, alerts: AlertSink::new() }
    }

    /// Forwards storage failures to the error webhook before answering 503.
    async fn finish<T>(&self, ctx: AlertContext, res: LifecycleResult<T>) -> Result<T, ApiError> {
        match res {
            Err(LifecycleError::StorageUnavailable(msg)) => {
                let webhook = self.repo.get_settings().await.ok().and_then(|s| s.error_webhook_url);
                self.alerts.send_error(webhook.as_deref(), "StorageUnavailable", &msg, &ctx).await;
                Err(ApiError::StorageUnavailable(msg))
            }
            other => other.map_err(ApiError::from),
        }
    }

    async fn settings(&self, ctx: &AlertContext) -> Result<BotSettings, ApiError> {
        match self.repo.get_settings().await {
            Ok(s) => Ok(s),
            Err(e) => {
                self.alerts.send_error(None, "StorageUnavailable", &e, ctx).await;
                Err(e.into())
            }
        }
    }
}

macro_rules! ensure_admin {
    ($auth:expr, $data:expr, $ctx:expr) => {
        if !$auth.0.is_admin(&$data.settings(&$ctx).await?) { return Err(ApiError::Forbidden); }
    };
}

macro_rules! ensure_staff {
    ($auth:expr, $data:expr, $ctx:expr) => {
        if !$auth.0.is_staff(&$data.settings(&$ctx).await?) { return Err(ApiError::Forbidden); }
    };
}

fn context(operation: &'static str, auth: &Auth) -> AlertContext {
    AlertContext::new(operation).caller(auth.0.platform_id())
}

fn ignored() -> HttpResponse {
    HttpResponse::Accepted().json(serde_json::json!({"status":"ignored"}))
}

fn outcome_response(outcome: ReportOutcome) -> HttpResponse {
    match outcome.kind {
        OutcomeKind::Created | OutcomeKind::PendingReview => HttpResponse::Created().json(outcome),
        _ => HttpResponse::Ok().json(outcome),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = ReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportOutcome),
        (status = 200, description = "Active report edited", body = ReportOutcome),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden – Admins only"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn submit_report(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let ctx = context("report.submit", &auth).target(req.user_id.clone());
    ensure_admin!(auth, data, ctx);
    let res = data.service.submit_report(req, auth.0.platform_id()).await;
    Ok(outcome_response(data.finish(ctx, res).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{user_id}/resolve",
    params(("user_id" = String, Path, description = "Reported account id")),
    responses(
        (status = 200, description = "Report resolved", body = ReportOutcome),
        (status = 404, description = "No active report"),
        (status = 403, description = "Forbidden – Admins only")
    )
)]
pub async fn resolve_report(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let ctx = context("report.resolve", &auth).target(user_id.clone());
    ensure_admin!(auth, data, ctx);
    let res = data.service.resolve_report(&user_id, auth.0.platform_id()).await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    /// 1-based page, one report per page
    pub page: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{user_id}",
    params(("user_id" = String, Path, description = "Reported account id"), CheckQuery),
    responses(
        (status = 200, description = "One page of the user's reports", body = ReportPage),
        (status = 404, description = "No reports for this user")
    )
)]
pub async fn check_reports(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CheckQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let ctx = context("report.check", &auth).target(user_id.clone());
    ensure_admin!(auth, data, ctx);
    let res = data.service.check(&user_id, query.page.unwrap_or(1)).await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/staff-reports",
    request_body = StaffReportRequest,
    responses(
        (status = 201, description = "Pending staff review created", body = ReportOutcome),
        (status = 200, description = "Pending review updated", body = ReportOutcome),
        (status = 409, description = "User already blacklisted"),
        (status = 403, description = "Forbidden – Staff only")
    )
)]
pub async fn submit_staff_report(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<StaffReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let ctx = context("staff-report.submit", &auth).target(req.user_id.clone());
    ensure_staff!(auth, data, ctx);
    let res = data.service.submit_staff_review(req, auth.0.platform_id()).await;
    Ok(outcome_response(data.finish(ctx, res).await?))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    /// Id of the external event (button press) that caused this call.
    pub trigger_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/staff-reports/{user_id}/approve",
    params(("user_id" = String, Path, description = "Reported account id")),
    request_body = TriggerRequest,
    responses(
        (status = 200, description = "Approved and published", body = ReportOutcome),
        (status = 202, description = "Duplicate trigger ignored"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn approve_staff_report(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Option<web::Json<TriggerRequest>>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let trigger = payload.map(|p| p.into_inner()).unwrap_or_default();
    let ctx = context("staff-report.approve", &auth).target(user_id.clone());
    ensure_admin!(auth, data, ctx);
    match data.service.approve_pending(&user_id, trigger.trigger_id.as_deref(), auth.0.platform_id()).await {
        Err(LifecycleError::DuplicateTrigger) => Ok(ignored()),
        res => Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/staff-reports/{user_id}/dismiss",
    params(("user_id" = String, Path, description = "Reported account id")),
    request_body = TriggerRequest,
    responses(
        (status = 200, description = "Pending review dismissed", body = ReportOutcome),
        (status = 202, description = "Duplicate trigger ignored"),
        (status = 404, description = "No pending report")
    )
)]
pub async fn dismiss_staff_report(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Option<web::Json<TriggerRequest>>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let trigger = payload.map(|p| p.into_inner()).unwrap_or_default();
    let ctx = context("staff-report.dismiss", &auth).target(user_id.clone());
    ensure_admin!(auth, data, ctx);
    match data.service.dismiss_pending(&user_id, trigger.trigger_id.as_deref(), auth.0.platform_id()).await {
        Err(LifecycleError::DuplicateTrigger) => Ok(ignored()),
        res => Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?)),
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanelRequest {
    pub channel_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/panel",
    request_body = PanelRequest,
    responses((status = 200, description = "Panel posted", body = PanelOutcome))
)]
pub async fn post_panel(
    auth: Auth,
    data: web::Data<AppState>,
    payload: Option<web::Json<PanelRequest>>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.map(|p| p.into_inner()).unwrap_or_default();
    let ctx = context("panel", &auth);
    ensure_admin!(auth, data, ctx);
    let res = data.service.panel(req.channel_id, auth.0.platform_id()).await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses((status = 200, description = "Aggregate counts", body = StatsBoard))
)]
pub async fn get_stats(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ctx = context("stats", &auth);
    ensure_admin!(auth, data, ctx);
    let res = data.service.stats_board().await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff-stats",
    responses((status = 200, description = "Staff workflow counts", body = StaffStats))
)]
pub async fn get_staff_stats(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ctx = context("staff-stats", &auth);
    ensure_admin!(auth, data, ctx);
    let res = data.service.staff_stats().await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearRequest {
    /// Must be exactly `CONFIRM`.
    pub confirmation: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/clear-reports",
    request_body = ClearRequest,
    responses(
        (status = 200, description = "All reports deleted", body = ClearOutcome),
        (status = 400, description = "Confirmation missing"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn clear_reports(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ClearRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = context("admin.clear-reports", &auth);
    ensure_admin!(auth, data, ctx);
    // a mistyped token must not burn the caller's window
    validate::confirmation(&payload.confirmation)?;
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_clear(auth.0.platform_id()) {
            return Err(ApiError::RateLimited);
        }
    }
    let res = data.service.clear_all(&payload.confirmation, auth.0.platform_id()).await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/setup",
    request_body = SetupRequest,
    responses((status = 200, description = "Settings stored", body = BotSettings))
)]
pub async fn setup(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<SetupRequest>,
) -> Result<HttpResponse, ApiError> {
    let ctx = context("admin.setup", &auth);
    ensure_admin!(auth, data, ctx);
    let res = data.service.setup(payload.into_inner(), auth.0.platform_id()).await;
    Ok(HttpResponse::Ok().json(data.finish(ctx, res).await?))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ErrorWebhookRequest {
    /// Omit or send null to disable alerting.
    pub url: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/error-webhook",
    request_body = ErrorWebhookRequest,
    responses(
        (status = 200, description = "Webhook stored", body = BotSettings),
        (status = 400, description = "Invalid url")
    )
)]
pub async fn set_error_webhook(
    auth: Auth,
    data: web::Data<AppState>,
    payload: Option<web::Json<ErrorWebhookRequest>>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.map(|p| p.into_inner()).unwrap_or_default();
    let ctx = context("admin.error-webhook", &auth);
    ensure_admin!(auth, data, ctx);
    let res = data.service.set_error_webhook(req.url.as_deref(), auth.0.platform_id()).await;
    let settings = data.finish(ctx, res).await?;
    if let Some(url) = settings.error_webhook_url.as_deref() {
        data.alerts
            .send_info(url, "Webhook connected", "Error reports for this bot will be delivered here.")
            .await;
    }
    Ok(HttpResponse::Ok().json(settings))
}
