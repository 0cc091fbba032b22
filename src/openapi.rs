use crate::lifecycle::{ClearOutcome, OutcomeKind, PanelOutcome, ReportOutcome, ReportRequest, StaffReportRequest};
use crate::models::{EditRecord, Report, ReportSource, ReportState, StaffStats, StatsSnapshot};
use crate::render::{Affordance, ReportPage, StatsBoard, Visual};
use crate::settings::{BotSettings, SetupRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::submit_report,
        crate::routes::resolve_report,
        crate::routes::check_reports,
        crate::routes::submit_staff_report,
        crate::routes::approve_staff_report,
        crate::routes::dismiss_staff_report,
        crate::routes::post_panel,
        crate::routes::get_stats,
        crate::routes::get_staff_stats,
        crate::routes::clear_reports,
        crate::routes::setup,
        crate::routes::set_error_webhook,
    ),
    components(schemas(
        Report, EditRecord, ReportSource, ReportState, StatsSnapshot, StaffStats,
        ReportRequest, StaffReportRequest, ReportOutcome, OutcomeKind, ClearOutcome, PanelOutcome,
        ReportPage, StatsBoard, Visual, Affordance, BotSettings, SetupRequest,
        crate::routes::TriggerRequest, crate::routes::PanelRequest, crate::routes::ClearRequest,
        crate::routes::ErrorWebhookRequest, crate::error::ApiErrorBody,
    )),
    tags(
        (name = "reports", description = "Blacklist report lifecycle"),
        (name = "staff-reports", description = "Staff pre-review workflow"),
        (name = "admin", description = "Bot configuration"),
    )
)]
pub struct ApiDoc;
