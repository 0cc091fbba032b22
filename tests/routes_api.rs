#![cfg(feature = "file-store")]

use actix_web::{test, App};
use blacklist::{
    app_config::LifecycleConfig,
    auth::{create_jwt, create_member_jwt, Role},
    render::LogSink,
    repo::file::FileRepo,
    routes::{config, AppState},
    settings::BotSettings,
    Lifecycle,
};
use blacklist::repo::SettingsRepo;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;

const TARGET: &str = "123456789012345678";

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn admin_token() -> String { create_jwt("111111111111111111", "admin", vec![Role::Admin]).unwrap() }
fn staff_token() -> String { create_jwt("222222222222222222", "staff", vec![Role::Staff]).unwrap() }
fn user_token(id: &str) -> String { create_jwt(id, "user", vec![Role::User]).unwrap() }

async fn state(dir: &tempfile::TempDir) -> AppState {
    let repo = Arc::new(FileRepo::open(dir.path()).unwrap());
    repo.update_settings(Box::new(|s: &mut BotSettings| {
        s.report_channel_id = Some("reports".into());
        s.admin_user_ids = vec!["333333333333333333".into()];
    }))
    .await
    .unwrap();
    let service = Arc::new(Lifecycle::new(repo, Arc::new(LogSink), LifecycleConfig::default()));
    AppState::new(service, None)
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
#[serial]
async fn report_submit_edit_check_resolve_flow() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;

    // create
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"userId": TARGET, "reason": "posting scam links everywhere", "proof": "https://img.example/a.png"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["kind"], "created");
    assert_eq!(created["state"], "active");
    assert_eq!(created["payload"]["kind"], "reportCard");
    assert_eq!(created["stats"]["total"], 1);

    // re-report edits in place
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"userId": TARGET, "reason": "still posting scam links"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let edited: Value = test::read_body_json(resp).await;
    assert_eq!(edited["kind"], "edited");
    assert_eq!(edited["report"]["id"], created["report"]["id"]);
    assert_eq!(edited["report"]["edits"].as_array().unwrap().len(), 1);

    // check
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{TARGET}?page=1"))
        .insert_header(bearer(&admin_token()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["report"]["reason"], "still posting scam links");

    // resolve, then resolve again
    let resolve = || {
        test::TestRequest::post()
            .uri(&format!("/api/v1/reports/{TARGET}/resolve"))
            .insert_header(bearer(&admin_token()))
            .to_request()
    };
    let resp = test::call_service(&app, resolve()).await;
    assert_eq!(resp.status(), 200);
    let resolved: Value = test::read_body_json(resp).await;
    assert_eq!(resolved["state"], "resolved");
    assert_eq!(resolved["report"]["unblacklistedBy"], "111111111111111111");

    let resp = test::call_service(&app, resolve()).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
#[serial]
async fn validation_errors_are_400() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"userId": "12345", "reason": "long enough reason"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("invalid user id"));

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"userId": TARGET, "reason": "short"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
#[serial]
async fn roles_are_enforced() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;
    let body = json!({"userId": TARGET, "reason": "reason for the report"});

    // no token
    let req = test::TestRequest::post().uri("/api/v1/reports").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // plain user
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&user_token("444444444444444444")))
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // staff may not submit direct reports or read stats
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&staff_token()))
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::get().uri("/api/v1/stats").insert_header(bearer(&staff_token())).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // listed in adminUserIds
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&user_token("333333333333333333")))
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}

#[actix_web::test]
#[serial]
async fn configured_admin_role_grants_admin() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;
    let moderator = create_member_jwt("444444444444444444", "mod", vec![Role::User], vec!["mods".into()]).unwrap();
    let stats = || test::TestRequest::get().uri("/api/v1/stats").insert_header(bearer(&moderator)).to_request();

    // no admin role configured yet
    assert_eq!(test::call_service(&app, stats()).await.status(), 403);

    let req = test::TestRequest::put()
        .uri("/api/v1/admin/setup")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"channelId": "blacklist", "adminRoleId": "mods"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    assert_eq!(test::call_service(&app, stats()).await.status(), 200);
    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&moderator))
        .set_json(&json!({"userId": TARGET, "reason": "reported by a role admin"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    // holding some other role is not enough
    let other = create_member_jwt("555555555555555555", "x", vec![Role::User], vec!["members".into()]).unwrap();
    let req = test::TestRequest::get().uri("/api/v1/stats").insert_header(bearer(&other)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
}

#[actix_web::test]
#[serial]
async fn staff_review_approve_and_duplicate() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/staff-reports")
        .insert_header(bearer(&staff_token()))
        .set_json(&json!({
            "userId": TARGET,
            "userTag": "suspect#0001",
            "violationType": "Raid",
            "details": "organised a raid on the server",
            "evidenceLink": "https://img.example/raid.png"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let pending: Value = test::read_body_json(resp).await;
    assert_eq!(pending["state"], "pendingReview");
    assert_eq!(pending["payload"]["affordances"][0]["action"], "approve");

    // staff cannot approve
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/staff-reports/{TARGET}/approve"))
        .insert_header(bearer(&staff_token()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let approve = || {
        test::TestRequest::post()
            .uri(&format!("/api/v1/staff-reports/{TARGET}/approve"))
            .insert_header(bearer(&admin_token()))
            .set_json(&json!({"triggerId": "interaction-1"}))
            .to_request()
    };
    let resp = test::call_service(&app, approve()).await;
    assert_eq!(resp.status(), 200);
    let approved: Value = test::read_body_json(resp).await;
    assert_eq!(approved["state"], "approved");

    let resp = test::call_service(&app, approve()).await;
    assert_eq!(resp.status(), 202);
    let ignored: Value = test::read_body_json(resp).await;
    assert_eq!(ignored["status"], "ignored");

    // already on the public blacklist
    let req = test::TestRequest::post()
        .uri("/api/v1/staff-reports")
        .insert_header(bearer(&staff_token()))
        .set_json(&json!({
            "userId": TARGET,
            "userTag": "suspect#0001",
            "violationType": "Raid",
            "details": "again",
            "evidenceLink": "https://img.example/raid2.png"
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::get().uri("/api/v1/staff-stats").insert_header(bearer(&admin_token())).to_request();
    let stats: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(stats["approved"], 1);
    assert_eq!(stats["distinctReporters"], 1);
}

#[actix_web::test]
#[serial]
async fn clear_reports_requires_confirm() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"userId": TARGET, "reason": "reason for the report"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/clear-reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"confirmation": "yes"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/clear-reports")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"confirmation": "CONFIRM"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let out: Value = test::read_body_json(resp).await;
    assert_eq!(out["deleted"], 1);
    assert_eq!(out["stats"]["total"], 0);

    let req = test::TestRequest::get().uri("/api/v1/stats").insert_header(bearer(&admin_token())).to_request();
    let board: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(board["stats"]["total"], 0);
    assert_eq!(board["totalUsers"], 0);
}

#[actix_web::test]
#[serial]
async fn setup_and_error_webhook() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state(&dir).await))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/api/v1/admin/setup")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"channelId": "blacklist", "adminRoleId": "role-9", "staffChannelId": "staff-room"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let settings: Value = test::read_body_json(resp).await;
    assert_eq!(settings["reportChannelId"], "blacklist");
    assert_eq!(settings["staffChannelId"], "staff-room");
    assert_eq!(settings["adminUserIds"][0], "333333333333333333");

    let req = test::TestRequest::put()
        .uri("/api/v1/admin/error-webhook")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"url": "not a url"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::put()
        .uri("/api/v1/admin/error-webhook")
        .insert_header(bearer(&admin_token()))
        .set_json(&json!({"url": null}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let settings: Value = test::read_body_json(resp).await;
    assert!(settings["errorWebhookUrl"].is_null());
}
