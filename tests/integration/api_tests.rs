//! HTTP override API, driven in-process through `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use ventguard::api::build_router;
use ventguard::control::actuator::{Angle, Source};

use crate::mock_hw::{Rig, rig};

fn router(r: &Rig) -> Router {
    build_router(r.api_state())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test(start_paused = true)]
async fn get_angle_reports_initial_position() {
    let r = rig();
    let (status, body) = call(router(&r), get("/api/get_angle")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "angle": 90 }));
}

#[tokio::test(start_paused = true)]
async fn set_angle_moves_vent_as_override() {
    let r = rig();
    let (status, body) = call(router(&r), post_json("/api/set_angle", r#"{"angle":120}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "angle": 120 }));
    assert_eq!(r.board.servo_angle(), Some(Angle::saturating(120)));
    assert_eq!(r.actuator.state().source, Source::Override);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_angle_is_rejected_without_moving() {
    let r = rig();
    let before = r.actuator.state();
    let (status, body) = call(router(&r), post_json("/api/set_angle", r#"{"angle":200}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(r.actuator.state(), before);
    assert!(r.board.servo_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_angle_defaults_to_center() {
    let r = rig();
    r.actuator
        .apply(Angle::MIN, "operator", Source::Override)
        .await
        .unwrap();
    let (status, body) = call(router(&r), post_json("/api/set_angle", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["angle"], 90);
    assert_eq!(r.board.servo_angle(), Some(Angle::CENTER));
}

#[tokio::test(start_paused = true)]
async fn preset_moves_to_named_position() {
    let r = rig();
    let (status, body) = call(router(&r), post_json("/api/preset", r#"{"position":"left"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "success", "angle": 45, "position": "left" })
    );
    assert_eq!(r.actuator.state().reason, "preset: left");
}

#[tokio::test(start_paused = true)]
async fn unknown_preset_is_bad_request() {
    let r = rig();
    let (status, body) = call(router(&r), post_json("/api/preset", r#"{"position":"up"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(r.board.servo_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sweep_walks_the_range() {
    let r = rig();
    let req = post_json(
        "/api/sweep",
        r#"{"start":0,"end":60,"step":30,"delay":0}"#,
    );
    let (status, body) = call(router(&r), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "start": 0, "end": 60 }));
    let writes: Vec<u8> = r.board.servo_writes().iter().map(|a| a.degrees()).collect();
    assert_eq!(writes, vec![0, 30, 60]);
}

#[tokio::test(start_paused = true)]
async fn invalid_sweep_step_is_bad_request() {
    let r = rig();
    let (status, _) = call(router(&r), post_json("/api/sweep", r#"{"step":0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(r.board.servo_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_sweep_delay_is_bad_request() {
    let r = rig();
    let req = post_json(
        "/api/sweep",
        r#"{"start":0,"end":10,"step":10,"delay":1e300}"#,
    );
    let (status, body) = call(router(&r), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("delay"));
    assert!(r.board.servo_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sweep_during_shutdown_is_unavailable() {
    let r = rig();
    r.cancel.cancel();
    let (status, body) = call(router(&r), post_json("/api/sweep", "{}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

#[tokio::test(start_paused = true)]
async fn malformed_json_is_bad_request() {
    let r = rig();
    let (status, body) = call(router(&r), post_json("/api/set_angle", "{angle:")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON data")
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_route_is_not_found() {
    let r = rig();
    let (status, body) = call(router(&r), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "status": "error", "message": "Resource not found" })
    );
}

#[tokio::test(start_paused = true)]
async fn system_status_combines_vent_gas_and_motion() {
    let mut r = rig();
    let cancel = r.cancel.clone();
    r.control.startup(&cancel).await;
    r.board.set_motion(true);
    r.board.set_gas(true);
    r.control.tick(tokio::time::Instant::now()).await;

    let (status, body) = call(router(&r), get("/api/system_status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["angle"], 180);
    assert_eq!(body["gas_detected"], true);
    assert_eq!(body["motion_detected"], true);
    assert!(body["vent_reason"].as_str().unwrap().contains("gas"));
    assert_eq!(body["degraded"], false);
}

#[tokio::test(start_paused = true)]
async fn system_status_reports_degraded_sensor() {
    let mut r = rig();
    let cancel = r.cancel.clone();
    r.control.startup(&cancel).await;
    r.board.set_climate(None);
    for _ in 0..6 {
        r.control.tick(tokio::time::Instant::now()).await;
        tokio::time::advance(std::time::Duration::from_secs(1)).await;
    }

    let (status, body) = call(router(&r), get("/api/system_status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["angle"], 90);
}

#[tokio::test(start_paused = true)]
async fn responses_carry_cors_headers() {
    let r = rig();
    let req = Request::get("/api/get_angle")
        .header(header::ORIGIN, "http://dashboard.local")
        .body(Body::empty())
        .unwrap();
    let resp = router(&r).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
