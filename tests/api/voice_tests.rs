//! Voice Session API Tests
//!
//! Run against an in-process gateway so every frame the client sends can be inspected.

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{FakeGateway, GatewayScript, ScriptedSender, TestApp};

const LONG_HEARTBEAT: GatewayScript = GatewayScript::Normal {
    heartbeat_ms: 41_250,
};

fn connect_body() -> Value {
    json!({ "token": "user-token", "guild_id": "111", "channel_id": "222" })
}

async fn app_with_gateway(script: GatewayScript) -> (TestApp, FakeGateway) {
    let gateway = FakeGateway::start(script).await;
    let app = TestApp::new(ScriptedSender::new(), &gateway.url);
    (app, gateway)
}

#[tokio::test]
async fn test_connect_identifies_and_joins_voice() {
    let (app, mut gateway) = app_with_gateway(LONG_HEARTBEAT).await;

    let (status, body) = app.post_json("/vc/connect", connect_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connection_id"], "vc_111_222");
    assert_eq!(body["status"], "connected");

    let identify = gateway.wait_for_op(2).await;
    assert_eq!(identify["d"]["token"], "user-token");
    assert_eq!(identify["d"]["properties"]["os"], "windows");
    assert_eq!(identify["d"]["properties"]["browser"], "chrome");
    assert_eq!(identify["d"]["properties"]["device"], "pc");
    assert_eq!(identify["d"]["presence"]["status"], "online");
    assert_eq!(identify["d"]["presence"]["afk"], false);

    let voice = gateway.wait_for_op(4).await;
    assert_eq!(
        voice["d"],
        json!({
            "guild_id": "111",
            "channel_id": "222",
            "self_mute": true,
            "self_deaf": true,
        })
    );

    let (status, body) = app.get("/vc/status/vc_111_222").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "connected" }));

    let (_, health) = app.get("/health").await;
    assert_eq!(health["active_sessions"], 1);
}

#[tokio::test]
async fn test_duplicate_connect_reuses_live_session() {
    let (app, mut gateway) = app_with_gateway(LONG_HEARTBEAT).await;

    let (_, first) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(first["status"], "connected");

    let (status, second) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "already_connected");
    assert_eq!(second["connection_id"], "vc_111_222");

    assert_eq!(gateway.count_accepted(Duration::from_millis(500)).await, 1);
}

#[tokio::test]
async fn test_heartbeat_echoes_last_sequence() {
    let (app, mut gateway) =
        app_with_gateway(GatewayScript::Normal { heartbeat_ms: 100 }).await;

    let (_, body) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(body["status"], "connected");

    // READY carries s=1, the dispatch right after it s=2
    let heartbeat = gateway
        .wait_for_frame(|frame| frame["op"] == 1 && frame["d"] == 2)
        .await;
    assert_eq!(heartbeat, json!({ "op": 1, "d": 2 }));
}

#[tokio::test]
async fn test_frames_before_ready_are_skipped() {
    let (app, mut gateway) =
        app_with_gateway(GatewayScript::NoiseBeforeReady { heartbeat_ms: 100 }).await;

    let (_, body) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(body["status"], "connected");

    let voice = gateway.wait_for_op(4).await;
    assert_eq!(voice["d"]["channel_id"], "222");

    // READY was the highest sequence seen
    let heartbeat = gateway
        .wait_for_frame(|frame| frame["op"] == 1 && frame["d"] == 3)
        .await;
    assert_eq!(heartbeat, json!({ "op": 1, "d": 3 }));
}

#[tokio::test]
async fn test_disconnect_releases_connection() {
    let (app, mut gateway) = app_with_gateway(LONG_HEARTBEAT).await;

    let (_, body) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(body["status"], "connected");
    gateway.wait_for_op(4).await;

    let (status, body) = app
        .post_json("/vc/disconnect", json!({ "connection_id": "vc_111_222" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Disconnected" }));

    gateway.wait_for_close().await;

    let (_, body) = app.get("/vc/status/vc_111_222").await;
    assert_eq!(body["status"], "disconnected");
}

#[tokio::test]
async fn test_connect_after_disconnect_opens_new_session() {
    let (app, mut gateway) = app_with_gateway(LONG_HEARTBEAT).await;

    app.post_json("/vc/connect", connect_body()).await;
    app.post_json("/vc/disconnect", json!({ "connection_id": "vc_111_222" }))
        .await;

    let (_, body) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(body["status"], "connected");

    assert_eq!(gateway.count_accepted(Duration::from_millis(500)).await, 2);
}

#[tokio::test]
async fn test_invalid_session_ends_in_error() {
    let (app, _gateway) = app_with_gateway(GatewayScript::InvalidSession).await;

    let (status, body) = app.post_json("/vc/connect", connect_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["error"].is_string());

    let (_, body) = app.get("/vc/status/vc_111_222").await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_unreachable_gateway_ends_in_error() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.post_json("/vc/connect", connect_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connection_id"], "vc_111_222");
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_gateway_close_marks_session_disconnected() {
    let (app, _gateway) = app_with_gateway(GatewayScript::CloseAfterVoiceJoin).await;

    let (_, body) = app.post_json("/vc/connect", connect_body()).await;
    assert_eq!(body["connection_id"], "vc_111_222");

    app.wait_for_session_status("vc_111_222", "disconnected").await;
}

#[tokio::test]
async fn test_unknown_connection_is_not_found() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.get("/vc/status/vc_9_9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "status": "not_found" }));

    let (status, body) = app
        .post_json("/vc/disconnect", json!({ "connection_id": "vc_9_9" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Connection not found");
}

#[tokio::test]
async fn test_connect_requires_all_fields() {
    let app = TestApp::with_sender(ScriptedSender::new());

    for body in [
        json!({ "guild_id": "1", "channel_id": "2" }),
        json!({ "token": "t", "channel_id": "2" }),
        json!({ "token": "t", "guild_id": "1", "channel_id": "" }),
    ] {
        let (status, response) = app.post_json("/vc/connect", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Missing token, guild_id or channel_id");
    }
}
