//! Typing Job API Tests

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use test_case::test_case;
use tokio::sync::Semaphore;

use crate::common::{ScriptedSender, TestApp};

#[tokio::test]
async fn test_job_posts_every_line_in_order() {
    let sender = ScriptedSender::new();
    let app = TestApp::with_sender(sender.clone());

    let (status, body) = app
        .post_form(
            "/start",
            &[("token", "user-token"), ("channel_id", "42"), ("delay", "0")],
            Some(b"a\r\n\r\n  b  \nc\n".as_slice()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_lines"], 3);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    assert!(job_id.starts_with("job_"));

    let job = app.wait_for_job_status(&job_id, "completed").await;

    assert_eq!(job["job_id"], job_id.as_str());
    assert_eq!(job["total"], 3);
    assert_eq!(job["current"], 3);
    assert_eq!(job["last_message"], "c");
    assert_eq!(job["delay"], 0);
    assert!(job.get("error").is_none());
    assert_eq!(sender.sent(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_failed_send_ends_job_with_error() {
    let sender = ScriptedSender::failing_at(1);
    let app = TestApp::with_sender(sender.clone());

    let job_id = app.start_job("a\nb\nc", "0").await;
    let job = app.wait_for_job_status(&job_id, "error").await;

    assert_eq!(job["current"], 2);
    assert_eq!(job["last_message"], "b");
    assert_eq!(job["error"], "Failed to send. Check token/channel.");
    assert_eq!(sender.sent(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_stop_interrupts_delay() {
    let sender = ScriptedSender::new();
    let app = TestApp::with_sender(sender.clone());

    let job_id = app.start_job("first\nsecond\nthird", "60").await;
    let job = app.wait_for_job_status(&job_id, "running").await;
    assert_eq!(job["delay"], 60);

    // wait for the first send before stopping
    for _ in 0..100 {
        if !sender.sent().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, body) = app.post_empty(&format!("/stop/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stopped");
    assert_eq!(body["status"], "stopped");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let (_, job) = app.get(&format!("/status/{job_id}")).await;
    assert_eq!(job["status"], "stopped");
    assert_eq!(job["current"], 1);
    assert_eq!(sender.sent(), vec!["first"]);
}

#[tokio::test]
async fn test_in_flight_send_completes_after_stop() {
    let gate = Arc::new(Semaphore::new(0));
    let sender = ScriptedSender::gated(gate.clone());
    let app = TestApp::with_sender(sender.clone());

    let job_id = app.start_job("one\ntwo", "0").await;
    let job = app.wait_for_job_status(&job_id, "running").await;
    assert_eq!(job["current"], 1);
    assert_eq!(job["last_message"], "one");

    let (_, body) = app.post_empty(&format!("/stop/{job_id}")).await;
    assert_eq!(body["status"], "stopped");

    gate.add_permits(2);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_, job) = app.get(&format!("/status/{job_id}")).await;
    assert_eq!(job["status"], "stopped");
    assert_eq!(sender.sent(), vec!["one"]);
}

#[tokio::test]
async fn test_stop_on_finished_job_keeps_status() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let job_id = app.start_job("only", "0").await;
    app.wait_for_job_status(&job_id, "completed").await;

    let (status, body) = app.post_empty(&format!("/stop/{job_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_missing_delay_uses_default() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app
        .post_form(
            "/start",
            &[("token", "user-token"), ("channel_id", "42")],
            Some(b"hello".as_slice()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let job_id = body["job_id"].as_str().unwrap();
    let (_, job) = app.get(&format!("/status/{job_id}")).await;
    assert_eq!(job["delay"], 60);
}

#[test_case(&[("token", "t"), ("channel_id", "42")], None, "No file uploaded" ; "no file")]
#[test_case(&[("token", "t"), ("channel_id", "42")], Some(b"  \n\r\n".as_slice()), "File is empty" ; "blank file")]
#[test_case(&[("channel_id", "42")], Some(b"a".as_slice()), "Missing token or channel_id" ; "no token")]
#[test_case(&[("token", "t"), ("channel_id", " ")], Some(b"a".as_slice()), "Missing token or channel_id" ; "blank channel")]
#[test_case(&[("token", "t"), ("channel_id", "42"), ("delay", "soon")], Some(b"a".as_slice()), "Invalid delay" ; "bad delay")]
#[tokio::test]
async fn test_start_rejects_bad_form(
    fields: &[(&str, &str)],
    file: Option<&'static [u8]>,
    expected: &str,
) {
    let sender = ScriptedSender::new();
    let app = TestApp::with_sender(sender.clone());

    let (status, body) = app.post_form("/start", fields, file).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], expected);
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.get("/status/job_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");

    let (status, _) = app.post_empty("/stop/job_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
